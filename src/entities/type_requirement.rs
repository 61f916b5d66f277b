//! Link table between request types and their documentary requirements.

use sea_orm::entity::prelude::*;

/// Requirement-set link row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "type_requirements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub request_type_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub requirement_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::request_type::Entity",
        from = "Column::RequestTypeId",
        to = "super::request_type::Column::Id",
        on_delete = "Cascade"
    )]
    RequestType,
    #[sea_orm(
        belongs_to = "super::requirement::Entity",
        from = "Column::RequirementId",
        to = "super::requirement::Column::Id",
        on_delete = "Cascade"
    )]
    Requirement,
}

impl Related<super::request_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestType.def()
    }
}

impl Related<super::requirement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
