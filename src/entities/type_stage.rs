//! Link table between request types and their allowed stages.

use sea_orm::entity::prelude::*;

/// Allowed-stage link row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "type_stages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub request_type_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub stage_id: i64,
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
        belongs_to = "super::stage::Entity",
        from = "Column::StageId",
        to = "super::stage::Column::Id",
        on_delete = "Cascade"
    )]
    Stage,
}

impl Related<super::request_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RequestType.def()
    }
}

impl Related<super::stage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
