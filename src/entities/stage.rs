//! Request stage entity - One step of the staff-facing processing pipeline.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stage database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_stages")]
pub struct Model {
    /// Unique identifier for the stage
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stage name (e.g., "Intake", "Evaluation", "Released")
    pub name: String,
    /// Ordering key; ties are broken by id
    pub sequence: i32,
    /// Marks the stage new requests usually start in
    pub is_initial: bool,
    /// Marks a terminal stage
    pub is_closed: bool,
    /// Folded by default when grouping requests by stage
    pub fold: bool,
    /// Free-form description
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Requests cannot enter this stage until their invoice is paid
    pub require_payment_before_enter: bool,
}

/// Defines relationships between Stage and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Requests currently sitting in this stage
    #[sea_orm(has_many = "super::request::Entity")]
    Requests,
    /// Link rows to request types
    #[sea_orm(has_many = "super::type_stage::Entity")]
    TypeStages,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
