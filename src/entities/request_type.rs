//! Request type entity - Configuration template for a class of citizen service.
//!
//! A type binds the allowed workflow stages, an optional default stage, the set of
//! documentary requirements and the fee policy for every request filed against it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Request type database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_types")]
pub struct Model {
    /// Unique identifier for the request type
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Business Permit")
    pub name: String,
    /// Short code used in references
    pub code: String,
    /// Ordering key
    pub sequence: i32,
    /// Inactive types are hidden from new filings
    pub active: bool,
    /// Stage new requests start in, when set
    pub default_stage_id: Option<i64>,
    /// Whether requests of this type are expected to be paid
    pub requires_payment: bool,
    /// Fee notes or policy reference
    #[sea_orm(column_type = "Text", nullable)]
    pub fee_notes: Option<String>,
    /// Standard fee for this type
    pub fee_amount: f64,
}

/// Defines relationships between Request Type and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Optional default stage
    #[sea_orm(
        belongs_to = "super::stage::Entity",
        from = "Column::DefaultStageId",
        to = "super::stage::Column::Id",
        on_delete = "SetNull"
    )]
    DefaultStage,
    /// Requests filed against this type
    #[sea_orm(has_many = "super::request::Entity")]
    Requests,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

/// Allowed stages, through `type_stages`
impl Related<super::stage::Entity> for Entity {
    fn to() -> RelationDef {
        super::type_stage::Relation::Stage.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::type_stage::Relation::RequestType.def().rev())
    }
}

/// Requirement set, through `type_requirements`
impl Related<super::requirement::Entity> for Entity {
    fn to() -> RelationDef {
        super::type_requirement::Relation::Requirement.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::type_requirement::Relation::RequestType.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
