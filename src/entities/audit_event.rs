//! Audit event entity - Append-only history of tracked field changes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_events")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Model name of the changed record (e.g., `"elgu.request"`)
    #[sea_orm(indexed)]
    pub res_model: String,
    /// Primary key of the changed record
    #[sea_orm(indexed)]
    pub res_id: i64,
    /// Tracked field name
    pub field: String,
    /// Value before the change, rendered as text
    pub old_value: Option<String>,
    /// Value after the change, rendered as text
    pub new_value: Option<String>,
    /// When the change happened
    pub created_at: DateTimeUtc,
}

/// `AuditEvent` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
