//! Request document entity - One slot per (request, requirement) pair.
//!
//! Slots are created at submission time with status `missing`. Status changes are
//! driven by staff; nothing here moves a slot automatically. The pair is unique at
//! the storage layer (see `config::database::create_tables`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Model name used for audit events on document slots
pub const RES_MODEL: &str = "elgu.request.document";

/// Submission/acceptance status of a document slot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Nothing uploaded yet
    #[default]
    #[sea_orm(string_value = "missing")]
    Missing,
    /// Uploaded, awaiting review
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Reviewed and accepted
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Reviewed and rejected
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl DocumentStatus {
    /// Stored string value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Document slot database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_documents")]
pub struct Model {
    /// Unique identifier for the slot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning request
    #[sea_orm(indexed)]
    pub request_id: i64,
    /// Requirement this slot satisfies
    #[sea_orm(indexed)]
    pub requirement_id: i64,
    /// Snapshot of the requirement's `required` flag at slot creation
    pub is_required: bool,
    /// Uploaded file
    pub attachment_id: Option<i64>,
    /// Review status
    pub status: DocumentStatus,
    /// Reviewer remarks
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
}

/// Defines relationships between Request Document and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Deleted together with its request
    #[sea_orm(
        belongs_to = "super::request::Entity",
        from = "Column::RequestId",
        to = "super::request::Column::Id",
        on_delete = "Cascade"
    )]
    Request,
    #[sea_orm(
        belongs_to = "super::requirement::Entity",
        from = "Column::RequirementId",
        to = "super::requirement::Column::Id"
    )]
    Requirement,
    #[sea_orm(
        belongs_to = "super::attachment::Entity",
        from = "Column::AttachmentId",
        to = "super::attachment::Column::Id",
        on_delete = "SetNull"
    )]
    Attachment,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl Related<super::requirement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
