//! Request entity - A citizen's filed case against a configured service type.
//!
//! The request is the aggregate root of the workflow: it owns its document slots
//! and references its type, stage, applicant, invoice and released attachment.
//! Stage and decision are independent dimensions; a request can move through any
//! number of stages while its decision stays pending.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Name carried by a request before its sequence number is assigned
pub const PLACEHOLDER_NAME: &str = "New";

/// Model name used for attachment ownership and audit events
pub const RES_MODEL: &str = "elgu.request";

/// Terminal outcome of a request, independent of its stage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// No decision yet
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Request granted
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Request denied
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl Decision {
    /// Stored string value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Request number from the `elgu.request` sequence
    #[sea_orm(unique)]
    pub name: String,
    /// Service type the request was filed against
    pub request_type_id: i64,
    /// Current pipeline stage, if any
    pub stage_id: Option<i64>,
    /// Citizen who filed the request
    pub applicant_id: i64,
    /// When the applicant submitted; `None` while still a draft
    pub submitted_on: Option<DateTimeUtc>,
    /// Optional legacy reference number
    pub reference_no_external: Option<String>,
    /// Currency code for fees (e.g., "PHP")
    pub currency: String,
    /// Total fees, never negative
    pub amount_total: f64,
    /// Customer invoice, created at most once
    pub invoice_id: Option<i64>,
    /// Staff user handling the request
    pub assigned_user_id: Option<i64>,
    /// Internal staff notes
    #[sea_orm(column_type = "Text", nullable)]
    pub department_notes: Option<String>,
    /// Approval outcome
    pub decision: Decision,
    /// Notes explaining the decision
    #[sea_orm(column_type = "Text", nullable)]
    pub decision_notes: Option<String>,
    /// Archived requests have `active = false`
    pub active: bool,
    /// Final document made available to the citizen
    pub released_attachment_id: Option<i64>,
    /// When the released document was issued
    pub released_date: Option<DateTimeUtc>,
    /// When the request was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// True once the applicant has submitted the request.
    #[must_use]
    pub const fn is_submitted(&self) -> bool {
        self.submitted_on.is_some()
    }
}

/// Defines relationships between Request and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one request type
    #[sea_orm(
        belongs_to = "super::request_type::Entity",
        from = "Column::RequestTypeId",
        to = "super::request_type::Column::Id"
    )]
    RequestType,
    /// Current stage
    #[sea_orm(
        belongs_to = "super::stage::Entity",
        from = "Column::StageId",
        to = "super::stage::Column::Id",
        on_delete = "SetNull"
    )]
    Stage,
    /// Applicant partner
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::ApplicantId",
        to = "super::partner::Column::Id"
    )]
    Applicant,
    /// Customer invoice
    #[sea_orm(
        belongs_to = "super::invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice::Column::Id",
        on_delete = "SetNull"
    )]
    Invoice,
    /// Released document
    #[sea_orm(
        belongs_to = "super::attachment::Entity",
        from = "Column::ReleasedAttachmentId",
        to = "super::attachment::Column::Id",
        on_delete = "SetNull"
    )]
    ReleasedAttachment,
    /// Document slots owned by this request
    #[sea_orm(has_many = "super::request_document::Entity")]
    Documents,
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

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applicant.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl Related<super::request_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
