//! Invoice entity - Customer invoices produced by the invoicing collaborator.
//!
//! Only the document and its payment state are modeled; posting, reconciliation
//! and ledger entries belong to the accounting system.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Move type of a customer invoice
pub const OUT_INVOICE: &str = "out_invoice";

/// Payment state reported by the accounting system
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Nothing paid
    #[default]
    #[sea_orm(string_value = "not_paid")]
    NotPaid,
    /// Payment registered but not reconciled
    #[sea_orm(string_value = "in_payment")]
    InPayment,
    /// Partially paid
    #[sea_orm(string_value = "partial")]
    Partial,
    /// Fully paid
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Reversed by a credit note
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

impl PaymentState {
    /// Stored string value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotPaid => "not_paid",
            Self::InPayment => "in_payment",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Reversed => "reversed",
        }
    }
}

/// Invoice database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier for the invoice
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Always `out_invoice` for request fees
    pub move_type: String,
    /// Billed partner
    pub partner_id: i64,
    /// Source document reference (the request number)
    pub invoice_origin: String,
    /// Currency code
    pub currency: String,
    /// Sum of line subtotals
    pub amount_total: f64,
    /// Payment state
    pub payment_state: PaymentState,
    /// When the invoice was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Billed partner
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id"
    )]
    Partner,
    /// Invoice lines
    #[sea_orm(has_many = "super::invoice_line::Entity")]
    Lines,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partner.def()
    }
}

impl Related<super::invoice_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
