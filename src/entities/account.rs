//! Account entity - Chart of accounts entries used for invoice lines.
//!
//! Deployments classify accounts differently: newer charts fill `account_type`,
//! older ones fill `internal_type`, some neither. See `core::accounts`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account code (e.g., "4000")
    pub code: String,
    /// Account name
    pub name: String,
    /// Classification in newer charts (`income`, `income_other`, `asset_receivable`, ...)
    pub account_type: Option<String>,
    /// Classification in older charts (`other`, `receivable`, `payable`, ...)
    pub internal_type: Option<String>,
    /// Deprecated accounts must not receive new lines
    pub deprecated: bool,
}

/// Accounts are referenced by invoice lines only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoice_line::Entity")]
    InvoiceLines,
}

impl Related<super::invoice_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
