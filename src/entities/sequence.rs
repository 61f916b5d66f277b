//! Sequence entity - Named monotonic counters used to number records.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sequence database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sequences")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Lookup code (e.g., `"elgu.request"`)
    #[sea_orm(unique)]
    pub code: String,
    /// Prefix prepended to the number; `{year}` expands to the current year
    pub prefix: String,
    /// Zero-padding width of the number
    pub padding: i32,
    /// Next number to hand out
    pub number_next: i64,
    /// Step between numbers, always positive
    pub number_increment: i64,
}

/// `Sequence` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
