//! Attachment entity - Metadata for an uploaded file held by the attachment store.
//!
//! The file body lives elsewhere and is referenced by `store_ref`. An attachment
//! is addressable by its owning record (`res_model` + `res_id`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attachment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    /// Unique identifier for the attachment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Original file name
    pub name: String,
    /// MIME type, when known
    pub mimetype: Option<String>,
    /// Size in bytes
    pub file_size: i64,
    /// Opaque key into the file store
    pub store_ref: String,
    /// Model name of the owning record
    #[sea_orm(indexed, nullable)]
    pub res_model: Option<String>,
    /// Primary key of the owning record
    #[sea_orm(indexed, nullable)]
    pub res_id: Option<i64>,
    /// When the attachment was uploaded
    pub created_at: DateTimeUtc,
}

impl Model {
    /// True when the owning-record reference points at `(res_model, res_id)`.
    #[must_use]
    pub fn is_owned_by(&self, res_model: &str, res_id: i64) -> bool {
        self.res_model.as_deref() == Some(res_model) && self.res_id == Some(res_id)
    }
}

/// Attachments have no foreign keys; ownership is a loose (model, id) reference
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
