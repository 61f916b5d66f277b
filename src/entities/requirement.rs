//! Requirement entity - A named category of documentary evidence.
//!
//! Requirements are attached to request types and produce one document slot
//! per request when the request is submitted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// File extensions accepted when a requirement does not say otherwise
pub const DEFAULT_ALLOWED_FILE_TYPES: &str = "pdf,jpg,jpeg,png";

/// Size limit in megabytes used when a requirement does not say otherwise
pub const DEFAULT_MAX_FILE_SIZE_MB: i32 = 10;

/// Requirement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requirements")]
pub struct Model {
    /// Unique identifier for the requirement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Barangay Clearance", "Valid ID")
    pub name: String,
    /// Optional short code
    pub code: Option<String>,
    /// Sort key, lower first
    pub sequence: i32,
    /// Free-form description shown to applicants
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Comma-separated list of accepted extensions, e.g. `pdf,jpg,png`
    pub allowed_file_types: String,
    /// Maximum upload size in megabytes, always positive
    pub max_file_size_mb: i32,
    /// Whether new document slots are created as required
    pub required: bool,
}

impl Model {
    /// Lowercased extensions from `allowed_file_types`, blanks removed.
    #[must_use]
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.allowed_file_types
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    /// Size limit in bytes.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> i64 {
        i64::from(self.max_file_size_mb) * 1024 * 1024
    }

    /// Checks an upload's file name and size against this requirement.
    ///
    /// An empty extension list accepts any extension.
    #[must_use]
    pub fn accepts(&self, file_name: &str, file_size: i64) -> bool {
        if file_size > self.max_file_size_bytes() {
            return false;
        }
        let allowed = self.allowed_extensions();
        if allowed.is_empty() {
            return true;
        }
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .is_some_and(|ext| allowed.contains(&ext))
    }
}

/// Defines relationships between Requirement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One requirement backs many document slots
    #[sea_orm(has_many = "super::request_document::Entity")]
    Documents,
    /// Link rows to request types
    #[sea_orm(has_many = "super::type_requirement::Entity")]
    TypeRequirements,
}

impl Related<super::request_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::request_type::Entity> for Entity {
    fn to() -> RelationDef {
        super::type_requirement::Relation::RequestType.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::type_requirement::Relation::Requirement.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(allowed: &str, max_mb: i32) -> Model {
        Model {
            id: 1,
            name: "Valid ID".to_string(),
            code: None,
            sequence: 10,
            description: None,
            allowed_file_types: allowed.to_string(),
            max_file_size_mb: max_mb,
            required: true,
        }
    }

    #[test]
    fn test_allowed_extensions_are_normalized() {
        let req = requirement(" PDF, .jpg,,png ", 10);
        assert_eq!(req.allowed_extensions(), vec!["pdf", "jpg", "png"]);
    }

    #[test]
    fn test_accepts_checks_extension_and_size() {
        let req = requirement(DEFAULT_ALLOWED_FILE_TYPES, 1);
        assert!(req.accepts("scan.PDF", 1024));
        assert!(!req.accepts("scan.docx", 1024));
        assert!(!req.accepts("no_extension", 1024));
        assert!(!req.accepts("scan.pdf", 2 * 1024 * 1024));
    }

    #[test]
    fn test_accepts_anything_without_extension_list() {
        let req = requirement("", 5);
        assert!(req.accepts("whatever.bin", 10));
    }
}
