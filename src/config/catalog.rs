//! Catalog configuration loading from catalog.toml
//!
//! The catalog file describes the workflow configuration a fresh deployment starts
//! with: numbering sequences, pipeline stages, documentary requirements, request
//! types and the chart of income accounts. It is applied by
//! [`crate::core::seed::seed_catalog`], which only creates what is missing.

use crate::entities::requirement::{DEFAULT_ALLOWED_FILE_TYPES, DEFAULT_MAX_FILE_SIZE_MB};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire catalog.toml file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// Numbering sequences
    #[serde(default)]
    pub sequences: Vec<SequenceConfig>,
    /// Pipeline stages
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    /// Documentary requirements
    #[serde(default)]
    pub requirements: Vec<RequirementConfig>,
    /// Request types, referencing stages and requirements by name
    #[serde(default)]
    pub request_types: Vec<RequestTypeConfig>,
    /// Chart of accounts entries
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// A numbering sequence
#[derive(Debug, Deserialize, Clone)]
pub struct SequenceConfig {
    /// Lookup code, e.g. `elgu.request`
    pub code: String,
    /// Prefix, `{year}` expands to the current year
    #[serde(default)]
    pub prefix: String,
    /// Zero-padding width
    #[serde(default = "default_padding")]
    pub padding: i32,
}

/// A pipeline stage
#[derive(Debug, Deserialize, Clone)]
pub struct StageConfig {
    /// Stage name, unique within the catalog
    pub name: String,
    /// Ordering key
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    #[serde(default)]
    pub is_initial: bool,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub fold: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub require_payment_before_enter: bool,
}

/// A documentary requirement
#[derive(Debug, Deserialize, Clone)]
pub struct RequirementConfig {
    /// Requirement name, unique within the catalog
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_allowed_file_types")]
    pub allowed_file_types: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: i32,
    #[serde(default = "default_true")]
    pub required: bool,
}

/// A request type
#[derive(Debug, Deserialize, Clone)]
pub struct RequestTypeConfig {
    /// Display name
    pub name: String,
    /// Unique code
    pub code: String,
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    /// Name of the default stage
    #[serde(default)]
    pub default_stage: Option<String>,
    /// Names of the allowed stages
    #[serde(default)]
    pub stages: Vec<String>,
    /// Names of the requirements
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default = "default_true")]
    pub requires_payment: bool,
    #[serde(default)]
    pub fee_notes: Option<String>,
    #[serde(default)]
    pub fee_amount: f64,
}

/// A chart of accounts entry
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Unique account code
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub internal_type: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

const fn default_padding() -> i32 {
    5
}

const fn default_sequence() -> i32 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_max_file_size_mb() -> i32 {
    DEFAULT_MAX_FILE_SIZE_MB
}

fn default_allowed_file_types() -> String {
    DEFAULT_ALLOWED_FILE_TYPES.to_string()
}

impl CatalogConfig {
    /// Parses a catalog from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse catalog: {e}"),
        })
    }
}

/// Loads the catalog from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load catalog from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file {}: {e}", path_ref.display()),
    })?;
    CatalogConfig::from_toml_str(&contents)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let toml_str = r#"
            [[sequences]]
            code = "elgu.request"
            prefix = "ELGU/{year}/"

            [[stages]]
            name = "Intake"
            sequence = 1
            is_initial = true

            [[stages]]
            name = "Release"
            sequence = 30
            require_payment_before_enter = true

            [[requirements]]
            name = "Valid ID"
            allowed_file_types = "pdf,png"

            [[request_types]]
            name = "Business Permit"
            code = "BP"
            default_stage = "Intake"
            stages = ["Intake", "Release"]
            requirements = ["Valid ID"]
            fee_amount = 500.0

            [[accounts]]
            code = "4000"
            name = "Permit Fees"
            account_type = "income"
        "#;

        let catalog = CatalogConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(catalog.sequences[0].padding, 5);
        assert_eq!(catalog.stages.len(), 2);
        assert!(catalog.stages[0].is_initial);
        assert!(catalog.stages[1].require_payment_before_enter);
        assert_eq!(catalog.requirements[0].max_file_size_mb, 10);
        assert!(catalog.requirements[0].required);
        assert_eq!(catalog.request_types[0].default_stage.as_deref(), Some("Intake"));
        assert_eq!(catalog.request_types[0].fee_amount, 500.0);
        assert!(catalog.request_types[0].requires_payment);
        assert_eq!(catalog.accounts[0].account_type.as_deref(), Some("income"));
    }

    #[test]
    fn test_empty_catalog_is_valid() {
        let catalog = CatalogConfig::from_toml_str("").unwrap();
        assert!(catalog.stages.is_empty());
        assert!(catalog.request_types.is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_catalog("/nonexistent/catalog.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
