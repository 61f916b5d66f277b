//! Application settings loaded from environment variables.
//!
//! `.env` is loaded by the binary before these are read. Every variable is
//! optional and falls back to a sensible default.

use crate::core::accounts::{AccountSchema, IncomeAccountResolver, resolver_for};
use crate::errors::{Error, Result};
use std::path::PathBuf;

/// Currency used for new requests when `ELGU_CURRENCY` is not set
pub const DEFAULT_CURRENCY: &str = "PHP";

/// Catalog seed file used when `ELGU_CATALOG_PATH` is not set
pub const DEFAULT_CATALOG_PATH: &str = "catalog.toml";

/// Runtime configuration of the workflow
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `SeaORM` connection string
    pub database_url: String,
    /// Currency code stamped on new requests
    pub currency: String,
    /// Accounting schema of the deployment, picks the income account resolver
    pub account_schema: AccountSchema,
    /// Skip deprecated accounts when resolving the income account
    pub exclude_deprecated_accounts: bool,
    /// Path of the catalog seed file
    pub catalog_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: super::database::DEFAULT_DATABASE_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            account_schema: AccountSchema::default(),
            exclude_deprecated_accounts: true,
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when `ELGU_ACCOUNT_SCHEMA` or
    /// `ELGU_EXCLUDE_DEPRECATED_ACCOUNTS` hold unrecognised values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let account_schema = match lookup("ELGU_ACCOUNT_SCHEMA") {
            Some(value) => value.parse()?,
            None => defaults.account_schema,
        };

        let exclude_deprecated_accounts = match lookup("ELGU_EXCLUDE_DEPRECATED_ACCOUNTS") {
            Some(value) => parse_bool(&value).ok_or_else(|| Error::Config {
                message: format!("ELGU_EXCLUDE_DEPRECATED_ACCOUNTS must be true or false, got '{value}'"),
            })?,
            None => defaults.exclude_deprecated_accounts,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            currency: lookup("ELGU_CURRENCY").unwrap_or(defaults.currency),
            account_schema,
            exclude_deprecated_accounts,
            catalog_path: lookup("ELGU_CATALOG_PATH")
                .map_or(defaults.catalog_path, PathBuf::from),
        })
    }

    /// Income account resolver for the configured accounting schema.
    #[must_use]
    pub fn income_account_resolver(&self) -> Box<dyn IncomeAccountResolver> {
        resolver_for(self.account_schema, self.exclude_deprecated_accounts)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
