//! Core business logic, independent of any user interface.
//!
//! Operations take a `SeaORM` connection and return [`crate::errors::Result`].
//! Those that change several records open their own transaction.

/// Income account lookup across chart-of-accounts schemas
pub mod accounts;
/// Stored files and their owning record
pub mod attachment;
/// Field change history
pub mod audit;
/// Invoicing requests for their fees
pub mod billing;
/// Requirements, stages and request types
pub mod catalog;
/// Per-request document slots
pub mod document;
/// Derived flags gating payment and release
pub mod gating;
/// Customer invoices
pub mod invoicing;
/// Applicants
pub mod partner;
/// Request lifecycle and staff actions
pub mod request;
/// Applying catalog.toml to the database
pub mod seed;
/// Document numbering
pub mod sequence;
