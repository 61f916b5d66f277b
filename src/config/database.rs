//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The composite unique index on
//! document slots is not expressible on the entity and is created explicitly.

use crate::entities::{
    Account, Attachment, AuditEvent, Invoice, InvoiceLine, Partner, Request, RequestDocument,
    RequestType, Requirement, Sequence, Stage, TypeRequirement, TypeStage, request_document,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;

/// Database used when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/elgu.sqlite?mode=rwc";

/// Name of the unique index enforcing one slot per (request, requirement)
pub const UNIQUE_SLOT_INDEX: &str = "uniq_req_requirement";

/// File path of a `SQLite` URL, `None` for in-memory or non-`SQLite` URLs.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(Path::new(path))
    }
}

/// Creates the directory holding a `SQLite` database file if it is missing.
pub fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    if let Some(parent) = sqlite_file_path(database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Establishes a connection to the given database URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    tracing::debug!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Safe to call on an existing database: every statement is `IF NOT EXISTS`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Collaborator tables first, then the catalog, then requests and their slots
    create_table(db, &schema, Partner).await?;
    create_table(db, &schema, Attachment).await?;
    create_table(db, &schema, Account).await?;
    create_table(db, &schema, Sequence).await?;
    create_table(db, &schema, AuditEvent).await?;
    create_table(db, &schema, Requirement).await?;
    create_table(db, &schema, Stage).await?;
    create_table(db, &schema, RequestType).await?;
    create_table(db, &schema, TypeStage).await?;
    create_table(db, &schema, TypeRequirement).await?;
    create_table(db, &schema, Invoice).await?;
    create_table(db, &schema, InvoiceLine).await?;
    create_table(db, &schema, Request).await?;
    create_table(db, &schema, RequestDocument).await?;

    let unique_slot = Index::create()
        .name(UNIQUE_SLOT_INDEX)
        .table(RequestDocument)
        .col(request_document::Column::RequestId)
        .col(request_document::Column::RequirementId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&unique_slot)).await?;

    tracing::debug!("Database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{RequestModel, StageModel};
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<RequestModel> = Request::find().limit(1).all(&db).await?;
        let _: Vec<StageModel> = Stage::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path(DEFAULT_DATABASE_URL),
            Some(Path::new("data/elgu.sqlite"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/elgu"), None);
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
