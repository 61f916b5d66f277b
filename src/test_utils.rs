//! Shared test utilities for the request workflow.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::DEFAULT_CURRENCY,
    core::{attachment, catalog, partner, request, sequence},
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// No sequence is registered; see [`seed_request_sequence`].
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Registers the request numbering sequence (`ELGU/00001`, ...).
pub async fn seed_request_sequence(db: &DatabaseConnection) -> Result<entities::sequence::Model> {
    sequence::create_sequence(db, sequence::REQUEST_SEQUENCE_CODE, "ELGU/", 5).await
}

/// Creates an applicant without contact details.
pub async fn create_test_partner(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::partner::Model> {
    partner::create_partner(db, name, None, None).await
}

/// Creates an unowned 1 KiB PDF attachment.
pub async fn create_test_attachment(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::attachment::Model> {
    attachment::create_attachment(
        db,
        attachment::NewAttachment {
            name: name.to_string(),
            mimetype: Some("application/pdf".to_string()),
            file_size: 1024,
            store_ref: format!("test/{name}"),
            owner: None,
        },
    )
    .await
}

/// Creates a requirement with default file rules.
pub async fn create_test_requirement(
    db: &DatabaseConnection,
    name: &str,
    required: bool,
) -> Result<entities::requirement::Model> {
    catalog::create_requirement(
        db,
        catalog::RequirementInput {
            required,
            ..catalog::RequirementInput::new(name)
        },
    )
    .await
}

/// Creates an ordinary stage at the given position.
pub async fn create_test_stage(
    db: &DatabaseConnection,
    name: &str,
    sequence: i32,
) -> Result<entities::stage::Model> {
    catalog::create_stage(db, catalog::StageInput::new(name, sequence)).await
}

/// Catalog records created by [`setup_with_request_type`]
#[derive(Debug, Clone)]
pub struct RequestTypeFixture {
    /// "Business Permit", fee 150.00, requires payment
    pub request_type: entities::request_type::Model,
    /// Default stage (sequence 10)
    pub intake: entities::stage::Model,
    /// Second allowed stage (sequence 20)
    pub review: entities::stage::Model,
    /// Required requirement
    pub clearance: entities::requirement::Model,
    /// Required requirement
    pub valid_id: entities::requirement::Model,
}

/// Sets up a complete test environment with a configured request type.
///
/// # Defaults
/// * sequence `elgu.request` with prefix `ELGU/`
/// * stages Intake (default) and Review
/// * two required requirements
pub async fn setup_with_request_type() -> Result<(DatabaseConnection, RequestTypeFixture)> {
    let db = setup_test_db().await?;
    seed_request_sequence(&db).await?;

    let intake = create_test_stage(&db, "Intake", 10).await?;
    let review = create_test_stage(&db, "Review", 20).await?;
    let clearance = create_test_requirement(&db, "Barangay Clearance", true).await?;
    let valid_id = create_test_requirement(&db, "Valid ID", true).await?;

    let request_type = catalog::create_request_type(
        &db,
        catalog::RequestTypeInput {
            default_stage_id: Some(intake.id),
            fee_amount: 150.0,
            ..catalog::RequestTypeInput::new("Business Permit", "BP")
        },
    )
    .await?;
    catalog::set_type_stages(&db, request_type.id, &[intake.id, review.id]).await?;
    catalog::set_type_requirements(&db, request_type.id, &[clearance.id, valid_id.id]).await?;

    Ok((
        db,
        RequestTypeFixture {
            request_type,
            intake,
            review,
            clearance,
            valid_id,
        },
    ))
}

/// Creates a draft request of the given type for a fresh applicant.
pub async fn create_test_request(
    db: &DatabaseConnection,
    request_type_id: i64,
) -> Result<entities::request::Model> {
    let applicant = create_test_partner(db, "Test Applicant").await?;
    request::create_request(
        db,
        DEFAULT_CURRENCY,
        request::NewRequest::new(request_type_id, applicant.id),
    )
    .await
}
