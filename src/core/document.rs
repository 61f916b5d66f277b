//! Document slot business logic.
//!
//! One slot tracks one requirement of one request. Slots start `missing` and are
//! moved through `submitted`, `accepted` or `rejected` by staff. The storage layer
//! refuses a second slot for the same (request, requirement) pair.

use crate::{
    core::{attachment, audit},
    entities::{
        DocumentStatus, Request, RequestDocument, request, request_document, requirement,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use std::collections::HashSet;

/// Creates a `missing` slot for a requirement, snapshotting its `required` flag.
///
/// # Errors
/// Returns [`Error::DuplicateDocument`] when the request already has a slot for
/// this requirement.
pub async fn create_document_slot<C>(
    db: &C,
    request_id: i64,
    requirement: &requirement::Model,
) -> Result<request_document::Model>
where
    C: ConnectionTrait,
{
    let model = request_document::ActiveModel {
        request_id: Set(request_id),
        requirement_id: Set(requirement.id),
        is_required: Set(requirement.required),
        attachment_id: Set(None),
        status: Set(DocumentStatus::Missing),
        remarks: Set(None),
        ..Default::default()
    };

    match model.insert(db).await {
        Ok(doc) => Ok(doc),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::warn!(
                "Requirement {} already added for request {}",
                requirement.id,
                request_id
            );
            Err(Error::DuplicateDocument {
                request_id,
                requirement_id: requirement.id,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Creates slots for every requirement that does not have one yet.
///
/// Returns only the newly created slots, in requirement order.
pub async fn ensure_document_slots<C>(
    db: &C,
    request_id: i64,
    requirements: &[requirement::Model],
) -> Result<Vec<request_document::Model>>
where
    C: ConnectionTrait,
{
    let existing: HashSet<i64> = documents_for_request(db, request_id)
        .await?
        .into_iter()
        .map(|doc| doc.requirement_id)
        .collect();

    let mut created = Vec::new();
    for requirement in requirements.iter().filter(|r| !existing.contains(&r.id)) {
        created.push(create_document_slot(db, request_id, requirement).await?);
    }

    if !created.is_empty() {
        tracing::info!(
            "Created {} document slot(s) for request {}",
            created.len(),
            request_id
        );
    }
    Ok(created)
}

/// Slots of a request, newest first.
pub async fn documents_for_request<C>(
    db: &C,
    request_id: i64,
) -> Result<Vec<request_document::Model>>
where
    C: ConnectionTrait,
{
    RequestDocument::find()
        .filter(request_document::Column::RequestId.eq(request_id))
        .order_by_desc(request_document::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a slot by its unique ID.
pub async fn get_document<C>(db: &C, document_id: i64) -> Result<Option<request_document::Model>>
where
    C: ConnectionTrait,
{
    RequestDocument::find_by_id(document_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Records a staff review of a slot.
pub async fn set_document_status(
    db: &DatabaseConnection,
    document_id: i64,
    status: DocumentStatus,
    remarks: Option<String>,
) -> Result<request_document::Model> {
    let txn = db.begin().await?;

    let doc = get_document(&txn, document_id)
        .await?
        .ok_or_else(|| Error::not_found("document", document_id))?;
    let old_status = doc.status;

    let mut active: request_document::ActiveModel = doc.into();
    active.status = Set(status);
    if remarks.is_some() {
        active.remarks = Set(remarks);
    }
    let updated = active.update(&txn).await?;

    audit::record_change(
        &txn,
        request_document::RES_MODEL,
        updated.id,
        "status",
        Some(old_status.as_str().to_string()),
        Some(status.as_str().to_string()),
    )
    .await?;

    txn.commit().await?;
    Ok(updated)
}

/// Links an uploaded file to a slot.
///
/// The file must satisfy the requirement's extension and size rules. The attachment
/// is re-associated with the owning request. The slot status is left unchanged.
pub async fn attach_document_file(
    db: &DatabaseConnection,
    document_id: i64,
    attachment_id: i64,
) -> Result<request_document::Model> {
    let txn = db.begin().await?;

    let doc = get_document(&txn, document_id)
        .await?
        .ok_or_else(|| Error::not_found("document", document_id))?;
    let requirement = doc
        .find_related(crate::entities::Requirement)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("requirement", doc.requirement_id))?;
    let file = attachment::get_attachment(&txn, attachment_id)
        .await?
        .ok_or_else(|| Error::not_found("attachment", attachment_id))?;

    if !requirement.accepts(&file.name, file.file_size) {
        tracing::warn!(
            "Rejected file {} ({} bytes) for requirement {}",
            file.name,
            file.file_size,
            requirement.name
        );
        return Err(Error::validation(format!(
            "File {} is not accepted for {}: allowed types {}, max {} MB",
            file.name, requirement.name, requirement.allowed_file_types, requirement.max_file_size_mb
        )));
    }

    Request::find_by_id(doc.request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("request", doc.request_id))?;
    attachment::link_to_owner(&txn, file.id, request::RES_MODEL, doc.request_id).await?;

    let old_attachment = doc.attachment_id;
    let mut active: request_document::ActiveModel = doc.into();
    active.attachment_id = Set(Some(file.id));
    let updated = active.update(&txn).await?;

    audit::record_change(
        &txn,
        request_document::RES_MODEL,
        updated.id,
        "attachment",
        old_attachment.map(|id| id.to_string()),
        Some(file.id.to_string()),
    )
    .await?;

    txn.commit().await?;
    Ok(updated)
}
