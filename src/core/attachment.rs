//! Attachment store - File metadata addressable by owning record.
//!
//! File bodies are kept by an external store and referenced through `store_ref`.
//! This module keeps the owning-record reference (`res_model`, `res_id`) correct so
//! that looking an attachment up by its owner always finds it.

use crate::{
    entities::{Attachment, attachment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Upload metadata for a new attachment
#[derive(Debug, Clone, Default)]
pub struct NewAttachment {
    /// File name as uploaded
    pub name: String,
    /// MIME type, when known
    pub mimetype: Option<String>,
    /// Size in bytes
    pub file_size: i64,
    /// Key of the file body in the store
    pub store_ref: String,
    /// Owning record, when known at upload time
    pub owner: Option<(String, i64)>,
}

/// Registers an uploaded file.
pub async fn create_attachment<C>(db: &C, new: NewAttachment) -> Result<attachment::Model>
where
    C: ConnectionTrait,
{
    if new.name.trim().is_empty() {
        return Err(Error::validation("Attachment name cannot be empty"));
    }
    if new.file_size < 0 {
        return Err(Error::validation("Attachment size cannot be negative"));
    }

    let (res_model, res_id) = new.owner.unzip();
    let model = attachment::ActiveModel {
        name: Set(new.name.trim().to_string()),
        mimetype: Set(new.mimetype),
        file_size: Set(new.file_size),
        store_ref: Set(new.store_ref),
        res_model: Set(res_model),
        res_id: Set(res_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Finds an attachment by its unique ID.
pub async fn get_attachment<C>(db: &C, attachment_id: i64) -> Result<Option<attachment::Model>>
where
    C: ConnectionTrait,
{
    Attachment::find_by_id(attachment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All attachments owned by a record, oldest first.
pub async fn find_by_owner<C>(
    db: &C,
    res_model: &str,
    res_id: i64,
) -> Result<Vec<attachment::Model>>
where
    C: ConnectionTrait,
{
    Attachment::find()
        .filter(attachment::Column::ResModel.eq(res_model))
        .filter(attachment::Column::ResId.eq(res_id))
        .order_by_asc(attachment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Points an attachment's owning-record reference at `(res_model, res_id)`.
///
/// Returns the attachment unchanged when it already points there.
pub async fn link_to_owner<C>(
    db: &C,
    attachment_id: i64,
    res_model: &str,
    res_id: i64,
) -> Result<attachment::Model>
where
    C: ConnectionTrait,
{
    let att = get_attachment(db, attachment_id)
        .await?
        .ok_or_else(|| Error::not_found("attachment", attachment_id))?;

    if att.is_owned_by(res_model, res_id) {
        return Ok(att);
    }

    tracing::debug!(
        "Relinking attachment {} from {:?}#{:?} to {}#{}",
        att.id,
        att.res_model,
        att.res_id,
        res_model,
        res_id
    );

    let mut active: attachment::ActiveModel = att.into();
    active.res_model = Set(Some(res_model.to_string()));
    active.res_id = Set(Some(res_id));
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_attachment, setup_test_db};

    #[tokio::test]
    async fn test_link_to_owner_repairs_reference() -> Result<()> {
        let db = setup_test_db().await?;
        let att = create_test_attachment(&db, "permit.pdf").await?;
        assert!(att.res_model.is_none());

        let linked = link_to_owner(&db, att.id, "elgu.request", 7).await?;
        assert!(linked.is_owned_by("elgu.request", 7));

        let owned = find_by_owner(&db, "elgu.request", 7).await?;
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, att.id);

        // Moving to another owner drops it from the first lookup
        link_to_owner(&db, att.id, "elgu.request", 8).await?;
        assert!(find_by_owner(&db, "elgu.request", 7).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_link_missing_attachment_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let result = link_to_owner(&db, 999, "elgu.request", 1).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "attachment",
                id: 999
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_attachment_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_attachment(
            &db,
            NewAttachment {
                name: "  ".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let att = create_attachment(
            &db,
            NewAttachment {
                name: "id.png".to_string(),
                file_size: 10,
                store_ref: "store/abc".to_string(),
                owner: Some(("elgu.request".to_string(), 3)),
                ..Default::default()
            },
        )
        .await?;
        assert!(att.is_owned_by("elgu.request", 3));
        assert!(get_attachment(&db, att.id).await?.is_some());
        Ok(())
    }
}
