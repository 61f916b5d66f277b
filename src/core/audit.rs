//! Change tracking - Explicit audit events emitted by mutating operations.
//!
//! Operations call [`record_change`] for every tracked field they modify. The log is
//! append-only and read back with [`history_for`].

use crate::{
    entities::{AuditEvent, audit_event},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Appends one field change. Nothing is written when the value did not change.
pub async fn record_change<C>(
    db: &C,
    res_model: &str,
    res_id: i64,
    field: &str,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<Option<audit_event::Model>>
where
    C: ConnectionTrait,
{
    if old_value == new_value {
        return Ok(None);
    }

    tracing::debug!(
        "{}#{} {}: {:?} -> {:?}",
        res_model,
        res_id,
        field,
        old_value,
        new_value
    );

    let event = audit_event::ActiveModel {
        res_model: Set(res_model.to_string()),
        res_id: Set(res_id),
        field: Set(field.to_string()),
        old_value: Set(old_value),
        new_value: Set(new_value),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(Some(event.insert(db).await?))
}

/// All events for one record, oldest first.
pub async fn history_for<C>(db: &C, res_model: &str, res_id: i64) -> Result<Vec<audit_event::Model>>
where
    C: ConnectionTrait,
{
    AuditEvent::find()
        .filter(audit_event::Column::ResModel.eq(res_model))
        .filter(audit_event::Column::ResId.eq(res_id))
        .order_by_asc(audit_event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_record_change_skips_unchanged_values() -> Result<()> {
        let db = setup_test_db().await?;

        let unchanged =
            record_change(&db, "elgu.request", 1, "stage", Some("1".into()), Some("1".into()))
                .await?;
        assert!(unchanged.is_none());

        record_change(&db, "elgu.request", 1, "stage", Some("1".into()), Some("2".into())).await?;
        record_change(&db, "elgu.request", 1, "decision", None, Some("approved".into())).await?;
        record_change(&db, "elgu.request", 2, "stage", None, Some("1".into())).await?;

        let history = history_for(&db, "elgu.request", 1).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].field, "stage");
        assert_eq!(history[1].new_value.as_deref(), Some("approved"));
        Ok(())
    }
}
