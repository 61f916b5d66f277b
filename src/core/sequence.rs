//! Sequence generator - Hands out unique, monotonic record numbers per code.
//!
//! The counter is bumped with a single `UPDATE ... SET number_next = number_next + increment`
//! in the caller's connection or transaction, then read back. Numbers may have gaps
//! (a rolled-back transaction loses its number) but are never reused.

use crate::{
    entities::{Sequence, sequence},
    errors::{Error, Result},
};
use chrono::{Datelike, Utc};
use sea_orm::{Set, prelude::*, sea_query::Expr};

/// Sequence code used to number requests
pub const REQUEST_SEQUENCE_CODE: &str = "elgu.request";

/// Finds a sequence by its code.
pub async fn get_sequence_by_code<C>(db: &C, code: &str) -> Result<Option<sequence::Model>>
where
    C: ConnectionTrait,
{
    Sequence::find()
        .filter(sequence::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a new sequence starting at 1.
pub async fn create_sequence<C>(
    db: &C,
    code: &str,
    prefix: &str,
    padding: i32,
) -> Result<sequence::Model>
where
    C: ConnectionTrait,
{
    if code.trim().is_empty() {
        return Err(Error::Config {
            message: "Sequence code cannot be empty".to_string(),
        });
    }
    if padding < 0 {
        return Err(Error::Config {
            message: format!("Sequence padding must not be negative, got {padding}"),
        });
    }

    let model = sequence::ActiveModel {
        code: Set(code.trim().to_string()),
        prefix: Set(prefix.to_string()),
        padding: Set(padding),
        number_next: Set(1),
        number_increment: Set(1),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Renders a sequence value: expanded prefix followed by the zero-padded number.
#[must_use]
pub fn format_sequence_value(prefix: &str, padding: i32, number: i64, year: i32) -> String {
    let width = usize::try_from(padding).unwrap_or(0);
    format!(
        "{}{number:0width$}",
        prefix.replace("{year}", &year.to_string())
    )
}

/// Returns the next value of the sequence registered under `code`.
///
/// # Errors
/// Returns [`Error::Config`] when no sequence is registered under `code`.
pub async fn next_value_for<C>(db: &C, code: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let result = Sequence::update_many()
        .col_expr(
            sequence::Column::NumberNext,
            Expr::col(sequence::Column::NumberNext)
                .add(Expr::col(sequence::Column::NumberIncrement)),
        )
        .filter(sequence::Column::Code.eq(code))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::Config {
            message: format!("No sequence configured for code '{code}'"),
        });
    }

    let seq = get_sequence_by_code(db, code)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("No sequence configured for code '{code}'"),
        })?;

    let number = seq.number_next - seq.number_increment;
    let value = format_sequence_value(&seq.prefix, seq.padding, number, Utc::now().year());
    tracing::debug!("Sequence {} issued {}", code, value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_format_sequence_value() {
        assert_eq!(format_sequence_value("ELGU/{year}/", 5, 42, 2026), "ELGU/2026/00042");
        assert_eq!(format_sequence_value("", 0, 7, 2026), "7");
        assert_eq!(format_sequence_value("R-", 2, 12345, 2026), "R-12345");
    }

    #[tokio::test]
    async fn test_next_value_is_monotonic() -> Result<()> {
        let db = setup_test_db().await?;
        create_sequence(&db, "test.seq", "T-", 3).await?;

        assert_eq!(next_value_for(&db, "test.seq").await?, "T-001");
        assert_eq!(next_value_for(&db, "test.seq").await?, "T-002");
        assert_eq!(next_value_for(&db, "test.seq").await?, "T-003");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_code_is_config_error() -> Result<()> {
        let db = setup_test_db().await?;
        let result = next_value_for(&db, "missing.seq").await;
        assert!(matches!(result, Err(Error::Config { .. })));
        Ok(())
    }
}
