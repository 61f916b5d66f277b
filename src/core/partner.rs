//! Applicant partners.

use crate::{
    entities::{Partner, partner},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

/// Creates an applicant partner.
pub async fn create_partner<C>(
    db: &C,
    name: &str,
    email: Option<String>,
    phone: Option<String>,
) -> Result<partner::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::validation("Partner name cannot be empty"));
    }

    let model = partner::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(email),
        phone: Set(phone),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Finds a partner by its unique ID.
pub async fn get_partner<C>(db: &C, partner_id: i64) -> Result<Option<partner::Model>>
where
    C: ConnectionTrait,
{
    Partner::find_by_id(partner_id)
        .one(db)
        .await
        .map_err(Into::into)
}
