//! Income account resolution for invoice lines.
//!
//! Charts of accounts differ between accounting schema versions: newer charts
//! classify accounts with `account_type`, older ones with `internal_type`, and some
//! carry no usable classification at all. Each schema gets its own
//! [`IncomeAccountResolver`]; the deployment picks one at configuration time
//! (see [`crate::config::AppConfig::income_account_resolver`]).

use crate::{
    entities::{Account, account},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use std::{fmt, str::FromStr};

/// Message raised when no account matches the resolver
pub const NO_INCOME_ACCOUNT_MESSAGE: &str =
    "No suitable income account found. Please configure Accounting / Chart of Accounts.";

/// Accounting schema variants supported by the resolvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountSchema {
    /// Accounts classified by `account_type`
    #[default]
    AccountType,
    /// Older charts classified by `internal_type`
    InternalType,
    /// No classification, any account qualifies
    Untyped,
}

impl AccountSchema {
    /// Configuration value of the schema
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountType => "account_type",
            Self::InternalType => "internal_type",
            Self::Untyped => "untyped",
        }
    }
}

impl fmt::Display for AccountSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "account_type" => Ok(Self::AccountType),
            "internal_type" => Ok(Self::InternalType),
            "untyped" => Ok(Self::Untyped),
            other => Err(Error::Config {
                message: format!(
                    "Unknown account schema '{other}', expected account_type, internal_type or untyped"
                ),
            }),
        }
    }
}

/// Selects the accounts eligible to receive fee income.
pub trait IncomeAccountResolver: Send + Sync + fmt::Debug {
    /// Short name of the schema this resolver handles
    fn label(&self) -> &'static str;

    /// Filter matching income-eligible accounts
    fn income_condition(&self) -> Condition;
}

fn with_deprecated_filter(condition: Condition, exclude_deprecated: bool) -> Condition {
    if exclude_deprecated {
        condition.add(account::Column::Deprecated.eq(false))
    } else {
        condition
    }
}

/// Resolver for charts that fill `account_type`
#[derive(Debug, Clone, Copy)]
pub struct AccountTypeResolver {
    /// Skip deprecated accounts
    pub exclude_deprecated: bool,
}

impl IncomeAccountResolver for AccountTypeResolver {
    fn label(&self) -> &'static str {
        AccountSchema::AccountType.as_str()
    }

    fn income_condition(&self) -> Condition {
        with_deprecated_filter(
            Condition::all().add(account::Column::AccountType.is_in(["income", "income_other"])),
            self.exclude_deprecated,
        )
    }
}

/// Resolver for older charts that fill `internal_type`
#[derive(Debug, Clone, Copy)]
pub struct InternalTypeResolver {
    /// Skip deprecated accounts
    pub exclude_deprecated: bool,
}

impl IncomeAccountResolver for InternalTypeResolver {
    fn label(&self) -> &'static str {
        AccountSchema::InternalType.as_str()
    }

    fn income_condition(&self) -> Condition {
        with_deprecated_filter(
            Condition::all().add(account::Column::InternalType.eq("other")),
            self.exclude_deprecated,
        )
    }
}

/// Last resort for charts without classification
#[derive(Debug, Clone, Copy)]
pub struct UntypedResolver {
    /// Skip deprecated accounts
    pub exclude_deprecated: bool,
}

impl IncomeAccountResolver for UntypedResolver {
    fn label(&self) -> &'static str {
        AccountSchema::Untyped.as_str()
    }

    fn income_condition(&self) -> Condition {
        with_deprecated_filter(Condition::all(), self.exclude_deprecated)
    }
}

/// Builds the resolver for a schema.
#[must_use]
pub fn resolver_for(
    schema: AccountSchema,
    exclude_deprecated: bool,
) -> Box<dyn IncomeAccountResolver> {
    match schema {
        AccountSchema::AccountType => Box::new(AccountTypeResolver { exclude_deprecated }),
        AccountSchema::InternalType => Box::new(InternalTypeResolver { exclude_deprecated }),
        AccountSchema::Untyped => Box::new(UntypedResolver { exclude_deprecated }),
    }
}

/// Returns the first income-eligible account, ordered by code then id.
///
/// # Errors
/// Returns [`Error::Validation`] when the chart has no matching account.
pub async fn resolve_income_account<C>(
    db: &C,
    resolver: &dyn IncomeAccountResolver,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    let found = Account::find()
        .filter(resolver.income_condition())
        .order_by_asc(account::Column::Code)
        .order_by_asc(account::Column::Id)
        .one(db)
        .await?;

    found.ok_or_else(|| {
        tracing::warn!("No income account matches the {} resolver", resolver.label());
        Error::validation(NO_INCOME_ACCOUNT_MESSAGE)
    })
}

/// Adds an account to the chart.
pub async fn create_account<C>(
    db: &C,
    code: &str,
    name: &str,
    account_type: Option<&str>,
    internal_type: Option<&str>,
    deprecated: bool,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    if code.trim().is_empty() {
        return Err(Error::validation("Account code cannot be empty"));
    }

    let model = account::ActiveModel {
        code: Set(code.trim().to_string()),
        name: Set(name.to_string()),
        account_type: Set(account_type.map(str::to_string)),
        internal_type: Set(internal_type.map(str::to_string)),
        deprecated: Set(deprecated),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Finds an account by its code.
pub async fn get_account_by_code<C>(db: &C, code: &str) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find()
        .filter(account::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}
