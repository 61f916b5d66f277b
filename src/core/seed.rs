//! Catalog seeding - Applies catalog.toml to the database.
//!
//! Seeding only creates what is missing. Existing records are matched by code
//! (sequences, request types, accounts) or by name (stages, requirements) and
//! left untouched, so staff edits survive a restart.

use crate::{
    config::catalog::{CatalogConfig, RequestTypeConfig},
    core::{accounts, catalog, sequence},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Counts of records created by one seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub sequences: usize,
    pub stages: usize,
    pub requirements: usize,
    pub request_types: usize,
    pub accounts: usize,
}

impl SeedSummary {
    /// Total number of created records
    #[must_use]
    pub const fn total(&self) -> usize {
        self.sequences + self.stages + self.requirements + self.request_types + self.accounts
    }
}

/// Creates every catalog entry that does not exist yet, in one transaction.
#[instrument(skip(db, catalog_config))]
pub async fn seed_catalog(
    db: &DatabaseConnection,
    catalog_config: &CatalogConfig,
) -> Result<SeedSummary> {
    info!(
        "Seeding catalog: {} sequences, {} stages, {} requirements, {} request types, {} accounts",
        catalog_config.sequences.len(),
        catalog_config.stages.len(),
        catalog_config.requirements.len(),
        catalog_config.request_types.len(),
        catalog_config.accounts.len()
    );

    let txn = db.begin().await?;
    let mut summary = SeedSummary::default();

    for cfg in &catalog_config.sequences {
        if sequence::get_sequence_by_code(&txn, &cfg.code).await?.is_some() {
            debug!("Sequence '{}' already exists", cfg.code);
            continue;
        }
        sequence::create_sequence(&txn, &cfg.code, &cfg.prefix, cfg.padding).await?;
        summary.sequences += 1;
    }

    for cfg in &catalog_config.stages {
        if catalog::get_stage_by_name(&txn, &cfg.name).await?.is_some() {
            debug!("Stage '{}' already exists", cfg.name);
            continue;
        }
        catalog::create_stage(
            &txn,
            catalog::StageInput {
                name: cfg.name.clone(),
                sequence: cfg.sequence,
                is_initial: cfg.is_initial,
                is_closed: cfg.is_closed,
                fold: cfg.fold,
                description: cfg.description.clone(),
                require_payment_before_enter: cfg.require_payment_before_enter,
            },
        )
        .await?;
        summary.stages += 1;
    }

    for cfg in &catalog_config.requirements {
        if catalog::get_requirement_by_name(&txn, &cfg.name).await?.is_some() {
            debug!("Requirement '{}' already exists", cfg.name);
            continue;
        }
        catalog::create_requirement(
            &txn,
            catalog::RequirementInput {
                name: cfg.name.clone(),
                code: cfg.code.clone(),
                sequence: cfg.sequence,
                description: cfg.description.clone(),
                allowed_file_types: cfg.allowed_file_types.clone(),
                max_file_size_mb: cfg.max_file_size_mb,
                required: cfg.required,
            },
        )
        .await?;
        summary.requirements += 1;
    }

    for cfg in &catalog_config.request_types {
        if catalog::get_request_type_by_code(&txn, &cfg.code).await?.is_some() {
            debug!("Request type '{}' already exists", cfg.code);
            continue;
        }
        seed_request_type(&txn, cfg).await?;
        summary.request_types += 1;
    }

    for cfg in &catalog_config.accounts {
        if accounts::get_account_by_code(&txn, &cfg.code).await?.is_some() {
            debug!("Account '{}' already exists", cfg.code);
            continue;
        }
        accounts::create_account(
            &txn,
            &cfg.code,
            &cfg.name,
            cfg.account_type.as_deref(),
            cfg.internal_type.as_deref(),
            cfg.deprecated,
        )
        .await?;
        summary.accounts += 1;
    }

    txn.commit().await?;
    info!("Catalog seeded, {} records created", summary.total());
    Ok(summary)
}

async fn stage_id_by_name<C>(db: &C, type_code: &str, name: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    catalog::get_stage_by_name(db, name)
        .await?
        .map(|stage| stage.id)
        .ok_or_else(|| Error::Config {
            message: format!("Request type '{type_code}' references unknown stage '{name}'"),
        })
}

async fn seed_request_type<C>(db: &C, cfg: &RequestTypeConfig) -> Result<()>
where
    C: ConnectionTrait,
{
    let default_stage_id = match &cfg.default_stage {
        Some(name) => Some(stage_id_by_name(db, &cfg.code, name).await?),
        None => None,
    };

    let mut stage_ids = Vec::with_capacity(cfg.stages.len());
    for name in &cfg.stages {
        stage_ids.push(stage_id_by_name(db, &cfg.code, name).await?);
    }

    let mut requirement_ids = Vec::with_capacity(cfg.requirements.len());
    for name in &cfg.requirements {
        let requirement = catalog::get_requirement_by_name(db, name)
            .await?
            .ok_or_else(|| Error::Config {
                message: format!(
                    "Request type '{}' references unknown requirement '{name}'",
                    cfg.code
                ),
            })?;
        requirement_ids.push(requirement.id);
    }

    let request_type = catalog::create_request_type(
        db,
        catalog::RequestTypeInput {
            name: cfg.name.clone(),
            code: cfg.code.clone(),
            sequence: cfg.sequence,
            active: true,
            default_stage_id,
            requires_payment: cfg.requires_payment,
            fee_notes: cfg.fee_notes.clone(),
            fee_amount: cfg.fee_amount,
        },
    )
    .await?;
    catalog::set_type_stages_in(db, request_type.id, &stage_ids).await?;
    catalog::set_type_requirements_in(db, request_type.id, &requirement_ids).await?;

    info!(
        "Seeded request type '{}' with {} stages and {} requirements",
        request_type.code,
        stage_ids.len(),
        requirement_ids.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::settings::DEFAULT_CURRENCY;
    use crate::core::request::{NewRequest, create_request, submit_request};
    use crate::test_utils::{create_test_partner, setup_test_db};

    const CATALOG: &str = r#"
        [[sequences]]
        code = "elgu.request"
        prefix = "ELGU/"
        padding = 5

        [[stages]]
        name = "Intake"
        sequence = 1
        is_initial = true

        [[stages]]
        name = "Review"
        sequence = 20

        [[requirements]]
        name = "Barangay Clearance"

        [[requirements]]
        name = "Photo"
        required = false

        [[request_types]]
        name = "Business Permit"
        code = "BP"
        default_stage = "Review"
        stages = ["Intake", "Review"]
        requirements = ["Barangay Clearance", "Photo"]
        fee_amount = 500.0

        [[accounts]]
        code = "4100"
        name = "Permit Fees"
        account_type = "income"
    "#;

    #[tokio::test]
    async fn test_seed_creates_catalog_once() -> Result<()> {
        let db = setup_test_db().await?;
        let config = CatalogConfig::from_toml_str(CATALOG)?;

        let first = seed_catalog(&db, &config).await?;
        assert_eq!(
            first,
            SeedSummary {
                sequences: 1,
                stages: 2,
                requirements: 2,
                request_types: 1,
                accounts: 1,
            }
        );

        let second = seed_catalog(&db, &config).await?;
        assert_eq!(second.total(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_seeded_type_is_usable() -> Result<()> {
        let db = setup_test_db().await?;
        seed_catalog(&db, &CatalogConfig::from_toml_str(CATALOG)?).await?;

        let bp = catalog::get_request_type_by_code(&db, "BP").await?.unwrap();
        assert_eq!(bp.fee_amount, 500.0);
        let review = catalog::get_stage_by_name(&db, "Review").await?.unwrap();
        assert_eq!(bp.default_stage_id, Some(review.id));

        let applicant = create_test_partner(&db, "Juan Dela Cruz").await?;
        let req = create_request(
            &db,
            DEFAULT_CURRENCY,
            NewRequest::new(bp.id, applicant.id),
        )
        .await?;
        assert_eq!(req.name, "ELGU/00001");
        assert_eq!(req.stage_id, Some(review.id));

        let submission = submit_request(&db, req.id).await?;
        assert_eq!(submission.created_documents.len(), 2);
        assert_eq!(
            submission
                .created_documents
                .iter()
                .filter(|doc| doc.is_required)
                .count(),
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_stage_reference_aborts_seed() -> Result<()> {
        let db = setup_test_db().await?;
        let config = CatalogConfig::from_toml_str(
            r#"
            [[stages]]
            name = "Intake"

            [[request_types]]
            name = "Cedula"
            code = "CTC"
            default_stage = "Nowhere"
            "#,
        )?;

        let result = seed_catalog(&db, &config).await;
        assert!(matches!(result, Err(Error::Config { .. })));
        assert!(catalog::get_stage_by_name(&db, "Intake").await?.is_none());
        Ok(())
    }
}
