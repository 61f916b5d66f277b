//! Billing - Invoicing a request for its fees.
//!
//! A request is billed once. The invoice carries a single line for the total
//! fees, booked on the first income account the configured resolver finds.

use crate::{
    core::{
        accounts::{self, IncomeAccountResolver},
        audit, catalog, invoicing,
        request::load_request,
    },
    entities::{PaymentState, Request, invoice, request},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};

/// Message shown when invoicing a request without fees
pub const NO_FEES_MESSAGE: &str = "Total Fees must be greater than 0 before invoicing.";

/// Creates the customer invoice for a request.
///
/// Calling this on a request that already has an invoice returns that invoice
/// and changes nothing. A reference to an invoice that no longer exists is
/// treated as no invoice: a new one is created and replaces it.
///
/// # Errors
/// [`Error::Validation`] when the fees are not positive or no income account
/// can be resolved.
pub async fn create_invoice(
    db: &DatabaseConnection,
    resolver: &dyn IncomeAccountResolver,
    request_id: i64,
) -> Result<invoice::Model> {
    let txn = db.begin().await?;
    let invoice = create_invoice_in(&txn, resolver, request_id).await?;
    txn.commit().await?;
    Ok(invoice)
}

/// Invoices several requests in one transaction.
pub async fn create_invoices(
    db: &DatabaseConnection,
    resolver: &dyn IncomeAccountResolver,
    request_ids: &[i64],
) -> Result<Vec<invoice::Model>> {
    let txn = db.begin().await?;
    let mut invoices = Vec::with_capacity(request_ids.len());
    for &request_id in request_ids {
        invoices.push(create_invoice_in(&txn, resolver, request_id).await?);
    }
    txn.commit().await?;
    Ok(invoices)
}

async fn create_invoice_in<C>(
    db: &C,
    resolver: &dyn IncomeAccountResolver,
    request_id: i64,
) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    let req = load_request(db, request_id).await?;

    let stale_invoice_id = match req.invoice_id {
        Some(invoice_id) => {
            if let Some(existing) = invoicing::get_invoice(db, invoice_id).await? {
                tracing::debug!("Request {} already invoiced ({})", req.name, invoice_id);
                return Ok(existing);
            }
            // Reference to a removed invoice counts as not invoiced
            tracing::warn!(
                "Request {} references missing invoice {}, billing again",
                req.name,
                invoice_id
            );
            Some(invoice_id)
        }
        None => None,
    };

    if req.amount_total <= 0.0 {
        return Err(Error::validation(NO_FEES_MESSAGE));
    }

    let account = accounts::resolve_income_account(db, resolver).await?;
    let request_type = catalog::get_request_type(db, req.request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", req.request_type_id))?;

    let invoice = invoicing::create_invoice_document(
        db,
        invoicing::InvoiceDraft {
            partner_id: req.applicant_id,
            invoice_origin: req.name.clone(),
            currency: req.currency.clone(),
            lines: vec![invoicing::InvoiceLineDraft {
                name: format!("{} - {}", request_type.name, req.name),
                quantity: 1.0,
                price_unit: req.amount_total,
                account_id: account.id,
            }],
        },
    )
    .await?;

    let request_name = req.name.clone();
    let mut active: request::ActiveModel = req.into();
    active.invoice_id = Set(Some(invoice.id));
    let updated = active.update(db).await?;
    audit::record_change(
        db,
        request::RES_MODEL,
        updated.id,
        "invoice",
        stale_invoice_id.map(|id| id.to_string()),
        Some(invoice.id.to_string()),
    )
    .await?;

    tracing::info!(
        "Invoiced request {} on account {} ({})",
        request_name,
        account.code,
        resolver.label()
    );
    Ok(invoice)
}

/// Records a payment state reported for an invoice.
///
/// The change is also tracked on every request billed by that invoice.
pub async fn register_payment_state(
    db: &DatabaseConnection,
    invoice_id: i64,
    state: PaymentState,
) -> Result<invoice::Model> {
    let txn = db.begin().await?;
    let before = invoicing::get_invoice(&txn, invoice_id)
        .await?
        .ok_or_else(|| Error::not_found("invoice", invoice_id))?;
    let updated = invoicing::set_payment_state(&txn, invoice_id, state).await?;

    if before.payment_state != updated.payment_state {
        let billed = Request::find()
            .filter(request::Column::InvoiceId.eq(invoice_id))
            .all(&txn)
            .await?;
        for req in billed {
            audit::record_change(
                &txn,
                request::RES_MODEL,
                req.id,
                "payment_state",
                Some(before.payment_state.as_str().to_string()),
                Some(updated.payment_state.as_str().to_string()),
            )
            .await?;
        }
    }

    txn.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::accounts::{AccountTypeResolver, InternalTypeResolver, create_account};
    use crate::core::{gating, request as request_ops};
    use crate::test_utils::*;

    const RESOLVER: AccountTypeResolver = AccountTypeResolver {
        exclude_deprecated: true,
    };

    #[tokio::test]
    async fn test_invoice_single_line_on_first_income_account() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4100", "Permit Fees", Some("income"), None, false).await?;
        create_account(&db, "4050", "Old Fees", Some("income"), None, true).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;
        request_ops::set_fees(&db, req.id, 250.0).await?;

        let invoice = create_invoice(&db, &RESOLVER, req.id).await?;
        assert_eq!(invoice.partner_id, req.applicant_id);
        assert_eq!(invoice.invoice_origin, req.name);
        assert_eq!(invoice.amount_total, 250.0);
        assert_eq!(invoice.payment_state, PaymentState::NotPaid);

        let lines = invoicing::lines_for_invoice(&db, invoice.id).await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 1.0);
        assert_eq!(lines[0].price_unit, 250.0);
        assert_eq!(
            lines[0].name,
            format!("{} - {}", fixture.request_type.name, req.name)
        );
        let account = accounts::get_account_by_code(&db, "4100").await?.unwrap();
        assert_eq!(lines[0].account_id, account.id);

        let billed = request_ops::load_request(&db, req.id).await?;
        assert_eq!(billed.invoice_id, Some(invoice.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_requires_fees() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4100", "Permit Fees", Some("income"), None, false).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;

        let result = create_invoice(&db, &RESOLVER, req.id).await;
        match result {
            Err(Error::Validation { message }) => assert_eq!(message, NO_FEES_MESSAGE),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(request_ops::load_request(&db, req.id).await?.invoice_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_without_income_account() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "1000", "Cash", Some("asset_cash"), None, false).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;
        request_ops::set_fees(&db, req.id, 100.0).await?;

        let result = create_invoice(&db, &RESOLVER, req.id).await;
        match result {
            Err(Error::Validation { message }) => {
                assert_eq!(message, accounts::NO_INCOME_ACCOUNT_MESSAGE);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(request_ops::load_request(&db, req.id).await?.invoice_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_is_created_once() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4100", "Permit Fees", Some("income"), None, false).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;
        request_ops::set_fees(&db, req.id, 80.0).await?;

        let first = create_invoice(&db, &RESOLVER, req.id).await?;
        let second = create_invoice(&db, &RESOLVER, req.id).await?;
        assert_eq!(first.id, second.id);

        let locked = request_ops::set_fees(&db, req.id, 90.0).await;
        assert!(matches!(locked, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_invoice_reference_bills_again() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4100", "Permit Fees", Some("income"), None, false).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;
        request_ops::set_fees(&db, req.id, 80.0).await?;

        db.execute_unprepared("PRAGMA foreign_keys = OFF").await?;
        Request::update_many()
            .col_expr(request::Column::InvoiceId, Expr::value(9999_i64))
            .filter(request::Column::Id.eq(req.id))
            .exec(&db)
            .await?;

        let invoice = create_invoice(&db, &RESOLVER, req.id).await?;
        assert_ne!(invoice.id, 9999);
        assert_eq!(invoice.amount_total, 80.0);
        let billed = request_ops::load_request(&db, req.id).await?;
        assert_eq!(billed.invoice_id, Some(invoice.id));

        let history = audit::history_for(&db, request::RES_MODEL, req.id).await?;
        let change = history.iter().rfind(|event| event.field == "invoice").unwrap();
        assert_eq!(change.old_value.as_deref(), Some("9999"));
        Ok(())
    }

    #[tokio::test]
    async fn test_internal_type_schema() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4200", "Other Income", None, Some("other"), false).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;
        request_ops::set_fees(&db, req.id, 60.0).await?;

        let resolver = InternalTypeResolver {
            exclude_deprecated: false,
        };
        let invoice = create_invoice(&db, &resolver, req.id).await?;
        assert_eq!(invoice.amount_total, 60.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_invoice_rolls_back_on_failure() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4100", "Permit Fees", Some("income"), None, false).await?;
        let paid = create_test_request(&db, fixture.request_type.id).await?;
        let free = create_test_request(&db, fixture.request_type.id).await?;
        request_ops::set_fees(&db, paid.id, 120.0).await?;

        let result = create_invoices(&db, &RESOLVER, &[paid.id, free.id]).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(request_ops::load_request(&db, paid.id).await?.invoice_id.is_none());
        Ok(())
    }

    /// Fees, invoice, documents and release all have to line up before download.
    #[tokio::test]
    async fn test_release_download_flow() -> Result<()> {
        let (db, fixture) = setup_with_request_type().await?;
        create_account(&db, "4100", "Permit Fees", Some("income"), None, false).await?;
        let req = create_test_request(&db, fixture.request_type.id).await?;

        let submission = request_ops::submit_request(&db, req.id).await?;
        assert_eq!(submission.created_documents.len(), 2);

        request_ops::set_fees(&db, req.id, 500.0).await?;
        let invoice = create_invoice(&db, &RESOLVER, req.id).await?;
        assert_eq!(invoice.amount_total, 500.0);
        let permit = create_test_attachment(&db, "permit.pdf").await?;
        request_ops::set_released_attachment(&db, req.id, Some(permit.id), None).await?;

        let view = request_ops::load_request_view(&db, req.id).await?;
        assert!(!view.flags.is_paid);
        assert!(!view.flags.all_required_docs_accepted);
        assert!(!view.flags.can_download_released);

        register_payment_state(&db, invoice.id, PaymentState::Paid).await?;
        let view = request_ops::load_request_view(&db, req.id).await?;
        assert!(view.flags.is_paid);
        assert!(!view.flags.can_download_released);

        for doc in &view.documents {
            crate::core::document::set_document_status(
                &db,
                doc.id,
                crate::entities::DocumentStatus::Accepted,
                None,
            )
            .await?;
        }

        let view = request_ops::load_request_view(&db, req.id).await?;
        assert_eq!(
            view.flags,
            gating::GatingFlags {
                is_paid: true,
                all_required_docs_accepted: true,
                can_download_released: true,
            }
        );
        assert_eq!(view.payment_state(), Some(PaymentState::Paid));
        let download = request_ops::released_download(&db, req.id).await?.unwrap();
        assert_eq!(download.id, permit.id);

        let history = audit::history_for(&db, request::RES_MODEL, req.id).await?;
        assert!(history.iter().any(|e| e.field == "payment_state"
            && e.new_value.as_deref() == Some(PaymentState::Paid.as_str())));
        Ok(())
    }
}
