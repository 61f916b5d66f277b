//! Invoicing collaborator - Customer invoices and their payment state.
//!
//! The workflow only needs to create a draft customer invoice with its lines and
//! observe whether it has been paid. Payment registration itself happens in the
//! accounting system, which reports back through [`set_payment_state`].

use crate::{
    entities::{Invoice, InvoiceLine, PaymentState, invoice, invoice_line},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// One line of an invoice draft
#[derive(Debug, Clone)]
pub struct InvoiceLineDraft {
    /// Line label
    pub name: String,
    /// Quantity
    pub quantity: f64,
    /// Unit price
    pub price_unit: f64,
    /// Income account
    pub account_id: i64,
}

/// Everything needed to create a customer invoice
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    /// Billed partner
    pub partner_id: i64,
    /// Source document reference
    pub invoice_origin: String,
    /// Currency code
    pub currency: String,
    /// Invoice lines
    pub lines: Vec<InvoiceLineDraft>,
}

/// Creates a customer invoice (`out_invoice`) with its lines, unpaid.
pub async fn create_invoice_document<C>(db: &C, draft: InvoiceDraft) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    if draft.lines.is_empty() {
        return Err(Error::validation("An invoice needs at least one line"));
    }

    let amount_total: f64 = draft
        .lines
        .iter()
        .map(|line| line.quantity * line.price_unit)
        .sum();

    let invoice = invoice::ActiveModel {
        move_type: Set(invoice::OUT_INVOICE.to_string()),
        partner_id: Set(draft.partner_id),
        invoice_origin: Set(draft.invoice_origin),
        currency: Set(draft.currency),
        amount_total: Set(amount_total),
        payment_state: Set(PaymentState::NotPaid),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for line in draft.lines {
        invoice_line::ActiveModel {
            invoice_id: Set(invoice.id),
            name: Set(line.name),
            quantity: Set(line.quantity),
            price_unit: Set(line.price_unit),
            account_id: Set(line.account_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    tracing::info!(
        "Created invoice {} for {} ({:.2} {})",
        invoice.id,
        invoice.invoice_origin,
        invoice.amount_total,
        invoice.currency
    );
    Ok(invoice)
}

/// Finds an invoice by its unique ID.
pub async fn get_invoice<C>(db: &C, invoice_id: i64) -> Result<Option<invoice::Model>>
where
    C: ConnectionTrait,
{
    Invoice::find_by_id(invoice_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lines of an invoice in creation order.
pub async fn lines_for_invoice<C>(db: &C, invoice_id: i64) -> Result<Vec<invoice_line::Model>>
where
    C: ConnectionTrait,
{
    InvoiceLine::find()
        .filter(invoice_line::Column::InvoiceId.eq(invoice_id))
        .order_by_asc(invoice_line::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records the payment state reported by the accounting system.
pub async fn set_payment_state<C>(
    db: &C,
    invoice_id: i64,
    state: PaymentState,
) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    let invoice = get_invoice(db, invoice_id)
        .await?
        .ok_or_else(|| Error::not_found("invoice", invoice_id))?;

    if invoice.payment_state == state {
        return Ok(invoice);
    }

    tracing::info!(
        "Invoice {} payment state {} -> {}",
        invoice.id,
        invoice.payment_state.as_str(),
        state.as_str()
    );

    let mut active: invoice::ActiveModel = invoice.into();
    active.payment_state = Set(state);
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::accounts::create_account;
    use crate::test_utils::{create_test_partner, setup_test_db};

    #[tokio::test]
    async fn test_create_invoice_document_with_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "Juan Dela Cruz").await?;
        let account = create_account(&db, "4000", "Fees", Some("income"), None, false).await?;

        let invoice = create_invoice_document(
            &db,
            InvoiceDraft {
                partner_id: partner.id,
                invoice_origin: "ELGU/00001".to_string(),
                currency: "PHP".to_string(),
                lines: vec![
                    InvoiceLineDraft {
                        name: "Filing".to_string(),
                        quantity: 1.0,
                        price_unit: 300.0,
                        account_id: account.id,
                    },
                    InvoiceLineDraft {
                        name: "Stamps".to_string(),
                        quantity: 2.0,
                        price_unit: 50.0,
                        account_id: account.id,
                    },
                ],
            },
        )
        .await?;

        assert_eq!(invoice.move_type, invoice::OUT_INVOICE);
        assert_eq!(invoice.amount_total, 400.0);
        assert_eq!(invoice.payment_state, PaymentState::NotPaid);

        let lines = lines_for_invoice(&db, invoice.id).await?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].subtotal(), 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_payment_state() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "Maria Clara").await?;
        let account = create_account(&db, "4000", "Fees", Some("income"), None, false).await?;
        let invoice = create_invoice_document(
            &db,
            InvoiceDraft {
                partner_id: partner.id,
                invoice_origin: "ELGU/00002".to_string(),
                currency: "PHP".to_string(),
                lines: vec![InvoiceLineDraft {
                    name: "Fee".to_string(),
                    quantity: 1.0,
                    price_unit: 100.0,
                    account_id: account.id,
                }],
            },
        )
        .await?;

        let paid = set_payment_state(&db, invoice.id, PaymentState::Paid).await?;
        assert_eq!(paid.payment_state, PaymentState::Paid);

        let missing = set_payment_state(&db, 404, PaymentState::Paid).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_without_lines_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_invoice_document(
            &db,
            InvoiceDraft {
                partner_id: 1,
                invoice_origin: "X".to_string(),
                currency: "PHP".to_string(),
                lines: Vec::new(),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
