//! Derived gating flags - Pure functions over the current state of a request.
//!
//! Nothing here is stored. Callers load the request, its documents and its invoice
//! and evaluate the flags on read, so they can never go stale.

use crate::entities::{DocumentStatus, PaymentState, invoice, request, request_document};
use serde::Serialize;

/// Flags controlling what a citizen may do with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatingFlags {
    /// An invoice exists and is fully paid
    pub is_paid: bool,
    /// Every required document slot is accepted (vacuously true without any)
    pub all_required_docs_accepted: bool,
    /// The released document may be downloaded
    pub can_download_released: bool,
}

/// `true` iff an invoice exists and its payment state is paid.
#[must_use]
pub fn is_paid(invoice: Option<&invoice::Model>) -> bool {
    invoice.is_some_and(|inv| inv.payment_state == PaymentState::Paid)
}

/// `true` when there are no required slots, otherwise iff all required slots are accepted.
#[must_use]
pub fn all_required_docs_accepted(documents: &[request_document::Model]) -> bool {
    documents
        .iter()
        .filter(|doc| doc.is_required)
        .all(|doc| doc.status == DocumentStatus::Accepted)
}

/// `true` iff a released attachment is linked, the invoice (if any) is paid and all
/// required documents are accepted.
#[must_use]
pub fn can_download_released(
    request: &request::Model,
    invoice: Option<&invoice::Model>,
    documents: &[request_document::Model],
) -> bool {
    let paid_ok = invoice.is_none_or(|inv| inv.payment_state == PaymentState::Paid);
    request.released_attachment_id.is_some() && paid_ok && all_required_docs_accepted(documents)
}

/// Evaluates all flags at once.
#[must_use]
pub fn evaluate(
    request: &request::Model,
    invoice: Option<&invoice::Model>,
    documents: &[request_document::Model],
) -> GatingFlags {
    GatingFlags {
        is_paid: is_paid(invoice),
        all_required_docs_accepted: all_required_docs_accepted(documents),
        can_download_released: can_download_released(request, invoice, documents),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Decision;
    use chrono::Utc;

    fn request(released: Option<i64>, invoice_id: Option<i64>) -> request::Model {
        request::Model {
            id: 1,
            name: "ELGU/00001".to_string(),
            request_type_id: 1,
            stage_id: None,
            applicant_id: 1,
            submitted_on: None,
            reference_no_external: None,
            currency: "PHP".to_string(),
            amount_total: 0.0,
            invoice_id,
            assigned_user_id: None,
            department_notes: None,
            decision: Decision::Pending,
            decision_notes: None,
            active: true,
            released_attachment_id: released,
            released_date: None,
            created_at: Utc::now(),
        }
    }

    fn invoice(state: PaymentState) -> invoice::Model {
        invoice::Model {
            id: 1,
            move_type: invoice::OUT_INVOICE.to_string(),
            partner_id: 1,
            invoice_origin: "ELGU/00001".to_string(),
            currency: "PHP".to_string(),
            amount_total: 500.0,
            payment_state: state,
            created_at: Utc::now(),
        }
    }

    fn doc(id: i64, is_required: bool, status: DocumentStatus) -> request_document::Model {
        request_document::Model {
            id,
            request_id: 1,
            requirement_id: id,
            is_required,
            attachment_id: None,
            status,
            remarks: None,
        }
    }

    #[test]
    fn test_is_paid() {
        assert!(!is_paid(None));
        assert!(!is_paid(Some(&invoice(PaymentState::NotPaid))));
        assert!(!is_paid(Some(&invoice(PaymentState::InPayment))));
        assert!(!is_paid(Some(&invoice(PaymentState::Partial))));
        assert!(is_paid(Some(&invoice(PaymentState::Paid))));
    }

    #[test]
    fn test_all_required_docs_accepted() {
        assert!(all_required_docs_accepted(&[]));
        // Optional slots never block
        assert!(all_required_docs_accepted(&[doc(1, false, DocumentStatus::Missing)]));
        assert!(all_required_docs_accepted(&[
            doc(1, true, DocumentStatus::Accepted),
            doc(2, false, DocumentStatus::Rejected),
        ]));
        for status in [
            DocumentStatus::Missing,
            DocumentStatus::Submitted,
            DocumentStatus::Rejected,
        ] {
            assert!(!all_required_docs_accepted(&[
                doc(1, true, DocumentStatus::Accepted),
                doc(2, true, status),
            ]));
        }
    }

    #[test]
    fn test_can_download_requires_released_attachment() {
        let paid = invoice(PaymentState::Paid);
        let docs = [doc(1, true, DocumentStatus::Accepted)];
        assert!(!can_download_released(&request(None, None), None, &[]));
        assert!(!can_download_released(&request(None, Some(1)), Some(&paid), &docs));
    }

    #[test]
    fn test_can_download_without_invoice() {
        assert!(can_download_released(&request(Some(9), None), None, &[]));
    }

    #[test]
    fn test_can_download_blocked_by_unpaid_invoice_or_docs() {
        let unpaid = invoice(PaymentState::NotPaid);
        let paid = invoice(PaymentState::Paid);
        let pending_docs = [doc(1, true, DocumentStatus::Submitted)];
        let accepted_docs = [doc(1, true, DocumentStatus::Accepted)];

        let req = request(Some(9), Some(1));
        assert!(!can_download_released(&req, Some(&unpaid), &accepted_docs));
        assert!(!can_download_released(&req, Some(&paid), &pending_docs));
        assert!(can_download_released(&req, Some(&paid), &accepted_docs));

        let flags = evaluate(&req, Some(&paid), &accepted_docs);
        assert_eq!(
            flags,
            GatingFlags {
                is_paid: true,
                all_required_docs_accepted: true,
                can_download_released: true,
            }
        );
    }
}
