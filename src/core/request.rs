//! Request business logic - Lifecycle of a citizen's service request.
//!
//! A request moves from draft to submitted, is processed by staff through any of
//! the configured stages, receives a decision and is finally released. Every
//! operation runs in its own database transaction: either all of its effects are
//! stored or none are. Batch variants share one transaction, so a single failing
//! record aborts the whole batch.

use crate::{
    core::{attachment, audit, catalog, document, gating, invoicing, partner, sequence},
    entities::{
        Decision, PaymentState, Request, RequestDocument, attachment as attachment_entity,
        invoice, partner as partner_entity, request, request_document, request_type, stage,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Fields supplied when filing a request
#[derive(Debug, Clone)]
pub struct NewRequest {
    /// Explicit request number; `None` or the placeholder draws from the sequence
    pub name: Option<String>,
    /// Service type
    pub request_type_id: i64,
    /// Applicant partner
    pub applicant_id: i64,
    /// Explicit starting stage; `None` resolves the type's default
    pub stage_id: Option<i64>,
    /// Legacy reference number
    pub reference_no_external: Option<String>,
    /// Currency code; `None` uses the configured default
    pub currency: Option<String>,
    /// Initial fees
    pub amount_total: f64,
    /// Staff user handling the request
    pub assigned_user_id: Option<i64>,
    /// Released document uploaded together with the request
    pub released_attachment_id: Option<i64>,
}

impl NewRequest {
    /// A draft request of `request_type_id` filed by `applicant_id`.
    #[must_use]
    pub const fn new(request_type_id: i64, applicant_id: i64) -> Self {
        Self {
            name: None,
            request_type_id,
            applicant_id,
            stage_id: None,
            reference_no_external: None,
            currency: None,
            amount_total: 0.0,
            assigned_user_id: None,
            released_attachment_id: None,
        }
    }

    /// Starts the request in an explicit stage.
    #[must_use]
    pub const fn with_stage(mut self, stage_id: i64) -> Self {
        self.stage_id = Some(stage_id);
        self
    }

    /// Sets the currency code.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Sets the initial fees.
    #[must_use]
    pub const fn with_amount(mut self, amount_total: f64) -> Self {
        self.amount_total = amount_total;
        self
    }

    /// Sets the legacy reference number.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_no_external = Some(reference.into());
        self
    }

    /// Links a released document at creation time.
    #[must_use]
    pub const fn with_released_attachment(mut self, attachment_id: i64) -> Self {
        self.released_attachment_id = Some(attachment_id);
        self
    }
}

/// Result of a submit call
#[derive(Debug, Clone)]
pub struct Submission {
    /// The request after the call
    pub request: request::Model,
    /// Slots created by this call (empty on a repeated submit)
    pub created_documents: Vec<request_document::Model>,
}

/// A request with everything needed to display it
#[derive(Debug, Clone)]
pub struct RequestView {
    pub request: request::Model,
    pub request_type: request_type::Model,
    pub stage: Option<stage::Model>,
    pub applicant: partner_entity::Model,
    /// Slots, newest first
    pub documents: Vec<request_document::Model>,
    pub invoice: Option<invoice::Model>,
    pub flags: gating::GatingFlags,
}

impl RequestView {
    /// Applicant's email, read through the applicant
    #[must_use]
    pub fn applicant_email(&self) -> Option<&str> {
        self.applicant.email.as_deref()
    }

    /// Applicant's phone, read through the applicant
    #[must_use]
    pub fn applicant_phone(&self) -> Option<&str> {
        self.applicant.phone.as_deref()
    }

    /// Payment state of the invoice, read through the invoice
    #[must_use]
    pub fn payment_state(&self) -> Option<PaymentState> {
        self.invoice.as_ref().map(|inv| inv.payment_state)
    }
}

/// Filters for [`list_requests`]
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Include archived requests
    pub include_archived: bool,
    pub request_type_id: Option<i64>,
    pub stage_id: Option<i64>,
    pub decision: Option<Decision>,
}

async fn track<C>(
    db: &C,
    request_id: i64,
    field: &str,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    audit::record_change(db, request::RES_MODEL, request_id, field, old_value, new_value).await?;
    Ok(())
}

fn id_text(id: Option<i64>) -> Option<String> {
    id.map(|id| id.to_string())
}

fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount { amount })
    }
}

/// Loads a request or fails with [`Error::NotFound`].
pub async fn load_request<C>(db: &C, request_id: i64) -> Result<request::Model>
where
    C: ConnectionTrait,
{
    get_request(db, request_id)
        .await?
        .ok_or_else(|| Error::not_found("request", request_id))
}

/// Finds a request by its unique ID.
pub async fn get_request<C>(db: &C, request_id: i64) -> Result<Option<request::Model>>
where
    C: ConnectionTrait,
{
    Request::find_by_id(request_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a request by its number.
pub async fn get_request_by_name<C>(db: &C, name: &str) -> Result<Option<request::Model>>
where
    C: ConnectionTrait,
{
    Request::find()
        .filter(request::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Requests matching `filter`, newest first.
pub async fn list_requests<C>(db: &C, filter: &RequestFilter) -> Result<Vec<request::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Request::find();
    if !filter.include_archived {
        query = query.filter(request::Column::Active.eq(true));
    }
    if let Some(type_id) = filter.request_type_id {
        query = query.filter(request::Column::RequestTypeId.eq(type_id));
    }
    if let Some(stage_id) = filter.stage_id {
        query = query.filter(request::Column::StageId.eq(stage_id));
    }
    if let Some(decision) = filter.decision {
        query = query.filter(request::Column::Decision.eq(decision));
    }
    query
        .order_by_desc(request::Column::CreatedAt)
        .order_by_desc(request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

// ------------------------------------------------------------------
// Create
// ------------------------------------------------------------------

/// Files a new request.
///
/// The request number is drawn from the `elgu.request` sequence unless an explicit
/// one is given. When no stage is supplied the type's default stage is applied.
/// Requests without an explicit currency get `default_currency`, normally
/// [`AppConfig::currency`](crate::config::AppConfig::currency).
pub async fn create_request(
    db: &DatabaseConnection,
    default_currency: &str,
    new: NewRequest,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let created = create_request_in(&txn, default_currency, new).await?;
    txn.commit().await?;
    Ok(created)
}

/// Files several requests in one transaction.
pub async fn create_requests(
    db: &DatabaseConnection,
    default_currency: &str,
    new_requests: Vec<NewRequest>,
) -> Result<Vec<request::Model>> {
    let txn = db.begin().await?;
    let mut created = Vec::with_capacity(new_requests.len());
    for new in new_requests {
        created.push(create_request_in(&txn, default_currency, new).await?);
    }
    txn.commit().await?;
    Ok(created)
}

async fn create_request_in<C>(
    db: &C,
    default_currency: &str,
    new: NewRequest,
) -> Result<request::Model>
where
    C: ConnectionTrait,
{
    validate_amount(new.amount_total)?;
    catalog::get_request_type(db, new.request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", new.request_type_id))?;
    partner::get_partner(db, new.applicant_id)
        .await?
        .ok_or_else(|| Error::not_found("applicant", new.applicant_id))?;
    if let Some(stage_id) = new.stage_id {
        catalog::get_stage(db, stage_id)
            .await?
            .ok_or_else(|| Error::not_found("stage", stage_id))?;
    }

    let name = match new.name {
        Some(name) if name != request::PLACEHOLDER_NAME && !name.trim().is_empty() => name,
        _ => sequence::next_value_for(db, sequence::REQUEST_SEQUENCE_CODE).await?,
    };

    let model = request::ActiveModel {
        name: Set(name),
        request_type_id: Set(new.request_type_id),
        stage_id: Set(new.stage_id),
        applicant_id: Set(new.applicant_id),
        submitted_on: Set(None),
        reference_no_external: Set(new.reference_no_external),
        currency: Set(new.currency.unwrap_or_else(|| default_currency.to_string())),
        amount_total: Set(new.amount_total),
        invoice_id: Set(None),
        assigned_user_id: Set(new.assigned_user_id),
        department_notes: Set(None),
        decision: Set(Decision::Pending),
        decision_notes: Set(None),
        active: Set(true),
        released_attachment_id: Set(new.released_attachment_id),
        released_date: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;

    track(db, created.id, "name", None, Some(created.name.clone())).await?;
    track(
        db,
        created.id,
        "request_type",
        None,
        Some(created.request_type_id.to_string()),
    )
    .await?;
    track(
        db,
        created.id,
        "applicant",
        None,
        Some(created.applicant_id.to_string()),
    )
    .await?;

    let created = after_create(db, created).await?;
    tracing::info!("Created request {} (id {})", created.name, created.id);
    Ok(created)
}

/// Post-creation hook applied to every new request on its own.
async fn after_create<C>(db: &C, created: request::Model) -> Result<request::Model>
where
    C: ConnectionTrait,
{
    let mut created = created;

    if created.stage_id.is_none() {
        let request_type = catalog::get_request_type(db, created.request_type_id)
            .await?
            .ok_or_else(|| Error::not_found("request type", created.request_type_id))?;
        if let Some(stage) = catalog::resolve_default_stage(db, &request_type).await? {
            let mut active: request::ActiveModel = created.into();
            active.stage_id = Set(Some(stage.id));
            created = active.update(db).await?;
            track(db, created.id, "stage", None, Some(stage.id.to_string())).await?;
        }
    } else {
        track(db, created.id, "stage", None, id_text(created.stage_id)).await?;
    }

    sync_released_attachment_link(db, &created).await?;
    Ok(created)
}

/// Points the released attachment's owning record back at the request.
async fn sync_released_attachment_link<C>(db: &C, req: &request::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(attachment_id) = req.released_attachment_id {
        attachment::link_to_owner(db, attachment_id, request::RES_MODEL, req.id).await?;
    }
    Ok(())
}

// ------------------------------------------------------------------
// Submit
// ------------------------------------------------------------------

/// Submits a request on behalf of the applicant.
///
/// The first call stamps `submitted_on` and creates a `missing` slot for every
/// requirement of the request's type. Later calls change nothing.
pub async fn submit_request(db: &DatabaseConnection, request_id: i64) -> Result<Submission> {
    let txn = db.begin().await?;
    let submission = submit_request_in(&txn, request_id).await?;
    txn.commit().await?;
    Ok(submission)
}

/// Submits several requests in one transaction.
pub async fn submit_requests(
    db: &DatabaseConnection,
    request_ids: &[i64],
) -> Result<Vec<Submission>> {
    let txn = db.begin().await?;
    let mut submissions = Vec::with_capacity(request_ids.len());
    for &request_id in request_ids {
        submissions.push(submit_request_in(&txn, request_id).await?);
    }
    txn.commit().await?;
    Ok(submissions)
}

async fn submit_request_in<C>(db: &C, request_id: i64) -> Result<Submission>
where
    C: ConnectionTrait,
{
    let req = load_request(db, request_id).await?;
    if req.is_submitted() {
        tracing::debug!("Request {} already submitted", req.name);
        return Ok(Submission {
            request: req,
            created_documents: Vec::new(),
        });
    }

    let now = Utc::now();
    let mut active: request::ActiveModel = req.into();
    active.submitted_on = Set(Some(now));
    let req = active.update(db).await?;
    track(db, req.id, "submitted_on", None, Some(now.to_rfc3339())).await?;

    let created_documents = create_missing_slots(db, &req).await?;
    tracing::info!("Submitted request {}", req.name);

    Ok(Submission {
        request: req,
        created_documents,
    })
}

async fn create_missing_slots<C>(
    db: &C,
    req: &request::Model,
) -> Result<Vec<request_document::Model>>
where
    C: ConnectionTrait,
{
    let request_type = catalog::get_request_type(db, req.request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", req.request_type_id))?;
    let requirements = catalog::type_requirements(db, &request_type).await?;
    document::ensure_document_slots(db, req.id, &requirements).await
}

/// Creates slots for requirements added to the request's type after submission.
///
/// Draft requests get no slots; they are created on submit.
pub async fn sync_document_slots(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<Vec<request_document::Model>> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    let created = if req.is_submitted() {
        create_missing_slots(&txn, &req).await?
    } else {
        Vec::new()
    };
    txn.commit().await?;
    Ok(created)
}

// ------------------------------------------------------------------
// Staff actions
// ------------------------------------------------------------------

/// Moves a request into another stage.
///
/// Stages are free-form; any configured stage may be entered. A stage that
/// requires payment refuses requests with an outstanding balance: an unpaid
/// invoice, or no invoice yet while the type requires payment and fees are set.
pub async fn move_to_stage(
    db: &DatabaseConnection,
    request_id: i64,
    stage_id: i64,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    let target = catalog::get_stage(&txn, stage_id)
        .await?
        .ok_or_else(|| Error::not_found("stage", stage_id))?;

    if req.stage_id == Some(target.id) {
        return Ok(req);
    }

    if target.require_payment_before_enter && payment_outstanding(&txn, &req).await? {
        tracing::warn!(
            "Request {} refused entry to stage {}: payment outstanding",
            req.name,
            target.name
        );
        return Err(Error::validation(format!(
            "Request {} must be paid before entering stage {}.",
            req.name, target.name
        )));
    }

    let old_stage = req.stage_id;
    let mut active: request::ActiveModel = req.into();
    active.stage_id = Set(Some(target.id));
    let updated = active.update(&txn).await?;
    track(
        &txn,
        updated.id,
        "stage",
        id_text(old_stage),
        Some(target.id.to_string()),
    )
    .await?;

    txn.commit().await?;
    tracing::info!("Request {} moved to stage {}", updated.name, target.name);
    Ok(updated)
}

async fn payment_outstanding<C>(db: &C, req: &request::Model) -> Result<bool>
where
    C: ConnectionTrait,
{
    match req.invoice_id {
        Some(invoice_id) => {
            let invoice = invoicing::get_invoice(db, invoice_id).await?;
            Ok(!gating::is_paid(invoice.as_ref()))
        }
        None => {
            let request_type = catalog::get_request_type(db, req.request_type_id)
                .await?
                .ok_or_else(|| Error::not_found("request type", req.request_type_id))?;
            Ok(request_type.requires_payment && req.amount_total > 0.0)
        }
    }
}

/// Records the approval outcome.
pub async fn set_decision(
    db: &DatabaseConnection,
    request_id: i64,
    decision: Decision,
    notes: Option<String>,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    let old_decision = req.decision;

    let mut active: request::ActiveModel = req.into();
    active.decision = Set(decision);
    active.decision_notes = Set(notes);
    let updated = active.update(&txn).await?;
    track(
        &txn,
        updated.id,
        "decision",
        Some(old_decision.as_str().to_string()),
        Some(decision.as_str().to_string()),
    )
    .await?;

    txn.commit().await?;
    tracing::info!("Request {} decision: {}", updated.name, decision.as_str());
    Ok(updated)
}

/// Assigns (or unassigns) the handling staff user.
pub async fn assign_user(
    db: &DatabaseConnection,
    request_id: i64,
    user_id: Option<i64>,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    let old_user = req.assigned_user_id;

    let mut active: request::ActiveModel = req.into();
    active.assigned_user_id = Set(user_id);
    let updated = active.update(&txn).await?;
    track(&txn, updated.id, "assigned_user", id_text(old_user), id_text(user_id)).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Sets the total fees.
///
/// # Errors
/// [`Error::InvalidAmount`] for negative or non-finite amounts, and
/// [`Error::Validation`] once the request has been invoiced.
pub async fn set_fees(
    db: &DatabaseConnection,
    request_id: i64,
    amount_total: f64,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let updated = set_fees_in(&txn, request_id, amount_total).await?;
    txn.commit().await?;
    Ok(updated)
}

async fn set_fees_in<C>(db: &C, request_id: i64, amount_total: f64) -> Result<request::Model>
where
    C: ConnectionTrait,
{
    validate_amount(amount_total)?;
    let req = load_request(db, request_id).await?;
    if req.invoice_id.is_some() {
        return Err(Error::validation(format!(
            "Fees of request {} cannot be changed after invoicing.",
            req.name
        )));
    }

    let old_amount = req.amount_total;
    let mut active: request::ActiveModel = req.into();
    active.amount_total = Set(amount_total);
    let updated = active.update(db).await?;
    track(
        db,
        updated.id,
        "amount_total",
        Some(format!("{old_amount:.2}")),
        Some(format!("{amount_total:.2}")),
    )
    .await?;
    Ok(updated)
}

/// Copies the standard fee of the request's type when the type requires payment.
pub async fn apply_type_fee(db: &DatabaseConnection, request_id: i64) -> Result<request::Model> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    let request_type = catalog::get_request_type(&txn, req.request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", req.request_type_id))?;

    let updated = if request_type.requires_payment {
        set_fees_in(&txn, req.id, request_type.fee_amount).await?
    } else {
        req
    };
    txn.commit().await?;
    Ok(updated)
}

/// Sets the legacy reference number.
pub async fn set_external_reference(
    db: &DatabaseConnection,
    request_id: i64,
    reference: Option<String>,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    let old_reference = req.reference_no_external.clone();

    let mut active: request::ActiveModel = req.into();
    active.reference_no_external = Set(reference.clone());
    let updated = active.update(&txn).await?;
    track(&txn, updated.id, "reference_no_external", old_reference, reference).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Replaces the internal staff notes. Not tracked.
pub async fn set_department_notes(
    db: &DatabaseConnection,
    request_id: i64,
    notes: Option<String>,
) -> Result<request::Model> {
    let req = load_request(db, request_id).await?;
    let mut active: request::ActiveModel = req.into();
    active.department_notes = Set(notes);
    active.update(db).await.map_err(Into::into)
}

/// Links (or unlinks) the released document.
///
/// The attachment's owning record is forced to point at the request, whatever
/// path it was uploaded through. `released_date` defaults to now when linking.
pub async fn set_released_attachment(
    db: &DatabaseConnection,
    request_id: i64,
    attachment_id: Option<i64>,
    released_date: Option<DateTimeUtc>,
) -> Result<request::Model> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;
    if let Some(attachment_id) = attachment_id {
        attachment::get_attachment(&txn, attachment_id)
            .await?
            .ok_or_else(|| Error::not_found("attachment", attachment_id))?;
    }

    let old_attachment = req.released_attachment_id;
    let old_date = req.released_date;
    let new_date = attachment_id.map(|_| released_date.unwrap_or_else(Utc::now));

    let mut active: request::ActiveModel = req.into();
    active.released_attachment_id = Set(attachment_id);
    active.released_date = Set(new_date);
    let updated = active.update(&txn).await?;

    sync_released_attachment_link(&txn, &updated).await?;
    track(
        &txn,
        updated.id,
        "released_attachment",
        id_text(old_attachment),
        id_text(attachment_id),
    )
    .await?;
    track(
        &txn,
        updated.id,
        "released_date",
        old_date.map(|d| d.to_rfc3339()),
        new_date.map(|d| d.to_rfc3339()),
    )
    .await?;

    txn.commit().await?;
    tracing::info!("Request {} released document: {:?}", updated.name, attachment_id);
    Ok(updated)
}

async fn set_active(
    db: &DatabaseConnection,
    request_id: i64,
    active_flag: bool,
) -> Result<request::Model> {
    let req = load_request(db, request_id).await?;
    if req.active == active_flag {
        return Ok(req);
    }
    let mut active: request::ActiveModel = req.into();
    active.active = Set(active_flag);
    active.update(db).await.map_err(Into::into)
}

/// Hides a request from default listings.
pub async fn archive_request(db: &DatabaseConnection, request_id: i64) -> Result<request::Model> {
    set_active(db, request_id, false).await
}

/// Brings an archived request back.
pub async fn restore_request(db: &DatabaseConnection, request_id: i64) -> Result<request::Model> {
    set_active(db, request_id, true).await
}

/// Deletes a request together with its document slots.
pub async fn delete_request(db: &DatabaseConnection, request_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let req = load_request(&txn, request_id).await?;

    RequestDocument::delete_many()
        .filter(request_document::Column::RequestId.eq(req.id))
        .exec(&txn)
        .await?;
    Request::delete_by_id(req.id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Deleted request {}", req.name);
    Ok(())
}

// ------------------------------------------------------------------
// Reads
// ------------------------------------------------------------------

/// Loads a request with its type, stage, applicant, slots, invoice and flags.
pub async fn load_request_view<C>(db: &C, request_id: i64) -> Result<RequestView>
where
    C: ConnectionTrait,
{
    let req = load_request(db, request_id).await?;
    let request_type = catalog::get_request_type(db, req.request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", req.request_type_id))?;
    let stage = match req.stage_id {
        Some(stage_id) => catalog::get_stage(db, stage_id).await?,
        None => None,
    };
    let applicant = partner::get_partner(db, req.applicant_id)
        .await?
        .ok_or_else(|| Error::not_found("applicant", req.applicant_id))?;
    let documents = document::documents_for_request(db, req.id).await?;
    let invoice = match req.invoice_id {
        Some(invoice_id) => invoicing::get_invoice(db, invoice_id).await?,
        None => None,
    };
    let flags = gating::evaluate(&req, invoice.as_ref(), &documents);

    Ok(RequestView {
        request: req,
        request_type,
        stage,
        applicant,
        documents,
        invoice,
        flags,
    })
}

/// The released document, if the citizen may download it now.
pub async fn released_download<C>(
    db: &C,
    request_id: i64,
) -> Result<Option<attachment_entity::Model>>
where
    C: ConnectionTrait,
{
    let view = load_request_view(db, request_id).await?;
    if !view.flags.can_download_released {
        tracing::debug!("Released document of {} not yet downloadable", view.request.name);
        return Ok(None);
    }
    match view.request.released_attachment_id {
        Some(attachment_id) => attachment::get_attachment(db, attachment_id).await,
        None => Ok(None),
    }
}
