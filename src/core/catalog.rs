//! Catalog business logic - Requirements, stages and request types.
//!
//! These are configuration records maintained by administrators. Request types tie
//! everything together: they carry the allowed stages, the default stage, the
//! documentary requirements and the fee policy used by every request of the type.

use crate::{
    entities::{
        RequestType, Requirement, Stage, TypeRequirement, TypeStage, request_type, requirement,
        stage, type_requirement, type_stage,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Fields of a documentary requirement
#[derive(Debug, Clone)]
pub struct RequirementInput {
    /// Display name, must not be blank
    pub name: String,
    /// Optional short code
    pub code: Option<String>,
    /// Ordering key
    pub sequence: i32,
    /// Description shown to applicants
    pub description: Option<String>,
    /// Comma-separated accepted extensions
    pub allowed_file_types: String,
    /// Size limit in megabytes, must be positive
    pub max_file_size_mb: i32,
    /// Whether new slots are required
    pub required: bool,
}

impl RequirementInput {
    /// A required requirement with default file rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            sequence: 10,
            description: None,
            allowed_file_types: requirement::DEFAULT_ALLOWED_FILE_TYPES.to_string(),
            max_file_size_mb: requirement::DEFAULT_MAX_FILE_SIZE_MB,
            required: true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Requirement name cannot be empty"));
        }
        if self.max_file_size_mb <= 0 {
            return Err(Error::validation(format!(
                "Maximum file size must be greater than 0, got {}",
                self.max_file_size_mb
            )));
        }
        Ok(())
    }
}

/// Fields of a pipeline stage
#[derive(Debug, Clone)]
pub struct StageInput {
    /// Stage name, must not be blank
    pub name: String,
    /// Ordering key
    pub sequence: i32,
    pub is_initial: bool,
    pub is_closed: bool,
    pub fold: bool,
    pub description: Option<String>,
    /// Block entry until the request is paid
    pub require_payment_before_enter: bool,
}

impl StageInput {
    /// An ordinary stage at the given position.
    pub fn new(name: impl Into<String>, sequence: i32) -> Self {
        Self {
            name: name.into(),
            sequence,
            is_initial: false,
            is_closed: false,
            fold: false,
            description: None,
            require_payment_before_enter: false,
        }
    }
}

/// Fields of a request type, excluding its stage and requirement sets
#[derive(Debug, Clone)]
pub struct RequestTypeInput {
    /// Display name, must not be blank
    pub name: String,
    /// Unique code, must not be blank
    pub code: String,
    /// Ordering key
    pub sequence: i32,
    pub active: bool,
    /// Default stage for new requests
    pub default_stage_id: Option<i64>,
    pub requires_payment: bool,
    pub fee_notes: Option<String>,
    /// Standard fee, finite and not negative
    pub fee_amount: f64,
}

impl RequestTypeInput {
    /// An active, paying type without a default stage or fee.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            sequence: 10,
            active: true,
            default_stage_id: None,
            requires_payment: true,
            fee_notes: None,
            fee_amount: 0.0,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.code.trim().is_empty() {
            return Err(Error::validation("Request type name and code cannot be empty"));
        }
        if !self.fee_amount.is_finite() || self.fee_amount < 0.0 {
            return Err(Error::InvalidAmount {
                amount: self.fee_amount,
            });
        }
        Ok(())
    }
}

// ------------------------------------------------------------------
// Requirements
// ------------------------------------------------------------------

/// Creates a documentary requirement.
///
/// # Errors
/// Returns [`Error::Validation`] for a blank name or a non-positive size limit.
pub async fn create_requirement<C>(db: &C, input: RequirementInput) -> Result<requirement::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;

    let model = requirement::ActiveModel {
        name: Set(input.name.trim().to_string()),
        code: Set(input.code),
        sequence: Set(input.sequence),
        description: Set(input.description),
        allowed_file_types: Set(input.allowed_file_types),
        max_file_size_mb: Set(input.max_file_size_mb),
        required: Set(input.required),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Replaces the fields of a requirement.
///
/// Existing document slots keep their `is_required` snapshot.
pub async fn update_requirement<C>(
    db: &C,
    requirement_id: i64,
    input: RequirementInput,
) -> Result<requirement::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let existing = get_requirement(db, requirement_id)
        .await?
        .ok_or_else(|| Error::not_found("requirement", requirement_id))?;

    let mut active: requirement::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_string());
    active.code = Set(input.code);
    active.sequence = Set(input.sequence);
    active.description = Set(input.description);
    active.allowed_file_types = Set(input.allowed_file_types);
    active.max_file_size_mb = Set(input.max_file_size_mb);
    active.required = Set(input.required);
    active.update(db).await.map_err(Into::into)
}

/// Finds a requirement by its unique ID.
pub async fn get_requirement<C>(db: &C, requirement_id: i64) -> Result<Option<requirement::Model>>
where
    C: ConnectionTrait,
{
    Requirement::find_by_id(requirement_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a requirement by name.
pub async fn get_requirement_by_name<C>(db: &C, name: &str) -> Result<Option<requirement::Model>>
where
    C: ConnectionTrait,
{
    Requirement::find()
        .filter(requirement::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All requirements ordered by (sequence, name).
pub async fn list_requirements<C>(db: &C) -> Result<Vec<requirement::Model>>
where
    C: ConnectionTrait,
{
    Requirement::find()
        .order_by_asc(requirement::Column::Sequence)
        .order_by_asc(requirement::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

// ------------------------------------------------------------------
// Stages
// ------------------------------------------------------------------

/// Creates a pipeline stage.
pub async fn create_stage<C>(db: &C, input: StageInput) -> Result<stage::Model>
where
    C: ConnectionTrait,
{
    if input.name.trim().is_empty() {
        return Err(Error::validation("Stage name cannot be empty"));
    }

    let model = stage::ActiveModel {
        name: Set(input.name.trim().to_string()),
        sequence: Set(input.sequence),
        is_initial: Set(input.is_initial),
        is_closed: Set(input.is_closed),
        fold: Set(input.fold),
        description: Set(input.description),
        require_payment_before_enter: Set(input.require_payment_before_enter),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Replaces the fields of a stage.
pub async fn update_stage<C>(db: &C, stage_id: i64, input: StageInput) -> Result<stage::Model>
where
    C: ConnectionTrait,
{
    if input.name.trim().is_empty() {
        return Err(Error::validation("Stage name cannot be empty"));
    }
    let existing = get_stage(db, stage_id)
        .await?
        .ok_or_else(|| Error::not_found("stage", stage_id))?;

    let mut active: stage::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_string());
    active.sequence = Set(input.sequence);
    active.is_initial = Set(input.is_initial);
    active.is_closed = Set(input.is_closed);
    active.fold = Set(input.fold);
    active.description = Set(input.description);
    active.require_payment_before_enter = Set(input.require_payment_before_enter);
    active.update(db).await.map_err(Into::into)
}

/// Finds a stage by its unique ID.
pub async fn get_stage<C>(db: &C, stage_id: i64) -> Result<Option<stage::Model>>
where
    C: ConnectionTrait,
{
    Stage::find_by_id(stage_id).one(db).await.map_err(Into::into)
}

/// Finds a stage by name.
pub async fn get_stage_by_name<C>(db: &C, name: &str) -> Result<Option<stage::Model>>
where
    C: ConnectionTrait,
{
    Stage::find()
        .filter(stage::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Every stage ordered by (sequence, id), used to show empty columns when
/// grouping requests by stage.
pub async fn list_stages_for_grouping<C>(db: &C) -> Result<Vec<stage::Model>>
where
    C: ConnectionTrait,
{
    Stage::find()
        .order_by_asc(stage::Column::Sequence)
        .order_by_asc(stage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

// ------------------------------------------------------------------
// Request types
// ------------------------------------------------------------------

/// Creates a request type without stages or requirements.
///
/// The default stage is not required to be one of the allowed stages.
pub async fn create_request_type<C>(db: &C, input: RequestTypeInput) -> Result<request_type::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    if let Some(stage_id) = input.default_stage_id {
        ensure_stage_exists(db, stage_id).await?;
    }

    let model = request_type::ActiveModel {
        name: Set(input.name.trim().to_string()),
        code: Set(input.code.trim().to_string()),
        sequence: Set(input.sequence),
        active: Set(input.active),
        default_stage_id: Set(input.default_stage_id),
        requires_payment: Set(input.requires_payment),
        fee_notes: Set(input.fee_notes),
        fee_amount: Set(input.fee_amount),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Replaces the scalar fields of a request type.
pub async fn update_request_type<C>(
    db: &C,
    request_type_id: i64,
    input: RequestTypeInput,
) -> Result<request_type::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    if let Some(stage_id) = input.default_stage_id {
        ensure_stage_exists(db, stage_id).await?;
    }
    let existing = get_request_type(db, request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", request_type_id))?;

    let mut active: request_type::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_string());
    active.code = Set(input.code.trim().to_string());
    active.sequence = Set(input.sequence);
    active.active = Set(input.active);
    active.default_stage_id = Set(input.default_stage_id);
    active.requires_payment = Set(input.requires_payment);
    active.fee_notes = Set(input.fee_notes);
    active.fee_amount = Set(input.fee_amount);
    active.update(db).await.map_err(Into::into)
}

/// Finds a request type by its unique ID.
pub async fn get_request_type<C>(
    db: &C,
    request_type_id: i64,
) -> Result<Option<request_type::Model>>
where
    C: ConnectionTrait,
{
    RequestType::find_by_id(request_type_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a request type by code.
pub async fn get_request_type_by_code<C>(
    db: &C,
    code: &str,
) -> Result<Option<request_type::Model>>
where
    C: ConnectionTrait,
{
    RequestType::find()
        .filter(request_type::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Request types ordered by (sequence, name).
pub async fn list_request_types<C>(db: &C, active_only: bool) -> Result<Vec<request_type::Model>>
where
    C: ConnectionTrait,
{
    let mut query = RequestType::find();
    if active_only {
        query = query.filter(request_type::Column::Active.eq(true));
    }
    query
        .order_by_asc(request_type::Column::Sequence)
        .order_by_asc(request_type::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn ensure_stage_exists<C>(db: &C, stage_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    get_stage(db, stage_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::not_found("stage", stage_id))
}

/// Replaces the allowed stages of a request type.
///
/// Every id is checked before the old set is removed; on error the old set stays.
pub async fn set_type_stages(
    db: &DatabaseConnection,
    request_type_id: i64,
    stage_ids: &[i64],
) -> Result<()> {
    let txn = db.begin().await?;
    set_type_stages_in(&txn, request_type_id, stage_ids).await?;
    txn.commit().await?;
    Ok(())
}

/// [`set_type_stages`] inside the caller's transaction.
pub async fn set_type_stages_in<C>(db: &C, request_type_id: i64, stage_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    get_request_type(db, request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", request_type_id))?;

    let mut unique_ids: Vec<i64> = Vec::with_capacity(stage_ids.len());
    for &stage_id in stage_ids {
        if unique_ids.contains(&stage_id) {
            continue;
        }
        ensure_stage_exists(db, stage_id).await?;
        unique_ids.push(stage_id);
    }

    TypeStage::delete_many()
        .filter(type_stage::Column::RequestTypeId.eq(request_type_id))
        .exec(db)
        .await?;

    for stage_id in unique_ids {
        TypeStage::insert(type_stage::ActiveModel {
            request_type_id: Set(request_type_id),
            stage_id: Set(stage_id),
        })
        .exec_without_returning(db)
        .await?;
    }
    Ok(())
}

/// Replaces the requirement set of a request type.
///
/// Slots of already-submitted requests are left as they are. Every id is checked
/// before the old set is removed; on error the old set stays.
pub async fn set_type_requirements(
    db: &DatabaseConnection,
    request_type_id: i64,
    requirement_ids: &[i64],
) -> Result<()> {
    let txn = db.begin().await?;
    set_type_requirements_in(&txn, request_type_id, requirement_ids).await?;
    txn.commit().await?;
    Ok(())
}

/// [`set_type_requirements`] inside the caller's transaction.
pub async fn set_type_requirements_in<C>(
    db: &C,
    request_type_id: i64,
    requirement_ids: &[i64],
) -> Result<()>
where
    C: ConnectionTrait,
{
    get_request_type(db, request_type_id)
        .await?
        .ok_or_else(|| Error::not_found("request type", request_type_id))?;

    let mut unique_ids: Vec<i64> = Vec::with_capacity(requirement_ids.len());
    for &requirement_id in requirement_ids {
        if unique_ids.contains(&requirement_id) {
            continue;
        }
        get_requirement(db, requirement_id)
            .await?
            .ok_or_else(|| Error::not_found("requirement", requirement_id))?;
        unique_ids.push(requirement_id);
    }

    TypeRequirement::delete_many()
        .filter(type_requirement::Column::RequestTypeId.eq(request_type_id))
        .exec(db)
        .await?;

    for requirement_id in unique_ids {
        TypeRequirement::insert(type_requirement::ActiveModel {
            request_type_id: Set(request_type_id),
            requirement_id: Set(requirement_id),
        })
        .exec_without_returning(db)
        .await?;
    }
    Ok(())
}

/// Allowed stages of a request type ordered by (sequence, id).
pub async fn allowed_stages<C>(db: &C, request_type: &request_type::Model) -> Result<Vec<stage::Model>>
where
    C: ConnectionTrait,
{
    request_type
        .find_related(Stage)
        .order_by_asc(stage::Column::Sequence)
        .order_by_asc(stage::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Requirement set of a request type ordered by (sequence, name).
pub async fn type_requirements<C>(
    db: &C,
    request_type: &request_type::Model,
) -> Result<Vec<requirement::Model>>
where
    C: ConnectionTrait,
{
    request_type
        .find_related(Requirement)
        .order_by_asc(requirement::Column::Sequence)
        .order_by_asc(requirement::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stage a new request of this type starts in.
///
/// Prefers the type's default stage, then the allowed stage with the lowest
/// (sequence, id), and returns `None` when the type has neither.
pub async fn resolve_default_stage<C>(
    db: &C,
    request_type: &request_type::Model,
) -> Result<Option<stage::Model>>
where
    C: ConnectionTrait,
{
    if let Some(stage_id) = request_type.default_stage_id {
        if let Some(stage) = get_stage(db, stage_id).await? {
            return Ok(Some(stage));
        }
    }
    Ok(allowed_stages(db, request_type).await?.into_iter().next())
}
