//! DIAL declaration handlers
//!
//! Declarants keep a draft with spouses, dependents and income, asset and
//! liability items, then submit it for review. Reviewers move it through
//! review to approval or rejection and lock approved declarations. A
//! reviewed declaration is amended by starting a new draft version.
//!
//! Every status change is conditional on the status it was read with. Its
//! audit entry is written in the same transaction, and the declarant is
//! notified over the WebSocket channel once it commits.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::dial::{
    check_action, summarize, ActionCheck, Category, DialAction, DialStatus, Owner,
    StatementSummary, WorkflowError, MAX_ITEM_CENTS,
};
use crate::entity::audit_log::AuditAction;
use crate::entity::uploaded_file::{self, UploadedFileResponse};
use crate::entity::{dependent, dial_record, spouse, statement_item};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::{self, AuditEntry};
use crate::handlers::audit::{dial_trail, LogResponse};
use crate::handlers::employee;
use crate::middleware::auth::{perm, CurrentUser};
use crate::routes::ApiResponse;
use crate::state::AppState;

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidTransition { .. } | WorkflowError::AlreadyAmended(_) => {
                AppError::Conflict(err.to_string())
            }
            WorkflowError::SelfReview | WorkflowError::NotDeclarant => {
                AppError::Forbidden(err.to_string())
            }
            WorkflowError::RemarksRequired => {
                AppError::Validation("remarks: required when rejecting".to_string())
            }
            WorkflowError::Incomplete(msg) => AppError::Validation(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PeriodRequest {
    #[serde(rename = "periodStart")]
    pub period_start: NaiveDate,
    #[serde(rename = "periodEnd")]
    pub period_end: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SpouseRequest {
    pub surname: String,
    #[serde(rename = "otherNames")]
    pub other_names: String,
    pub occupation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DependentRequest {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub relationship: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub owner: Owner,
    pub category: Category,
    pub description: String,
    #[serde(rename = "amountCents")]
    pub amount_cents: i64,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQueueQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DialDetail {
    pub record: dial_record::Model,
    pub spouses: Vec<spouse::Model>,
    pub dependents: Vec<dependent::Model>,
    pub items: Vec<statement_item::Model>,
    pub summary: StatementSummary,
    pub attachments: Vec<UploadedFileResponse>,
}

#[derive(Debug, Serialize)]
pub struct DialHistory {
    /// Earliest version first
    pub versions: Vec<dial_record::Model>,
    pub trail: Vec<LogResponse>,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn status_of(record: &dial_record::Model) -> AppResult<DialStatus> {
    DialStatus::parse(&record.status).ok_or_else(|| {
        AppError::Internal(format!(
            "declaration {} has unknown status {}",
            record.id, record.status
        ))
    })
}

fn audit_action(action: DialAction) -> AuditAction {
    match action {
        DialAction::Submit => AuditAction::DialSubmit,
        DialAction::StartReview => AuditAction::DialStartReview,
        DialAction::Approve => AuditAction::DialApprove,
        DialAction::Reject => AuditAction::DialReject,
        DialAction::Lock => AuditAction::DialLock,
        DialAction::Amend => AuditAction::DialAmend,
    }
}

fn audit(user: &CurrentUser, action: AuditAction, record_id: i64, details: impl Into<String>) {
    service::record(
        AuditEntry::new(user, action, "dial_record")
            .dial(record_id)
            .details(details),
    );
}

async fn find_record(db: &DatabaseConnection, id: i64) -> AppResult<dial_record::Model> {
    dial_record::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_not_found(format!("declaration {}", id))
}

/// Declarants see their own records, reviewers see all of them
async fn readable_record(
    db: &DatabaseConnection,
    user: &CurrentUser,
    id: i64,
) -> AppResult<dial_record::Model> {
    let record = find_record(db, id).await?;
    if record.user_id != user.id && !user.has_permission(perm::DIAL_REVIEW) {
        return Err(AppError::Forbidden("not your declaration".to_string()));
    }
    Ok(record)
}

/// The caller's own declaration, still a draft
async fn editable_record(
    db: &DatabaseConnection,
    user: &CurrentUser,
    id: i64,
) -> AppResult<dial_record::Model> {
    user.require(perm::DIAL)?;
    let record = find_record(db, id).await?;
    if record.user_id != user.id {
        return Err(AppError::Forbidden("not your declaration".to_string()));
    }
    if !status_of(&record)?.is_editable() {
        return Err(AppError::Conflict(format!(
            "declaration is {} and can no longer change",
            record.status
        )));
    }
    Ok(record)
}

/// Bump `updated_at` on a draft after a sub-record change
async fn touch(db: &DatabaseConnection, id: i64) -> AppResult<()> {
    dial_record::Entity::update_many()
        .col_expr(dial_record::Column::UpdatedAt, Expr::value(now()))
        .filter(dial_record::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

fn validate_period(req: &PeriodRequest) -> AppResult<()> {
    if req.period_end < req.period_start {
        return Err(AppError::Validation(
            "periodEnd: must not be before periodStart".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/dial
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<dial_record::Model>>>> {
    current_user.require(perm::DIAL)?;
    let records = dial_record::Entity::find()
        .filter(dial_record::Column::UserId.eq(current_user.id))
        .order_by_desc(dial_record::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

/// GET /api/dial/review
pub async fn review_queue(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ReviewQueueQuery>,
) -> AppResult<Json<ApiResponse<Vec<dial_record::Model>>>> {
    current_user.require(perm::DIAL_REVIEW)?;

    let statuses: Vec<&'static str> = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => vec![DialStatus::parse(s)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status {}", s)))?
            .as_str()],
        None => vec![DialStatus::Submitted.as_str(), DialStatus::UnderReview.as_str()],
    };

    let records = dial_record::Entity::find()
        .filter(dial_record::Column::Status.is_in(statuses))
        .order_by_asc(dial_record::Column::SubmittedAt)
        .all(&state.db)
        .await?;
    Ok(Json(ApiResponse::success(records)))
}

/// POST /api/dial
pub async fn create_record(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<PeriodRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<dial_record::Model>>)> {
    current_user.require(perm::DIAL)?;
    validate_period(&req)?;

    let personal_number = employee::for_user(&state.db, current_user.id)
        .await?
        .map(|e| e.personal_number);
    let ts = now();
    let record = dial_record::ActiveModel {
        user_id: Set(current_user.id),
        personal_number: Set(personal_number),
        period_start: Set(req.period_start),
        period_end: Set(req.period_end),
        status: Set(DialStatus::Draft.as_str().to_string()),
        version: Set(1),
        previous_version_id: Set(None),
        submitted_at: Set(None),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        review_remarks: Set(None),
        locked_at: Set(None),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!("{} started declaration {}", current_user.email, record.id);
    audit(&current_user, AuditAction::DialCreate, record.id, "v1");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// GET /api/dial/:id
pub async fn get_record(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DialDetail>>> {
    let record = readable_record(&state.db, &current_user, id).await?;

    let spouses = spouse::Entity::find()
        .filter(spouse::Column::DialRecordId.eq(id))
        .order_by_asc(spouse::Column::Id)
        .all(&state.db)
        .await?;
    let dependents = dependent::Entity::find()
        .filter(dependent::Column::DialRecordId.eq(id))
        .order_by_asc(dependent::Column::Id)
        .all(&state.db)
        .await?;
    let items = statement_item::Entity::find()
        .filter(statement_item::Column::DialRecordId.eq(id))
        .order_by_asc(statement_item::Column::Id)
        .all(&state.db)
        .await?;
    let attachments = uploaded_file::Entity::find()
        .filter(uploaded_file::Column::DialRecordId.eq(id))
        .order_by_asc(uploaded_file::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(UploadedFileResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(DialDetail {
        summary: summarize(&items)?,
        record,
        spouses,
        dependents,
        items,
        attachments,
    })))
}

/// PUT /api/dial/:id
pub async fn update_record(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<PeriodRequest>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    validate_period(&req)?;
    let record = editable_record(&state.db, &current_user, id).await?;

    let mut active: dial_record::ActiveModel = record.into();
    active.period_start = Set(req.period_start);
    active.period_end = Set(req.period_end);
    active.updated_at = Set(now());
    let updated = active.update(&state.db).await?;

    audit(&current_user, AuditAction::DialUpdate, id, "period");
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/dial/:id
///
/// Only never-submitted first drafts can be discarded.
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let record = editable_record(&state.db, &current_user, id).await?;
    if record.submitted_at.is_some() {
        return Err(AppError::Conflict("submitted declarations are kept".to_string()));
    }

    let txn = state.db.begin().await?;
    delete_children(&txn, id).await?;
    dial_record::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit(&current_user, AuditAction::DialUpdate, id, "discarded draft");
    Ok(Json(ApiResponse::success_msg("declaration discarded")))
}

async fn delete_children<C: ConnectionTrait>(db: &C, id: i64) -> AppResult<()> {
    spouse::Entity::delete_many()
        .filter(spouse::Column::DialRecordId.eq(id))
        .exec(db)
        .await?;
    dependent::Entity::delete_many()
        .filter(dependent::Column::DialRecordId.eq(id))
        .exec(db)
        .await?;
    statement_item::Entity::delete_many()
        .filter(statement_item::Column::DialRecordId.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// POST /api/dial/:id/spouses
pub async fn add_spouse(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<SpouseRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<spouse::Model>>)> {
    editable_record(&state.db, &current_user, id).await?;
    if req.surname.trim().is_empty() {
        return Err(AppError::Validation("surname: required".to_string()));
    }

    let model = spouse::ActiveModel {
        dial_record_id: Set(id),
        surname: Set(req.surname.trim().to_string()),
        other_names: Set(req.other_names.trim().to_string()),
        occupation: Set(req.occupation),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    touch(&state.db, id).await?;

    audit(&current_user, AuditAction::DialUpdate, id, "added spouse");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// DELETE /api/dial/:id/spouses/:sub_id
pub async fn delete_spouse(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    editable_record(&state.db, &current_user, id).await?;
    let result = spouse::Entity::delete_many()
        .filter(spouse::Column::Id.eq(sub_id))
        .filter(spouse::Column::DialRecordId.eq(id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("spouse {}", sub_id)));
    }
    touch(&state.db, id).await?;
    audit(&current_user, AuditAction::DialUpdate, id, "removed spouse");
    Ok(Json(ApiResponse::success_msg("spouse removed")))
}

/// POST /api/dial/:id/dependents
pub async fn add_dependent(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DependentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<dependent::Model>>)> {
    editable_record(&state.db, &current_user, id).await?;
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("fullName: required".to_string()));
    }

    let model = dependent::ActiveModel {
        dial_record_id: Set(id),
        full_name: Set(req.full_name.trim().to_string()),
        relationship: Set(req.relationship.trim().to_string()),
        date_of_birth: Set(req.date_of_birth),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    touch(&state.db, id).await?;

    audit(&current_user, AuditAction::DialUpdate, id, "added dependent");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// DELETE /api/dial/:id/dependents/:sub_id
pub async fn delete_dependent(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    editable_record(&state.db, &current_user, id).await?;
    let result = dependent::Entity::delete_many()
        .filter(dependent::Column::Id.eq(sub_id))
        .filter(dependent::Column::DialRecordId.eq(id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("dependent {}", sub_id)));
    }
    touch(&state.db, id).await?;
    audit(&current_user, AuditAction::DialUpdate, id, "removed dependent");
    Ok(Json(ApiResponse::success_msg("dependent removed")))
}

/// POST /api/dial/:id/items
pub async fn add_item(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<statement_item::Model>>)> {
    editable_record(&state.db, &current_user, id).await?;
    if req.description.trim().is_empty() {
        return Err(AppError::Validation("description: required".to_string()));
    }
    if !(0..=MAX_ITEM_CENTS).contains(&req.amount_cents) {
        return Err(AppError::Validation(format!(
            "amountCents: must be between 0 and {}",
            MAX_ITEM_CENTS
        )));
    }

    let model = statement_item::ActiveModel {
        dial_record_id: Set(id),
        owner: Set(req.owner.as_str().to_string()),
        category: Set(req.category.as_str().to_string()),
        description: Set(req.description.trim().to_string()),
        amount_cents: Set(req.amount_cents),
        location: Set(req.location),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    touch(&state.db, id).await?;

    audit(
        &current_user,
        AuditAction::DialUpdate,
        id,
        format!("added {} item", req.category.as_str()),
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// DELETE /api/dial/:id/items/:sub_id
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path((id, sub_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    editable_record(&state.db, &current_user, id).await?;
    let result = statement_item::Entity::delete_many()
        .filter(statement_item::Column::Id.eq(sub_id))
        .filter(statement_item::Column::DialRecordId.eq(id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("item {}", sub_id)));
    }
    touch(&state.db, id).await?;
    audit(&current_user, AuditAction::DialUpdate, id, "removed item");
    Ok(Json(ApiResponse::success_msg("item removed")))
}

/// GET /api/dial/:id/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<StatementSummary>>> {
    readable_record(&state.db, &current_user, id).await?;
    let items = statement_item::Entity::find()
        .filter(statement_item::Column::DialRecordId.eq(id))
        .all(&state.db)
        .await?;
    Ok(Json(ApiResponse::success(summarize(&items)?)))
}

/// GET /api/dial/:id/history
pub async fn get_history(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<DialHistory>>> {
    let record = readable_record(&state.db, &current_user, id).await?;

    // Walk back through previous versions
    let mut versions = vec![record];
    while let Some(prev_id) = versions.last().and_then(|r| r.previous_version_id) {
        if versions.iter().any(|r| r.id == prev_id) {
            tracing::error!("Version cycle at declaration {}", prev_id);
            break;
        }
        match dial_record::Entity::find_by_id(prev_id).one(&state.db).await? {
            Some(prev) => versions.push(prev),
            None => break,
        }
    }
    versions.reverse();

    let trail = dial_trail(&state.db, id).await?;
    Ok(Json(ApiResponse::success(DialHistory { versions, trail })))
}

async fn run_action(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    action: DialAction,
    remarks: Option<String>,
) -> AppResult<dial_record::Model> {
    user.require(if action.is_review() {
        perm::DIAL_REVIEW
    } else {
        perm::DIAL
    })?;
    let record = find_record(&state.db, id).await?;
    let from = status_of(&record)?;
    let remarks = remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let item_count = if action == DialAction::Submit {
        statement_item::Entity::find()
            .filter(statement_item::Column::DialRecordId.eq(id))
            .count(&state.db)
            .await? as usize
    } else {
        0
    };
    let amended_as = if action == DialAction::Amend {
        successor_of(&state.db, id).await?
    } else {
        None
    };

    let to = check_action(&ActionCheck {
        action,
        status: from,
        declarant_id: record.user_id,
        actor_id: user.id,
        remarks: remarks.as_deref(),
        period_start: record.period_start,
        period_end: record.period_end,
        item_count,
        amended_as,
    })?;

    let details = match &remarks {
        Some(r) => format!("{} -> {}: {}", from.as_str(), to.as_str(), r),
        None => format!("{} -> {}", from.as_str(), to.as_str()),
    };
    let entry = AuditEntry::new(user, audit_action(action), "dial_record")
        .dial(id)
        .details(details.clone());

    let updated = match action {
        DialAction::Amend => amend(state, user, &record, entry).await?,
        _ => apply_status(state, user, &record, from, to, action, remarks, entry).await?,
    };

    tracing::info!("Declaration {} {:?} by {}: {}", id, action, user.email, details);
    state.notify_user(
        record.user_id,
        json!({
            "type": "dialStatus",
            "dialRecordId": updated.id,
            "sourceId": id,
            "status": updated.status,
            "version": updated.version,
        }),
    );

    Ok(updated)
}

/// Id of the version that amended `id`, if any
async fn successor_of<C: ConnectionTrait>(db: &C, id: i64) -> AppResult<Option<i64>> {
    Ok(dial_record::Entity::find()
        .filter(dial_record::Column::PreviousVersionId.eq(id))
        .one(db)
        .await?
        .map(|newer| newer.id))
}

/// Conditional status update written with its audit entry; a concurrent
/// change makes it a conflict
#[allow(clippy::too_many_arguments)]
async fn apply_status(
    state: &AppState,
    user: &CurrentUser,
    record: &dial_record::Model,
    from: DialStatus,
    to: DialStatus,
    action: DialAction,
    remarks: Option<String>,
    entry: AuditEntry,
) -> AppResult<dial_record::Model> {
    let ts = now();
    let mut update = dial_record::Entity::update_many()
        .col_expr(dial_record::Column::Status, Expr::value(to.as_str()))
        .col_expr(dial_record::Column::UpdatedAt, Expr::value(ts));

    match action {
        DialAction::Submit => {
            update = update.col_expr(dial_record::Column::SubmittedAt, Expr::value(Some(ts)));
        }
        DialAction::StartReview => {
            update = update.col_expr(dial_record::Column::ReviewedBy, Expr::value(Some(user.id)));
        }
        DialAction::Approve | DialAction::Reject => {
            update = update
                .col_expr(dial_record::Column::ReviewedBy, Expr::value(Some(user.id)))
                .col_expr(dial_record::Column::ReviewedAt, Expr::value(Some(ts)))
                .col_expr(dial_record::Column::ReviewRemarks, Expr::value(remarks));
        }
        DialAction::Lock => {
            update = update.col_expr(dial_record::Column::LockedAt, Expr::value(Some(ts)));
        }
        DialAction::Amend => {}
    }

    let txn = state.db.begin().await?;
    let result = update
        .filter(dial_record::Column::Id.eq(record.id))
        .filter(dial_record::Column::Status.eq(from.as_str()))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "declaration changed while you were working on it".to_string(),
        ));
    }
    service::write(&txn, entry).await?;
    txn.commit().await?;

    find_record(&state.db, record.id).await
}

/// New draft version copying every sub-record of `source`.
///
/// The unique index on `previous_version_id` makes a concurrent second amend
/// fail on insert; that is reported as a conflict.
async fn amend(
    state: &AppState,
    user: &CurrentUser,
    source: &dial_record::Model,
    entry: AuditEntry,
) -> AppResult<dial_record::Model> {
    let ts = now();
    let txn = state.db.begin().await?;

    let draft = dial_record::ActiveModel {
        user_id: Set(source.user_id),
        personal_number: Set(source.personal_number.clone()),
        period_start: Set(source.period_start),
        period_end: Set(source.period_end),
        status: Set(DialStatus::Draft.as_str().to_string()),
        version: Set(source.version + 1),
        previous_version_id: Set(Some(source.id)),
        submitted_at: Set(None),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        review_remarks: Set(None),
        locked_at: Set(None),
        created_at: Set(ts),
        updated_at: Set(ts),
        ..Default::default()
    };
    let draft = match draft.insert(&txn).await {
        Ok(draft) => draft,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(already_amended(&txn, source.id).await);
        }
        Err(e) => return Err(e.into()),
    };

    for s in spouse::Entity::find()
        .filter(spouse::Column::DialRecordId.eq(source.id))
        .all(&txn)
        .await?
    {
        spouse::ActiveModel {
            dial_record_id: Set(draft.id),
            surname: Set(s.surname),
            other_names: Set(s.other_names),
            occupation: Set(s.occupation),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    for d in dependent::Entity::find()
        .filter(dependent::Column::DialRecordId.eq(source.id))
        .all(&txn)
        .await?
    {
        dependent::ActiveModel {
            dial_record_id: Set(draft.id),
            full_name: Set(d.full_name),
            relationship: Set(d.relationship),
            date_of_birth: Set(d.date_of_birth),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    for item in statement_item::Entity::find()
        .filter(statement_item::Column::DialRecordId.eq(source.id))
        .all(&txn)
        .await?
    {
        statement_item::ActiveModel {
            dial_record_id: Set(draft.id),
            owner: Set(item.owner),
            category: Set(item.category),
            description: Set(item.description),
            amount_cents: Set(item.amount_cents),
            location: Set(item.location),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    service::write(&txn, entry).await?;
    service::write(
        &txn,
        AuditEntry::new(user, AuditAction::DialCreate, "dial_record")
            .dial(draft.id)
            .details(format!("v{} from {}", draft.version, source.id)),
    )
    .await?;

    txn.commit().await?;
    Ok(draft)
}

async fn already_amended(txn: &DatabaseTransaction, id: i64) -> AppError {
    // The failed insert may have aborted the transaction; the id is best effort
    match successor_of(txn, id).await {
        Ok(Some(newer)) => WorkflowError::AlreadyAmended(newer).into(),
        _ => AppError::Conflict(format!("declaration {} was already amended", id)),
    }
}

async fn action_handler(
    state: AppState,
    user: CurrentUser,
    id: i64,
    action: DialAction,
    req: Option<ActionRequest>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    let remarks = req.and_then(|r| r.remarks);
    let record = run_action(&state, &user, id, action, remarks).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// POST /api/dial/:id/submit
pub async fn submit(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    action_handler(state, current_user, id, DialAction::Submit, None).await
}

/// POST /api/dial/:id/start-review
pub async fn start_review(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    action_handler(state, current_user, id, DialAction::StartReview, None).await
}

/// POST /api/dial/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    req: Option<Json<ActionRequest>>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    action_handler(state, current_user, id, DialAction::Approve, req.map(|Json(r)| r)).await
}

/// POST /api/dial/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ActionRequest>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    action_handler(state, current_user, id, DialAction::Reject, Some(req)).await
}

/// POST /api/dial/:id/lock
pub async fn lock(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<dial_record::Model>>> {
    action_handler(state, current_user, id, DialAction::Lock, None).await
}

/// POST /api/dial/:id/amend
///
/// Returns the new draft version.
pub async fn amend_record(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<(StatusCode, Json<ApiResponse<dial_record::Model>>)> {
    let Json(resp) = action_handler(state, current_user, id, DialAction::Amend, None).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(action: DialAction, status: DialStatus, actor_id: i64) -> ActionCheck<'static> {
        ActionCheck {
            action,
            status,
            declarant_id: 5,
            actor_id,
            remarks: None,
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            item_count: 1,
            amended_as: None,
        }
    }

    fn status_for(c: ActionCheck<'_>) -> StatusCode {
        AppError::from(check_action(&c).unwrap_err()).status()
    }

    #[test]
    fn workflow_errors_map_to_http() {
        assert_eq!(
            status_for(check(DialAction::Amend, DialStatus::Locked, 5)),
            StatusCode::CONFLICT
        );

        let mut empty = check(DialAction::Submit, DialStatus::Draft, 5);
        empty.item_count = 0;
        assert_eq!(status_for(empty), StatusCode::BAD_REQUEST);

        assert_eq!(
            status_for(check(DialAction::Approve, DialStatus::UnderReview, 5)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(check(DialAction::Submit, DialStatus::Draft, 6)),
            StatusCode::FORBIDDEN
        );

        let rejected = AppError::from(
            check_action(&check(DialAction::Reject, DialStatus::UnderReview, 6)).unwrap_err(),
        );
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        assert!(rejected.to_string().contains("remarks"));

        let mut twice = check(DialAction::Amend, DialStatus::Approved, 5);
        twice.amended_as = Some(12);
        assert_eq!(status_for(twice), StatusCode::CONFLICT);
    }

    #[test]
    fn every_action_is_audited_distinctly() {
        let actions = [
            DialAction::Submit,
            DialAction::StartReview,
            DialAction::Approve,
            DialAction::Reject,
            DialAction::Lock,
            DialAction::Amend,
        ];
        let mut names: Vec<&str> = actions.iter().map(|a| audit_action(*a).as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), actions.len());
    }

    #[test]
    fn item_request_accepts_self_owner() {
        let req: ItemRequest = serde_json::from_value(json!({
            "owner": "self",
            "category": "asset",
            "description": "Plot in Kitale",
            "amountCents": 150_000_000,
            "location": "Kitale"
        }))
        .unwrap();
        assert_eq!(req.owner, Owner::Declarant);
        assert_eq!(req.category, Category::Asset);
    }
}
