//! Accounting handlers
//!
//! Transactions raised by accountants and authorised by A.I.E holders,
//! voucher generation, and the Master Imprest Register.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::accounting::{
    is_overdue, register_summary, ImprestStatus, RegisterSummary, TransactionAction,
    TransactionStatus, MAX_IMPREST_CENTS,
};
use crate::docgen::{DocError, GeneratedDocument, VoucherKind};
use crate::entity::audit_log::AuditAction;
use crate::entity::{imprest, transaction};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::handlers::job::today;
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;
use crate::state::AppState;

impl From<DocError> for AppError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::TemplateNotFound(path) => {
                AppError::Internal(format!("voucher template missing: {}", path.display()))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "payeeName")]
    pub payee_name: String,
    #[serde(rename = "payeeIdNumber")]
    pub payee_id_number: Option<String>,
    pub description: String,
    #[serde(rename = "amountCents")]
    pub amount_cents: i64,
    #[serde(rename = "voteHead")]
    pub vote_head: String,
    #[serde(rename = "aieNumber")]
    pub aie_number: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub status: Option<String>,
    #[serde(rename = "aieNumber")]
    pub aie_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoucherQuery {
    pub kind: VoucherKind,
}

#[derive(Debug, Deserialize)]
pub struct ImprestRequest {
    #[serde(rename = "holderName")]
    pub holder_name: String,
    #[serde(rename = "holderPersonalNumber")]
    pub holder_personal_number: String,
    pub purpose: String,
    #[serde(rename = "amountCents")]
    pub amount_cents: i64,
    #[serde(rename = "issuedOn")]
    pub issued_on: NaiveDate,
    #[serde(rename = "dueOn")]
    pub due_on: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RetireRequest {
    #[serde(rename = "retiredOn")]
    pub retired_on: Option<NaiveDate>,
    #[serde(rename = "amountRetiredCents")]
    pub amount_retired_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImprestQuery {
    pub status: Option<String>,
    #[serde(rename = "overdueOnly", default)]
    pub overdue_only: bool,
}

#[derive(Debug, Serialize)]
pub struct ImprestEntry {
    #[serde(flatten)]
    pub entry: imprest::Model,
    pub overdue: bool,
}

#[derive(Debug, Serialize)]
pub struct VoucherResponse {
    #[serde(flatten)]
    pub document: GeneratedDocument,
    pub transaction: transaction::Model,
}

fn require_any(user: &CurrentUser, perms: &[&str]) -> AppResult<()> {
    if perms.iter().any(|p| user.has_permission(p)) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("requires one of {}", perms.join(", "))))
    }
}

fn validate_transaction(req: &TransactionRequest) -> AppResult<()> {
    let mut problems = Vec::new();
    if req.payee_name.trim().is_empty() {
        problems.push("payeeName: required");
    }
    if req.description.trim().is_empty() {
        problems.push("description: required");
    }
    if req.amount_cents <= 0 {
        problems.push("amountCents: must be positive");
    }
    if req.vote_head.trim().is_empty() {
        problems.push("voteHead: required");
    }
    if req.aie_number.trim().is_empty() {
        problems.push("aieNumber: required");
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

/// POST /api/transactions
pub async fn create_transaction(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<TransactionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<transaction::Model>>)> {
    current_user.require(perm::ACCOUNTS)?;
    validate_transaction(&req)?;

    let model = transaction::ActiveModel {
        payee_name: Set(req.payee_name.trim().to_string()),
        payee_id_number: Set(req.payee_id_number.filter(|s| !s.trim().is_empty())),
        description: Set(req.description.trim().to_string()),
        amount_cents: Set(req.amount_cents),
        vote_head: Set(req.vote_head.trim().to_string()),
        aie_number: Set(req.aie_number.trim().to_string()),
        status: Set(TransactionStatus::Pending.as_str().to_string()),
        created_by: Set(current_user.id),
        approved_by: Set(None),
        approved_at: Set(None),
        remarks: Set(None),
        voucher_path: Set(None),
        created_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    log_operation(
        &current_user,
        AuditAction::CreateTransaction,
        "transaction",
        Some(model.id),
        format!("{} cents to {}", model.amount_cents, model.payee_name),
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// GET /api/transactions
pub async fn list_transactions(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<ApiResponse<Vec<transaction::Model>>>> {
    require_any(&current_user, &[perm::ACCOUNTS, perm::AIE])?;

    let mut select = transaction::Entity::find();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = TransactionStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest(format!("unknown status {}", status)))?;
        select = select.filter(transaction::Column::Status.eq(status.as_str()));
    }
    if let Some(aie) = query.aie_number.filter(|s| !s.is_empty()) {
        select = select.filter(transaction::Column::AieNumber.eq(aie));
    }
    let list = select
        .order_by_desc(transaction::Column::Id)
        .all(&*db)
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

async fn decide(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    action: TransactionAction,
    remarks: Option<String>,
) -> AppResult<transaction::Model> {
    let model = transaction::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("transaction {}", id))?;
    let from = TransactionStatus::parse(&model.status)
        .ok_or_else(|| AppError::Internal(format!("transaction {} has status {}", id, model.status)))?;
    let to = from.apply(action).ok_or_else(|| {
        AppError::Conflict(format!("cannot {:?} a {} transaction", action, from.as_str()))
    })?;

    if action != TransactionAction::Pay && model.created_by == user.id {
        return Err(AppError::Forbidden(
            "you cannot authorise a transaction you raised".to_string(),
        ));
    }
    let remarks = remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if action == TransactionAction::Reject && remarks.is_none() {
        return Err(AppError::Validation("remarks: required when rejecting".to_string()));
    }

    let mut update = transaction::Entity::update_many()
        .col_expr(transaction::Column::Status, Expr::value(to.as_str()));
    if action != TransactionAction::Pay {
        update = update
            .col_expr(transaction::Column::ApprovedBy, Expr::value(Some(user.id)))
            .col_expr(
                transaction::Column::ApprovedAt,
                Expr::value(Some(chrono::Utc::now().timestamp())),
            )
            .col_expr(transaction::Column::Remarks, Expr::value(remarks.clone()));
    }
    let result = update
        .filter(transaction::Column::Id.eq(id))
        .filter(transaction::Column::Status.eq(from.as_str()))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("transaction changed concurrently".to_string()));
    }

    let audit_action = match action {
        TransactionAction::Approve => AuditAction::ApproveTransaction,
        TransactionAction::Reject => AuditAction::RejectTransaction,
        TransactionAction::Pay => AuditAction::PayTransaction,
    };
    log_operation(
        user,
        audit_action,
        "transaction",
        Some(id),
        remarks.unwrap_or_default(),
    );
    state.notify_user(
        model.created_by,
        serde_json::json!({
            "type": "transactionStatus",
            "transactionId": id,
            "status": to.as_str(),
        }),
    );

    transaction::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("transaction {}", id))
}

/// POST /api/transactions/:id/approve
pub async fn approve_transaction(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    req: Option<Json<DecisionRequest>>,
) -> AppResult<Json<ApiResponse<transaction::Model>>> {
    current_user.require(perm::AIE)?;
    let remarks = req.and_then(|Json(r)| r.remarks);
    let model = decide(&state, &current_user, id, TransactionAction::Approve, remarks).await?;
    Ok(Json(ApiResponse::success(model)))
}

/// POST /api/transactions/:id/reject
pub async fn reject_transaction(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> AppResult<Json<ApiResponse<transaction::Model>>> {
    current_user.require(perm::AIE)?;
    let model = decide(&state, &current_user, id, TransactionAction::Reject, req.remarks).await?;
    Ok(Json(ApiResponse::success(model)))
}

/// POST /api/transactions/:id/pay
pub async fn pay_transaction(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<transaction::Model>>> {
    current_user.require(perm::ACCOUNTS)?;
    let model = decide(&state, &current_user, id, TransactionAction::Pay, None).await?;
    Ok(Json(ApiResponse::success(model)))
}

/// POST /api/transactions/:id/voucher?kind=claim|payment
pub async fn generate_voucher(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Query(query): Query<VoucherQuery>,
) -> AppResult<Json<ApiResponse<VoucherResponse>>> {
    current_user.require(perm::ACCOUNTS)?;

    let model = transaction::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("transaction {}", id))?;
    let status = TransactionStatus::parse(&model.status)
        .ok_or_else(|| AppError::Internal(format!("transaction {} has status {}", id, model.status)))?;
    if !status.allows_voucher() {
        return Err(AppError::Conflict(format!(
            "no voucher for a {} transaction",
            status.as_str()
        )));
    }

    let docs = state.docs.clone();
    let kind = query.kind;
    let tx = model.clone();
    let document = tokio::task::spawn_blocking(move || docs.generate_voucher(kind, &tx, today()))
        .await
        .map_err(|e| AppError::Internal(format!("voucher task failed: {}", e)))??;

    let mut active: transaction::ActiveModel = model.into();
    active.voucher_path = Set(Some(document.url.clone()));
    let updated = active.update(&state.db).await?;

    log_operation(
        &current_user,
        AuditAction::GenerateVoucher,
        "transaction",
        Some(id),
        document.file_name.clone(),
    );

    Ok(Json(ApiResponse::success(VoucherResponse {
        document,
        transaction: updated,
    })))
}

/// POST /api/imprest
pub async fn issue_imprest(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<ImprestRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<imprest::Model>>)> {
    current_user.require(perm::ACCOUNTS)?;
    if req.holder_name.trim().is_empty() || req.holder_personal_number.trim().is_empty() {
        return Err(AppError::Validation(
            "holderName, holderPersonalNumber: required".to_string(),
        ));
    }
    if req.amount_cents <= 0 || req.amount_cents > MAX_IMPREST_CENTS {
        return Err(AppError::Validation(format!(
            "amountCents: must be between 1 and {}",
            MAX_IMPREST_CENTS
        )));
    }
    if req.due_on < req.issued_on {
        return Err(AppError::Validation("dueOn: must not be before issuedOn".to_string()));
    }

    let model = imprest::ActiveModel {
        holder_name: Set(req.holder_name.trim().to_string()),
        holder_personal_number: Set(req.holder_personal_number.trim().to_string()),
        purpose: Set(req.purpose.trim().to_string()),
        amount_cents: Set(req.amount_cents),
        issued_on: Set(req.issued_on),
        due_on: Set(req.due_on),
        retired_on: Set(None),
        amount_retired_cents: Set(None),
        status: Set(ImprestStatus::Outstanding.as_str().to_string()),
        created_by: Set(current_user.id),
        created_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    log_operation(
        &current_user,
        AuditAction::IssueImprest,
        "imprest",
        Some(model.id),
        format!("{} cents to {}", model.amount_cents, model.holder_personal_number),
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// GET /api/imprest
pub async fn list_imprest(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<ImprestQuery>,
) -> AppResult<Json<ApiResponse<Vec<ImprestEntry>>>> {
    current_user.require(perm::ACCOUNTS)?;

    let mut select = imprest::Entity::find();
    if let Some(status) = query.status.filter(|s| !s.is_empty()) {
        select = select.filter(imprest::Column::Status.eq(status));
    }
    let today = today();
    let entries = select
        .order_by_asc(imprest::Column::DueOn)
        .all(&*db)
        .await?
        .into_iter()
        .map(|entry| ImprestEntry {
            overdue: is_overdue(&entry, today),
            entry,
        })
        .filter(|e| !query.overdue_only || e.overdue)
        .collect();
    Ok(Json(ApiResponse::success(entries)))
}

/// POST /api/imprest/:id/retire
pub async fn retire_imprest(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<RetireRequest>,
) -> AppResult<Json<ApiResponse<imprest::Model>>> {
    current_user.require(perm::ACCOUNTS)?;
    if !(0..=MAX_IMPREST_CENTS).contains(&req.amount_retired_cents) {
        return Err(AppError::Validation(format!(
            "amountRetiredCents: must be between 0 and {}",
            MAX_IMPREST_CENTS
        )));
    }

    let model = imprest::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(format!("imprest {}", id))?;
    if model.status != ImprestStatus::Outstanding.as_str() {
        return Err(AppError::Conflict("imprest is already retired".to_string()));
    }
    let retired_on = req.retired_on.unwrap_or_else(today);
    if retired_on < model.issued_on {
        return Err(AppError::Validation(
            "retiredOn: must not be before issuedOn".to_string(),
        ));
    }

    let result = imprest::Entity::update_many()
        .col_expr(imprest::Column::Status, Expr::value(ImprestStatus::Retired.as_str()))
        .col_expr(imprest::Column::RetiredOn, Expr::value(Some(retired_on)))
        .col_expr(
            imprest::Column::AmountRetiredCents,
            Expr::value(Some(req.amount_retired_cents)),
        )
        .filter(imprest::Column::Id.eq(id))
        .filter(imprest::Column::Status.eq(ImprestStatus::Outstanding.as_str()))
        .exec(&*db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("imprest is already retired".to_string()));
    }

    log_operation(
        &current_user,
        AuditAction::RetireImprest,
        "imprest",
        Some(id),
        format!("{} of {} cents", req.amount_retired_cents, model.amount_cents),
    );

    let updated = imprest::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(format!("imprest {}", id))?;
    Ok(Json(ApiResponse::success(updated)))
}

/// GET /api/imprest/summary
pub async fn imprest_summary(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<RegisterSummary>>> {
    current_user.require(perm::ACCOUNTS)?;
    let entries = imprest::Entity::find().all(&*db).await?;
    Ok(Json(ApiResponse::success(register_summary(&entries, today())?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_validation_lists_every_problem() {
        let req = TransactionRequest {
            payee_name: " ".to_string(),
            payee_id_number: None,
            description: "Fuel".to_string(),
            amount_cents: 0,
            vote_head: "2211201".to_string(),
            aie_number: String::new(),
        };
        match validate_transaction(&req) {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("payeeName"));
                assert!(msg.contains("amountCents"));
                assert!(msg.contains("aieNumber"));
                assert!(!msg.contains("description"));
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_template_is_internal() {
        let err: AppError = DocError::TemplateNotFound("templates/claim_voucher.docx".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
