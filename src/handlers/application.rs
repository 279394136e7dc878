//! Job application handlers
//!
//! Applicants apply to open adverts they are eligible for; the board and
//! administrators shortlist, reject or hire.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entity::application::{self, ApplicationStatus};
use crate::entity::audit_log::AuditAction;
use crate::entity::{job, user};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::handlers::job::today;
use crate::handlers::profile::evaluate;
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ApplicationStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: i64,
    #[serde(rename = "jobId")]
    pub job_id: i64,
    #[serde(rename = "jobTitle")]
    pub job_title: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "applicantName")]
    pub applicant_name: Option<String>,
    pub status: String,
    pub remarks: Option<String>,
    #[serde(rename = "submittedAt")]
    pub submitted_at: i64,
    #[serde(rename = "reviewedAt")]
    pub reviewed_at: Option<i64>,
}

impl From<application::Model> for ApplicationResponse {
    fn from(m: application::Model) -> Self {
        Self {
            id: m.id,
            job_id: m.job_id,
            job_title: None,
            user_id: m.user_id,
            applicant_name: None,
            status: m.status,
            remarks: m.remarks,
            submitted_at: m.submitted_at,
            reviewed_at: m.reviewed_at,
        }
    }
}

/// POST /api/jobs/:id/apply
pub async fn apply(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(job_id): Path<i64>,
) -> AppResult<(StatusCode, Json<ApiResponse<ApplicationResponse>>)> {
    current_user.require(perm::PROFILE)?;

    let advert = job::Entity::find_by_id(job_id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("job {}", job_id))?;
    if !advert.is_open() || advert.deadline < today() {
        return Err(AppError::BadRequest("this advert is no longer accepting applications".to_string()));
    }

    let existing = application::Entity::find()
        .filter(application::Column::JobId.eq(job_id))
        .filter(application::Column::UserId.eq(current_user.id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("you have already applied for this job".to_string()));
    }

    let eligibility = evaluate(&state, Some(&current_user), &advert).await?;
    if !eligibility.eligible {
        return Err(AppError::Validation(
            eligibility.reason.unwrap_or_else(|| "not eligible".to_string()),
        ));
    }

    let inserted = application::ActiveModel {
        job_id: Set(job_id),
        user_id: Set(current_user.id),
        status: Set(ApplicationStatus::Submitted.as_str().to_string()),
        remarks: Set(None),
        submitted_at: Set(chrono::Utc::now().timestamp()),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await;
    let model = match inserted {
        Ok(model) => model,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("you have already applied for this job".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("{} applied for job {}", current_user.email, job_id);
    log_operation(&current_user, AuditAction::Apply, "application", Some(model.id), advert.title.clone());

    let mut resp = ApplicationResponse::from(model);
    resp.job_title = Some(advert.title);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(resp))))
}

/// GET /api/applications/mine
pub async fn my_applications(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<Vec<ApplicationResponse>>>> {
    let rows = application::Entity::find()
        .filter(application::Column::UserId.eq(current_user.id))
        .order_by_desc(application::Column::SubmittedAt)
        .find_also_related(job::Entity)
        .all(&*db)
        .await?;

    let list = rows
        .into_iter()
        .map(|(app, advert)| {
            let mut resp = ApplicationResponse::from(app);
            resp.job_title = advert.map(|j| j.title);
            resp
        })
        .collect();
    Ok(Json(ApiResponse::success(list)))
}

/// GET /api/jobs/:id/applications
pub async fn list_for_job(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(job_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<ApplicationResponse>>>> {
    current_user.require(perm::APPLICATIONS)?;

    let rows = application::Entity::find()
        .filter(application::Column::JobId.eq(job_id))
        .order_by_asc(application::Column::SubmittedAt)
        .find_also_related(user::Entity)
        .all(&*db)
        .await?;

    let list = rows
        .into_iter()
        .map(|(app, applicant)| {
            let mut resp = ApplicationResponse::from(app);
            resp.applicant_name = applicant.map(|u| u.full_name);
            resp
        })
        .collect();
    Ok(Json(ApiResponse::success(list)))
}

/// POST /api/applications/:id/review
pub async fn review_application(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<Json<ApiResponse<ApplicationResponse>>> {
    current_user.require(perm::APPLICATIONS)?;

    let model = application::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("application {}", id))?;
    let current = ApplicationStatus::parse(&model.status)
        .ok_or_else(|| AppError::Internal(format!("application {} has status {}", id, model.status)))?;
    if !current.can_move_to(req.status) {
        return Err(AppError::Conflict(format!(
            "cannot move an application from {} to {}",
            current.as_str(),
            req.status.as_str()
        )));
    }

    let now = chrono::Utc::now().timestamp();
    let remarks = req.remarks.filter(|r| !r.trim().is_empty());
    let result = application::Entity::update_many()
        .col_expr(application::Column::Status, Expr::value(req.status.as_str()))
        .col_expr(application::Column::Remarks, Expr::value(remarks.clone()))
        .col_expr(application::Column::ReviewedBy, Expr::value(Some(current_user.id)))
        .col_expr(application::Column::ReviewedAt, Expr::value(Some(now)))
        .filter(application::Column::Id.eq(id))
        .filter(application::Column::Status.eq(current.as_str()))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("application was reviewed concurrently".to_string()));
    }

    log_operation(
        &current_user,
        AuditAction::ReviewApplication,
        "application",
        Some(id),
        format!("{} -> {}", current.as_str(), req.status.as_str()),
    );
    state.notify_user(
        model.user_id,
        json!({
            "type": "applicationStatus",
            "applicationId": id,
            "jobId": model.job_id,
            "status": req.status.as_str(),
        }),
    );

    let mut resp = ApplicationResponse::from(model);
    resp.status = req.status.as_str().to_string();
    resp.remarks = remarks;
    resp.reviewed_at = Some(now);
    Ok(Json(ApiResponse::success(resp)))
}
