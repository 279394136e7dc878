//! Job advert handlers
//!
//! Public listing with deadline labels; administrators publish, edit and
//! close adverts.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::entity::audit_log::AuditAction;
use crate::entity::job::{self, join_list, STATUS_CLOSED, STATUS_OPEN};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::recruitment::{format_deadline, DeadlineLabel, JobRequirements};
use crate::routes::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "departmentId")]
    pub department_id: Option<i64>,
    #[serde(rename = "requiredStudyArea")]
    pub required_study_area: Option<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(rename = "certificateLevel")]
    pub certificate_level: Option<String>,
    #[serde(rename = "progressionAllowed", default)]
    pub progression_allowed: bool,
    #[serde(rename = "minExperienceYears", default)]
    pub min_experience_years: i32,
    #[serde(default = "default_positions")]
    pub positions: i32,
    pub deadline: NaiveDate,
}

fn default_positions() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    /// Include closed and expired adverts (admin view)
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "departmentId")]
    pub department_id: Option<i64>,
    #[serde(rename = "requiredStudyArea")]
    pub required_study_area: Option<String>,
    pub specializations: Vec<String>,
    #[serde(rename = "certificateLevel")]
    pub certificate_level: Option<String>,
    #[serde(rename = "progressionAllowed")]
    pub progression_allowed: bool,
    #[serde(rename = "minExperienceYears")]
    pub min_experience_years: i32,
    pub positions: i32,
    pub deadline: NaiveDate,
    #[serde(rename = "deadlineLabel")]
    pub deadline_label: DeadlineLabel,
    pub status: String,
}

impl JobResponse {
    pub fn new(m: job::Model, today: NaiveDate) -> Self {
        Self {
            deadline_label: format_deadline(m.deadline, today),
            specializations: m.specialization_list(),
            id: m.id,
            title: m.title,
            description: m.description,
            department_id: m.department_id,
            required_study_area: m.required_study_area,
            certificate_level: m.certificate_level,
            progression_allowed: m.progression_allowed,
            min_experience_years: m.min_experience_years,
            positions: m.positions,
            deadline: m.deadline,
            status: m.status,
        }
    }
}

/// Requirements of an advert in the shape the eligibility check takes
pub fn requirements(m: &job::Model) -> JobRequirements {
    JobRequirements {
        required_study_area: m.required_study_area.clone(),
        specializations: m.specialization_list(),
        certificate_level: m.certificate_level.clone(),
        progression_allowed: m.progression_allowed,
        min_experience_years: m.min_experience_years,
    }
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(req: &JobRequest) -> AppResult<()> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title: required".to_string()));
    }
    if req.positions < 1 {
        return Err(AppError::Validation("positions: must be at least 1".to_string()));
    }
    if req.min_experience_years < 0 {
        return Err(AppError::Validation(
            "minExperienceYears: must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/jobs
pub async fn list_jobs(
    Extension(db): Extension<DbConn>,
    current_user: Option<Extension<CurrentUser>>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<ApiResponse<Vec<JobResponse>>>> {
    let today = today();
    let show_all = query.all
        && current_user
            .as_ref()
            .map(|Extension(u)| u.has_permission(perm::JOBS))
            .unwrap_or(false);

    let mut select = job::Entity::find();
    if !show_all {
        select = select
            .filter(job::Column::Status.eq(STATUS_OPEN))
            .filter(job::Column::Deadline.gte(today));
    }
    let jobs = select
        .order_by_asc(job::Column::Deadline)
        .all(&*db)
        .await?
        .into_iter()
        .map(|m| JobResponse::new(m, today))
        .collect();

    Ok(Json(ApiResponse::success(jobs)))
}

/// GET /api/jobs/:id
pub async fn get_job(
    Extension(db): Extension<DbConn>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<JobResponse>>> {
    let model = job::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(format!("job {}", id))?;
    Ok(Json(ApiResponse::success(JobResponse::new(model, today()))))
}

/// POST /api/jobs
pub async fn create_job(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<JobRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<JobResponse>>)> {
    current_user.require(perm::JOBS)?;
    validate(&req)?;

    let model = job::ActiveModel {
        title: Set(req.title.trim().to_string()),
        description: Set(req.description),
        department_id: Set(req.department_id),
        required_study_area: Set(non_blank(req.required_study_area)),
        specializations: Set(join_list(&req.specializations)),
        certificate_level: Set(non_blank(req.certificate_level)),
        progression_allowed: Set(req.progression_allowed),
        min_experience_years: Set(req.min_experience_years),
        positions: Set(req.positions),
        deadline: Set(req.deadline),
        status: Set(STATUS_OPEN.to_string()),
        created_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    tracing::info!("Job {} published: {}", model.id, model.title);
    log_operation(&current_user, AuditAction::CreateJob, "job", Some(model.id), model.title.clone());

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(JobResponse::new(model, today()))),
    ))
}

/// PUT /api/jobs/:id
pub async fn update_job(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<JobRequest>,
) -> AppResult<Json<ApiResponse<JobResponse>>> {
    current_user.require(perm::JOBS)?;
    validate(&req)?;

    let model = job::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(format!("job {}", id))?;
    if !model.is_open() {
        return Err(AppError::Conflict("closed adverts cannot be edited".to_string()));
    }

    let mut active: job::ActiveModel = model.into();
    active.title = Set(req.title.trim().to_string());
    active.description = Set(req.description);
    active.department_id = Set(req.department_id);
    active.required_study_area = Set(non_blank(req.required_study_area));
    active.specializations = Set(join_list(&req.specializations));
    active.certificate_level = Set(non_blank(req.certificate_level));
    active.progression_allowed = Set(req.progression_allowed);
    active.min_experience_years = Set(req.min_experience_years);
    active.positions = Set(req.positions);
    active.deadline = Set(req.deadline);
    let updated = active.update(&*db).await?;

    log_operation(&current_user, AuditAction::UpdateJob, "job", Some(id), "");
    Ok(Json(ApiResponse::success(JobResponse::new(updated, today()))))
}

/// POST /api/jobs/:id/close
pub async fn close_job(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::JOBS)?;

    let result = job::Entity::update_many()
        .col_expr(job::Column::Status, sea_orm::sea_query::Expr::value(STATUS_CLOSED))
        .filter(job::Column::Id.eq(id))
        .filter(job::Column::Status.eq(STATUS_OPEN))
        .exec(&*db)
        .await?;
    if result.rows_affected == 0 {
        job::Entity::find_by_id(id)
            .one(&*db)
            .await?
            .ok_or_not_found(format!("job {}", id))?;
        return Err(AppError::Conflict("job is already closed".to_string()));
    }

    log_operation(&current_user, AuditAction::CloseJob, "job", Some(id), "");
    Ok(Json(ApiResponse::success_msg("job closed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recruitment::Urgency;

    fn advert(deadline: NaiveDate) -> job::Model {
        job::Model {
            id: 4,
            title: "Clinical Officer".to_string(),
            description: String::new(),
            department_id: None,
            required_study_area: Some("Medicine".to_string()),
            specializations: "Clinical Medicine, Surgery".to_string(),
            certificate_level: Some("Diploma".to_string()),
            progression_allowed: true,
            min_experience_years: 2,
            positions: 3,
            deadline,
            status: STATUS_OPEN.to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn response_carries_label_and_list() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let resp = JobResponse::new(advert(today), today);
        assert_eq!(resp.deadline_label.text, "Closes Today");
        assert_eq!(resp.deadline_label.urgency, Urgency::Today);
        assert_eq!(resp.specializations, vec!["Clinical Medicine", "Surgery"]);
    }

    #[test]
    fn requirements_mirror_the_advert() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let req = requirements(&advert(today));
        assert_eq!(req.certificate_level.as_deref(), Some("Diploma"));
        assert_eq!(req.specializations.len(), 2);
        assert!(req.progression_allowed);
        assert_eq!(req.min_experience_years, 2);
    }
}
