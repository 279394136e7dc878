//! Applicant profile handlers
//!
//! Education and employment history, and the eligibility check against a
//! job advert.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::entity::{education, employment, job};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::job::{requirements, today};
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::recruitment::{
    check_eligibility, total_experience_years, EducationRecord, EligibilityResult,
    EmploymentRecord,
};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EducationRequest {
    pub institution: String,
    #[serde(rename = "studyArea")]
    pub study_area: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(rename = "certificateLevel")]
    pub certificate_level: String,
    #[serde(rename = "graduationDate")]
    pub graduation_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct EmploymentRequest {
    pub employer: String,
    pub position: String,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub education: Vec<education::Model>,
    pub employment: Vec<employment::Model>,
    #[serde(rename = "experienceYears")]
    pub experience_years: f64,
}

/// Profile history as the eligibility check sees it
pub struct History {
    pub education: Vec<EducationRecord>,
    pub employment: Vec<EmploymentRecord>,
}

pub async fn load_history(db: &DatabaseConnection, user_id: i64) -> AppResult<History> {
    let education = education::Entity::find()
        .filter(education::Column::UserId.eq(user_id))
        .order_by_asc(education::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|e| EducationRecord {
            study_area: e.study_area,
            specialization: e.specialization,
            certificate_level: e.certificate_level,
            graduation_date: e.graduation_date,
        })
        .collect();
    let employment = employment::Entity::find()
        .filter(employment::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|e| EmploymentRecord {
            start_date: e.start_date,
            end_date: e.end_date,
        })
        .collect();
    Ok(History {
        education,
        employment,
    })
}

/// Run the eligibility check for `user` against an advert
pub async fn evaluate(
    state: &AppState,
    user: Option<&CurrentUser>,
    advert: &job::Model,
) -> AppResult<EligibilityResult> {
    let history = match user {
        Some(u) => load_history(&state.db, u.id).await?,
        None => History {
            education: Vec::new(),
            employment: Vec::new(),
        },
    };
    let recruitment = &state.config.recruitment;
    Ok(check_eligibility(
        user.is_some(),
        &requirements(advert),
        &history.education,
        &history.employment,
        &recruitment.certificate_levels,
        recruitment.years_per_level,
        today(),
    ))
}

fn known_level(state: &AppState, level: &str) -> bool {
    state
        .config
        .recruitment
        .certificate_levels
        .iter()
        .any(|l| l.eq_ignore_ascii_case(level.trim()))
}

/// GET /api/profile
pub async fn get_profile(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    current_user.require(perm::PROFILE)?;

    let education = education::Entity::find()
        .filter(education::Column::UserId.eq(current_user.id))
        .order_by_asc(education::Column::Id)
        .all(&*db)
        .await?;
    let employment = employment::Entity::find()
        .filter(employment::Column::UserId.eq(current_user.id))
        .order_by_desc(employment::Column::StartDate)
        .all(&*db)
        .await?;
    let records: Vec<EmploymentRecord> = employment
        .iter()
        .map(|e| EmploymentRecord {
            start_date: e.start_date,
            end_date: e.end_date,
        })
        .collect();

    Ok(Json(ApiResponse::success(ProfileResponse {
        experience_years: total_experience_years(&records, today()),
        education,
        employment,
    })))
}

/// POST /api/profile/education
pub async fn add_education(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<EducationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<education::Model>>)> {
    current_user.require(perm::PROFILE)?;
    if req.institution.trim().is_empty() || req.study_area.trim().is_empty() {
        return Err(AppError::Validation(
            "institution, studyArea: required".to_string(),
        ));
    }
    if !known_level(&state, &req.certificate_level) {
        return Err(AppError::Validation(format!(
            "certificateLevel: unknown level {}",
            req.certificate_level
        )));
    }

    let model = education::ActiveModel {
        user_id: Set(current_user.id),
        institution: Set(req.institution.trim().to_string()),
        study_area: Set(req.study_area.trim().to_string()),
        specialization: Set(req.specialization.trim().to_string()),
        certificate_level: Set(req.certificate_level.trim().to_string()),
        graduation_date: Set(req.graduation_date),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// DELETE /api/profile/education/:id
pub async fn delete_education(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::PROFILE)?;
    let result = education::Entity::delete_many()
        .filter(education::Column::Id.eq(id))
        .filter(education::Column::UserId.eq(current_user.id))
        .exec(&*db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("education record {}", id)));
    }
    Ok(Json(ApiResponse::success_msg("education record deleted")))
}

/// POST /api/profile/employment
pub async fn add_employment(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<EmploymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<employment::Model>>)> {
    current_user.require(perm::PROFILE)?;
    if req.employer.trim().is_empty() || req.position.trim().is_empty() {
        return Err(AppError::Validation("employer, position: required".to_string()));
    }
    if matches!(req.end_date, Some(end) if end < req.start_date) {
        return Err(AppError::Validation(
            "endDate: must not be before startDate".to_string(),
        ));
    }

    let model = employment::ActiveModel {
        user_id: Set(current_user.id),
        employer: Set(req.employer.trim().to_string()),
        position: Set(req.position.trim().to_string()),
        start_date: Set(req.start_date),
        end_date: Set(req.end_date),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// DELETE /api/profile/employment/:id
pub async fn delete_employment(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::PROFILE)?;
    let result = employment::Entity::delete_many()
        .filter(employment::Column::Id.eq(id))
        .filter(employment::Column::UserId.eq(current_user.id))
        .exec(&*db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("employment record {}", id)));
    }
    Ok(Json(ApiResponse::success_msg("employment record deleted")))
}

/// GET /api/jobs/:id/eligibility
pub async fn job_eligibility(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<EligibilityResult>>> {
    let advert = job::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("job {}", id))?;
    let user = current_user.as_ref().map(|Extension(u)| u);
    let result = evaluate(&state, user, &advert).await?;
    Ok(Json(ApiResponse::success(result)))
}
