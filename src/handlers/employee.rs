//! Employee handlers
//!
//! County staff register. An employee may be linked to a portal account,
//! which lets their DIAL declarations carry the personal number.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::entity::audit_log::AuditAction;
use crate::entity::{department, employee, user};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct EmployeeRequest {
    #[serde(rename = "personalNumber")]
    pub personal_number: String,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "departmentId")]
    pub department_id: i64,
    pub designation: String,
    #[serde(rename = "jobGroup")]
    pub job_group: String,
    #[serde(rename = "dateOfAppointment")]
    pub date_of_appointment: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeQuery {
    #[serde(rename = "departmentId")]
    pub department_id: Option<i64>,
}

/// Check references and uniqueness shared by create and update
async fn validate(db: &DbConn, req: &EmployeeRequest, except: Option<i64>) -> AppResult<String> {
    let personal_number = req.personal_number.trim().to_string();
    if personal_number.is_empty() {
        return Err(AppError::Validation("personalNumber: required".to_string()));
    }
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("fullName: required".to_string()));
    }

    department::Entity::find_by_id(req.department_id)
        .one(&**db)
        .await?
        .ok_or_else(|| AppError::Validation(format!("departmentId: {} does not exist", req.department_id)))?;

    if let Some(user_id) = req.user_id {
        user::Entity::find_by_id(user_id)
            .one(&**db)
            .await?
            .ok_or_else(|| AppError::Validation(format!("userId: {} does not exist", user_id)))?;
    }

    let mut dup = employee::Entity::find()
        .filter(employee::Column::PersonalNumber.eq(personal_number.as_str()));
    if let Some(id) = except {
        dup = dup.filter(employee::Column::Id.ne(id));
    }
    if dup.one(&**db).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "personal number {} is already assigned",
            personal_number
        )));
    }

    Ok(personal_number)
}

/// GET /api/employees
pub async fn list_employees(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<EmployeeQuery>,
) -> AppResult<Json<ApiResponse<Vec<employee::Model>>>> {
    current_user.require(perm::PEOPLE)?;

    let mut select = employee::Entity::find();
    if let Some(dept) = query.department_id {
        select = select.filter(employee::Column::DepartmentId.eq(dept));
    }
    let employees = select
        .order_by_asc(employee::Column::PersonalNumber)
        .all(&*db)
        .await?;
    Ok(Json(ApiResponse::success(employees)))
}

/// POST /api/employees
pub async fn add_employee(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<EmployeeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<employee::Model>>)> {
    current_user.require(perm::PEOPLE)?;
    let personal_number = validate(&db, &req, None).await?;

    let model = employee::ActiveModel {
        personal_number: Set(personal_number.clone()),
        user_id: Set(req.user_id),
        full_name: Set(req.full_name.trim().to_string()),
        department_id: Set(req.department_id),
        designation: Set(req.designation),
        job_group: Set(req.job_group),
        date_of_appointment: Set(req.date_of_appointment),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    log_operation(
        &current_user,
        AuditAction::CreateEmployee,
        "employee",
        Some(model.id),
        personal_number,
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// PUT /api/employees/:id
pub async fn update_employee(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<EmployeeRequest>,
) -> AppResult<Json<ApiResponse<employee::Model>>> {
    current_user.require(perm::PEOPLE)?;

    let model = employee::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(format!("employee {}", id))?;
    let personal_number = validate(&db, &req, Some(id)).await?;

    let mut active: employee::ActiveModel = model.into();
    active.personal_number = Set(personal_number.clone());
    active.user_id = Set(req.user_id);
    active.full_name = Set(req.full_name.trim().to_string());
    active.department_id = Set(req.department_id);
    active.designation = Set(req.designation);
    active.job_group = Set(req.job_group);
    active.date_of_appointment = Set(req.date_of_appointment);
    let updated = active.update(&*db).await?;

    log_operation(
        &current_user,
        AuditAction::UpdateEmployee,
        "employee",
        Some(id),
        personal_number,
    );
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/employees/:id
pub async fn delete_employee(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::PEOPLE)?;

    let result = employee::Entity::delete_by_id(id).exec(&*db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("employee {}", id)));
    }

    log_operation(&current_user, AuditAction::DeleteEmployee, "employee", Some(id), "");
    Ok(Json(ApiResponse::success_msg("employee deleted")))
}

/// Employee record linked to a portal account, if any
pub async fn for_user(
    db: &sea_orm::DatabaseConnection,
    user_id: i64,
) -> AppResult<Option<employee::Model>> {
    Ok(employee::Entity::find()
        .filter(employee::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}
