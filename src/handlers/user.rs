//! User handlers
//!
//! Administrator account management: list, create with a role, enable and
//! disable.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::entity::audit_log::AuditAction;
use crate::entity::user::{self, Role, UserResponse, UserStatus};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::handlers::auth::{hash_password, normalize_email};
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

/// Add user request
#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(rename = "nationalId")]
    pub national_id: Option<String>,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

/// GET /api/users
pub async fn list_users(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<Vec<UserResponse>>>> {
    current_user.require(perm::PEOPLE)?;

    let mut select = user::Entity::find();
    if let Some(role) = query.role.as_deref().filter(|r| !r.is_empty()) {
        let role = Role::parse(role)
            .ok_or_else(|| AppError::BadRequest(format!("unknown role {}", role)))?;
        select = select.filter(user::Column::Role.eq(role.as_str()));
    }

    let users = select
        .order_by_asc(user::Column::Id)
        .all(&*db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(users)))
}

/// POST /api/users
pub async fn add_user(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<AddUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    current_user.require(perm::PEOPLE)?;

    let role = Role::parse(&req.role)
        .ok_or_else(|| AppError::Validation(format!("role: unknown role {}", req.role)))?;
    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(AppError::Validation("email: not a valid address".to_string()));
    }
    if req.full_name.trim().is_empty() {
        return Err(AppError::Validation("fullName: required".to_string()));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&*db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!("{} already exists", email)));
    }

    let model = user::ActiveModel {
        email: Set(email.clone()),
        password: Set(hash_password(&req.password)?),
        full_name: Set(req.full_name.trim().to_string()),
        phone: Set(req.phone),
        national_id: Set(req.national_id),
        role: Set(role.as_str().to_string()),
        status: Set(UserStatus::Inactive.into()),
        last_login: Set(0),
        created_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    tracing::info!("{} created {} account {}", current_user.email, role.as_str(), email);
    log_operation(
        &current_user,
        AuditAction::CreateUser,
        "user",
        Some(model.id),
        format!("{} as {}", email, role.as_str()),
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from(model))),
    ))
}

/// POST /api/users/:id/enable
pub async fn enable_user(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    set_status(&db, &current_user, id, UserStatus::Active).await
}

/// POST /api/users/:id/disable
pub async fn disable_user(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    if id == current_user.id {
        return Err(AppError::BadRequest("cannot disable your own account".to_string()));
    }
    set_status(&db, &current_user, id, UserStatus::Disabled).await
}

async fn set_status(
    db: &DbConn,
    current_user: &CurrentUser,
    id: i64,
    status: UserStatus,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    current_user.require(perm::PEOPLE)?;

    let model = user::Entity::find_by_id(id)
        .one(&**db)
        .await?
        .ok_or_not_found(format!("user {}", id))?;

    let mut active: user::ActiveModel = model.into();
    active.status = Set(status.into());
    let updated = active.update(&**db).await?;

    let action = if status == UserStatus::Disabled {
        AuditAction::DisableUser
    } else {
        AuditAction::EnableUser
    };
    log_operation(current_user, action, "user", Some(id), updated.email.clone());

    Ok(Json(ApiResponse::success(UserResponse::from(updated))))
}
