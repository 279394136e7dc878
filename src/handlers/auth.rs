//! Authentication handlers
//!
//! Implements login, logout, self-registration, current user and dashboard

use axum::{extract::State, http::StatusCode, Extension, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::entity::audit_log::AuditAction;
use crate::entity::user::{self, Role, UserResponse, UserStatus};
use crate::error::{AppError, AppResult};
use crate::handlers::audit::service::{self, log_operation, AuditEntry};
use crate::middleware::auth::{CurrentUser, SESSION_TIMESTAMP_KEY, SESSION_USER_KEY};
use crate::middleware::DbConn;
use crate::permission::PermissionEnforcer;
use crate::routes::ApiResponse;
use crate::state::AppState;

const BCRYPT_COST: u32 = 10;
const MIN_PASSWORD_LEN: usize = 8;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body; self-registered accounts are applicants
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(rename = "nationalId")]
    pub national_id: Option<String>,
}

/// Session user with the permissions of their role
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub dashboard: String,
}

impl From<&CurrentUser> for CurrentUserResponse {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            permissions: user.permissions.clone(),
            dashboard: user.role.dashboard().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub role: Role,
    pub path: String,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password: must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AppError::Internal(e.to_string()))
}

fn login_entry(model: &user::Model, action: AuditAction, details: &str) -> AuditEntry {
    AuditEntry {
        actor_id: model.id,
        actor_email: model.email.clone(),
        action,
        dial_record_id: None,
        entity_type: "user".to_string(),
        entity_id: Some(model.id),
        details: details.to_string(),
        ip: None,
    }
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<CurrentUserResponse>>> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".to_string()));
    }

    let db_user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;

    let Some(db_user) = db_user else {
        tracing::warn!("Login failed: user not found - {}", email);
        return Err(AppError::Unauthorized);
    };

    let password_valid = bcrypt::verify(&req.password, &db_user.password).unwrap_or(false);
    if !password_valid {
        tracing::warn!("Login failed: wrong password - {}", email);
        service::record(login_entry(&db_user, AuditAction::Login, "wrong password"));
        return Err(AppError::Unauthorized);
    }

    if db_user.is_disabled() {
        tracing::warn!("Login failed: user disabled - {}", email);
        service::record(login_entry(&db_user, AuditAction::Login, "account disabled"));
        return Err(AppError::Forbidden("account is disabled".to_string()));
    }

    let Some(role) = db_user.role() else {
        tracing::error!("User {} has unknown role {}", email, db_user.role);
        return Err(AppError::Forbidden("account has no valid role".to_string()));
    };

    let mut active_model: user::ActiveModel = db_user.clone().into();
    active_model.last_login = Set(chrono::Utc::now().timestamp());
    active_model.status = Set(UserStatus::Active.into());
    if let Err(e) = active_model.update(&state.db).await {
        tracing::error!("Failed to update last login: {}", e);
    }

    session
        .insert(SESSION_USER_KEY, db_user.id)
        .await
        .map_err(|e| AppError::Internal(format!("failed to save session: {}", e)))?;
    if let Err(e) = session
        .insert(SESSION_TIMESTAMP_KEY, chrono::Utc::now().timestamp())
        .await
    {
        tracing::error!("Failed to save session timestamp: {}", e);
    }

    tracing::info!("User logged in: {}", email);
    service::record(login_entry(&db_user, AuditAction::Login, ""));

    let current = signed_in_user(&state.perm, db_user, role).await;
    Ok(Json(ApiResponse::success(CurrentUserResponse::from(&current))))
}

/// Permissions come from the enforcer, as for every later request
async fn signed_in_user(perm: &PermissionEnforcer, db_user: user::Model, role: Role) -> CurrentUser {
    CurrentUser {
        id: db_user.id,
        email: db_user.email,
        full_name: db_user.full_name,
        role,
        permissions: perm.get_role_permissions(role.as_str()).await,
    }
}

/// POST /api/logout
pub async fn logout(
    session: Session,
    current_user: Option<Extension<CurrentUser>>,
) -> AppResult<Json<ApiResponse<()>>> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to flush session: {}", e)))?;

    if let Some(Extension(user)) = current_user {
        log_operation(&user, AuditAction::Logout, "user", Some(user.id), "");
    }

    Ok(Json(ApiResponse::success_msg("logout success")))
}

/// POST /api/register
pub async fn register(
    Extension(db): Extension<DbConn>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(AppError::Validation("email: not a valid address".to_string()));
    }
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::Validation("fullName: required".to_string()));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&*db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!("{} is already registered", email)));
    }

    let now = chrono::Utc::now().timestamp();
    let model = user::ActiveModel {
        email: Set(email.clone()),
        password: Set(hash_password(&req.password)?),
        full_name: Set(full_name.to_string()),
        phone: Set(req.phone.filter(|p| !p.trim().is_empty())),
        national_id: Set(req.national_id.filter(|n| !n.trim().is_empty())),
        role: Set(Role::Applicant.as_str().to_string()),
        status: Set(UserStatus::Inactive.into()),
        last_login: Set(0),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    tracing::info!("Applicant registered: {}", email);
    service::record(login_entry(&model, AuditAction::Register, ""));

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from(model))),
    ))
}

/// GET /api/user/current
pub async fn current_user(
    Extension(user): Extension<CurrentUser>,
) -> Json<ApiResponse<CurrentUserResponse>> {
    Json(ApiResponse::success(CurrentUserResponse::from(&user)))
}

/// GET /api/dashboard
pub async fn dashboard(Extension(user): Extension<CurrentUser>) -> Json<ApiResponse<DashboardResponse>> {
    Json(ApiResponse::success(DashboardResponse {
        role: user.role,
        path: user.role.dashboard().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane.Doe@County.GO.ke "), "jane.doe@county.go.ke");
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(hash_password("short"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn login_permissions_match_the_enforcer() {
        let perm = PermissionEnforcer::new().await.unwrap();
        let db_user = user::Model {
            id: 8,
            email: "accounts@county.go.ke".to_string(),
            password: String::new(),
            full_name: "Accounts".to_string(),
            phone: None,
            national_id: None,
            role: Role::Accountant.as_str().to_string(),
            status: 1,
            last_login: 0,
            created_at: 0,
        };
        let current = signed_in_user(&perm, db_user, Role::Accountant).await;
        assert_eq!(current.permissions, perm.get_role_permissions("accountant").await);
        assert!(current.has_permission(crate::permission::perm::ACCOUNTS));
    }

    #[test]
    fn current_user_carries_dashboard() {
        let user = CurrentUser {
            id: 3,
            email: "aie@county.go.ke".to_string(),
            full_name: "Holder".to_string(),
            role: Role::AieHolder,
            permissions: vec!["aie".to_string(), "dial".to_string()],
        };
        let resp = CurrentUserResponse::from(&user);
        assert_eq!(resp.dashboard, "/aie-holder");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["role"], "aie_holder");
        assert_eq!(json["fullName"], "Holder");
    }
}
