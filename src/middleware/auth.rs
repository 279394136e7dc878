//! Authentication middleware
//!
//! Provides session-based authentication for API routes and the
//! permission guard handlers use to gate role-specific operations.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::json;
use std::ops::Deref;
use tower_sessions::Session;

use crate::entity::user::{self, Role};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Session key for storing the user id
pub const SESSION_USER_KEY: &str = "user_id";
pub const SESSION_TIMESTAMP_KEY: &str = "timestamp";

/// Database connection wrapper for use in handlers via Extension
#[derive(Clone)]
pub struct DbConn(pub DatabaseConnection);

impl Deref for DbConn {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub use crate::permission::perm;

/// Extension to store current user in request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    /// Permissions granted to the role
    pub permissions: Vec<String>,
}

impl CurrentUser {
    /// Check if the user has a specific permission
    pub fn has_permission(&self, perm: &str) -> bool {
        self.permissions.iter().any(|p| p == perm)
    }

    /// Fail with 403 unless the user holds `perm`
    pub fn require(&self, perm: &str) -> AppResult<()> {
        if self.has_permission(perm) {
            Ok(())
        } else {
            tracing::warn!("{} ({}) denied {}", self.email, self.role.as_str(), perm);
            Err(AppError::Forbidden(format!("requires {} permission", perm)))
        }
    }
}

/// Paths that don't require authentication
fn is_public_path(method: &Method, path: &str, export_prefix: &str) -> bool {
    // Exported documents are served outside /api but stay private
    if path.starts_with(export_prefix) {
        return false;
    }
    if !path.starts_with("/api") {
        return true;
    }

    if path == "/api/login" || path == "/api/logout" || path == "/api/register" {
        return true;
    }
    if path == "/api/health" || path == "/api/config" {
        return true;
    }
    // Public job board; eligibility answers anonymous callers with a sign-in reason
    if method == Method::GET && (path == "/api/jobs" || is_job_path(path)) {
        return true;
    }
    false
}

/// Exported vouchers are accounting documents; only accountants and A.I.E
/// holders may fetch them
fn check_export_access(user: &CurrentUser, path: &str, export_prefix: &str) -> AppResult<()> {
    if !path.starts_with(export_prefix)
        || user.has_permission(perm::ACCOUNTS)
        || user.has_permission(perm::AIE)
    {
        return Ok(());
    }
    tracing::warn!("{} ({}) denied export {}", user.email, user.role.as_str(), path);
    Err(AppError::Forbidden(format!(
        "requires {} or {} permission",
        perm::ACCOUNTS,
        perm::AIE
    )))
}

fn is_job_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix("/api/jobs/") else {
        return false;
    };
    let (id, tail) = rest.split_once('/').unwrap_or((rest, ""));
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && (tail.is_empty() || tail == "eligibility")
}

/// Authentication middleware
pub async fn auth_layer(
    State(state): State<AppState>,
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(DbConn(state.db.clone()));

    let user_id: Option<i64> = session.get(SESSION_USER_KEY).await.unwrap_or(None);

    // Public paths still see the user when a session exists
    if is_public_path(request.method(), &path, &state.config.documents.export_url_prefix) {
        if let Some(id) = user_id {
            if let Ok(Some(current)) = load_current_user(&state, id).await {
                request.extensions_mut().insert(current);
            }
        }
        return next.run(request).await;
    }

    let Some(user_id) = user_id else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "message": "Unauthorized"})),
        )
            .into_response();
    };

    match load_current_user(&state, user_id).await {
        Ok(Some(current_user)) => {
            let export_prefix = &state.config.documents.export_url_prefix;
            if let Err(e) = check_export_access(&current_user, &path, export_prefix) {
                return e.into_response();
            }
            request.extensions_mut().insert(current_user);
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!("Session user {} no longer valid", user_id);
            let _ = session.flush().await;
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"code": 401, "message": "invalid_session"})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Database error during auth: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"code": 500, "message": "internal error"})),
            )
                .into_response()
        }
    }
}

/// Resolve an active user and the permissions of their role
async fn load_current_user(
    state: &AppState,
    user_id: i64,
) -> Result<Option<CurrentUser>, sea_orm::DbErr> {
    let Some(model) = user::Entity::find_by_id(user_id).one(&state.db).await? else {
        return Ok(None);
    };
    if model.is_disabled() {
        return Ok(None);
    }
    let Some(role) = model.role() else {
        tracing::warn!("User {} has unknown role {}", model.email, model.role);
        return Ok(None);
    };

    let permissions = state.perm.get_role_permissions(role.as_str()).await;

    Ok(Some(CurrentUser {
        id: model.id,
        email: model.email,
        full_name: model.full_name,
        role,
        permissions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: 1,
            email: "a@county.go.ke".to_string(),
            full_name: "A".to_string(),
            role,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    const EXPORTS: &str = "/exports";

    #[test]
    fn public_paths() {
        assert!(is_public_path(&Method::GET, "/", EXPORTS));
        assert!(is_public_path(&Method::GET, "/careers/42", EXPORTS));
        assert!(is_public_path(&Method::POST, "/api/login", EXPORTS));
        assert!(is_public_path(&Method::POST, "/api/register", EXPORTS));
        assert!(is_public_path(&Method::GET, "/api/jobs", EXPORTS));
        assert!(is_public_path(&Method::GET, "/api/jobs/42", EXPORTS));
        assert!(!is_public_path(&Method::POST, "/api/jobs", EXPORTS));
        assert!(is_public_path(&Method::GET, "/api/jobs/42/eligibility", EXPORTS));
        assert!(!is_public_path(&Method::GET, "/api/jobs/42/applications", EXPORTS));
        assert!(!is_public_path(&Method::GET, "/api/dial", EXPORTS));
        assert!(!is_public_path(&Method::GET, "/exports/claim_voucher_1.docx", EXPORTS));
    }

    #[test]
    fn exports_need_accounting_permission() {
        let file = "/exports/claim_voucher_1.docx";
        let applicant = user(Role::Applicant, &[perm::PROFILE, perm::APPLICATIONS]);
        assert!(matches!(
            check_export_access(&applicant, file, EXPORTS),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_export_access(&applicant, "/api/jobs", EXPORTS).is_ok());

        let accountant = user(Role::Accountant, &[perm::ACCOUNTS]);
        assert!(check_export_access(&accountant, file, EXPORTS).is_ok());
        let holder = user(Role::AieHolder, &[perm::AIE]);
        assert!(check_export_access(&holder, file, EXPORTS).is_ok());
    }

    #[test]
    fn require_maps_to_forbidden() {
        let accountant = user(Role::Accountant, &[perm::ACCOUNTS, perm::DIAL]);
        assert!(accountant.require(perm::ACCOUNTS).is_ok());
        assert!(matches!(
            accountant.require(perm::AIE),
            Err(AppError::Forbidden(_))
        ));
    }
}
