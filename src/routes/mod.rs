use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::handlers;
use crate::middleware::auth_layer;
use crate::state::AppState;
use crate::ws;

pub mod health;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.session.secure)
        .with_http_only(true);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/config", get(handlers::config::get_config))
        // Auth
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/register", post(handlers::auth::register))
        .route("/user/current", get(handlers::auth::current_user))
        .route("/dashboard", get(handlers::auth::dashboard))
        // Users, departments, employees
        .route("/users", get(handlers::user::list_users).post(handlers::user::add_user))
        .route("/users/:id/enable", post(handlers::user::enable_user))
        .route("/users/:id/disable", post(handlers::user::disable_user))
        .route(
            "/departments",
            get(handlers::department::list_departments).post(handlers::department::add_department),
        )
        .route(
            "/departments/:id",
            put(handlers::department::update_department).delete(handlers::department::delete_department),
        )
        .route(
            "/employees",
            get(handlers::employee::list_employees).post(handlers::employee::add_employee),
        )
        .route(
            "/employees/:id",
            put(handlers::employee::update_employee).delete(handlers::employee::delete_employee),
        )
        // Recruitment
        .route("/jobs", get(handlers::job::list_jobs).post(handlers::job::create_job))
        .route("/jobs/:id", get(handlers::job::get_job).put(handlers::job::update_job))
        .route("/jobs/:id/close", post(handlers::job::close_job))
        .route("/jobs/:id/eligibility", get(handlers::profile::job_eligibility))
        .route("/jobs/:id/apply", post(handlers::application::apply))
        .route("/jobs/:id/applications", get(handlers::application::list_for_job))
        .route("/applications/mine", get(handlers::application::my_applications))
        .route("/applications/:id/review", post(handlers::application::review_application))
        .route("/profile", get(handlers::profile::get_profile))
        .route("/profile/education", post(handlers::profile::add_education))
        .route("/profile/education/:id", delete(handlers::profile::delete_education))
        .route("/profile/employment", post(handlers::profile::add_employment))
        .route("/profile/employment/:id", delete(handlers::profile::delete_employment))
        // Uploads
        .route(
            "/uploads",
            get(handlers::upload::list_uploads).post(handlers::upload::upload_file)
                .layer(DefaultBodyLimit::max(state.config.max_upload_size)),
        )
        .route("/uploads/progress/:identifier", get(handlers::upload::upload_progress))
        .route("/uploads/:id", delete(handlers::upload::delete_file))
        .route("/uploads/:id/download", get(handlers::upload::download_file))
        // DIAL declarations
        .route("/dial", get(handlers::dial::list_mine).post(handlers::dial::create_record))
        .route("/dial/review", get(handlers::dial::review_queue))
        .route(
            "/dial/:id",
            get(handlers::dial::get_record)
                .put(handlers::dial::update_record)
                .delete(handlers::dial::delete_record),
        )
        .route("/dial/:id/summary", get(handlers::dial::get_summary))
        .route("/dial/:id/history", get(handlers::dial::get_history))
        .route("/dial/:id/spouses", post(handlers::dial::add_spouse))
        .route("/dial/:id/spouses/:sub_id", delete(handlers::dial::delete_spouse))
        .route("/dial/:id/dependents", post(handlers::dial::add_dependent))
        .route("/dial/:id/dependents/:sub_id", delete(handlers::dial::delete_dependent))
        .route("/dial/:id/items", post(handlers::dial::add_item))
        .route("/dial/:id/items/:sub_id", delete(handlers::dial::delete_item))
        .route("/dial/:id/submit", post(handlers::dial::submit))
        .route("/dial/:id/start-review", post(handlers::dial::start_review))
        .route("/dial/:id/approve", post(handlers::dial::approve))
        .route("/dial/:id/reject", post(handlers::dial::reject))
        .route("/dial/:id/lock", post(handlers::dial::lock))
        .route("/dial/:id/amend", post(handlers::dial::amend_record))
        // Accounting
        .route(
            "/transactions",
            get(handlers::accounting::list_transactions).post(handlers::accounting::create_transaction),
        )
        .route("/transactions/:id/approve", post(handlers::accounting::approve_transaction))
        .route("/transactions/:id/reject", post(handlers::accounting::reject_transaction))
        .route("/transactions/:id/pay", post(handlers::accounting::pay_transaction))
        .route("/transactions/:id/voucher", post(handlers::accounting::generate_voucher))
        .route(
            "/imprest",
            get(handlers::accounting::list_imprest).post(handlers::accounting::issue_imprest),
        )
        .route("/imprest/summary", get(handlers::accounting::imprest_summary))
        .route("/imprest/:id/retire", post(handlers::accounting::retire_imprest))
        // Audit trail
        .route("/audit", get(handlers::audit::query_audit))
        // WebSocket
        .route("/ws", get(ws::serve_ws))
        .fallback(fallback);

    // Generated vouchers; the auth layer keeps these private
    let exports = ServeDir::new(state.docs.export_dir());

    Router::new()
        .nest("/api", api_routes)
        .nest_service(&state.config.documents.export_url_prefix, exports)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}
