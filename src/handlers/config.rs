//! Configuration handlers
//!
//! Returns public configuration settings to the frontend

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::upload::UploadPolicy;

/// Public configuration response
#[derive(Debug, Serialize)]
pub struct PublicConfig {
    /// Request body cap on upload routes, in bytes
    #[serde(rename = "maxUploadSize")]
    pub max_upload_size: usize,
    /// Per-file policy the client validates against before uploading
    pub upload: UploadPolicy,
    #[serde(rename = "certificateLevels")]
    pub certificate_levels: Vec<String>,
    #[serde(rename = "exportUrlPrefix")]
    pub export_url_prefix: String,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<PublicConfig>> {
    Json(ApiResponse::success(PublicConfig {
        max_upload_size: state.config.max_upload_size,
        upload: (*state.upload_policy).clone(),
        certificate_levels: state.config.recruitment.certificate_levels.clone(),
        export_url_prefix: state.config.documents.export_url_prefix.clone(),
    }))
}
