//! Document upload handlers
//!
//! Multipart upload of applicant and declaration documents. The file field
//! is read chunk by chunk so the size cap is enforced while streaming, and
//! progress is reported per client identifier.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Json, Response},
    Extension,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::dial::DialStatus;
use crate::entity::audit_log::AuditAction;
use crate::entity::dial_record;
use crate::entity::uploaded_file::{self, UploadedFileResponse};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::{self, log_operation, AuditEntry};
use crate::middleware::auth::CurrentUser;
use crate::middleware::DbConn;
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::upload::{content_hash, is_safe_filename, normalize_mime, stored_name_for, UploadProgress, UploadRejection};

/// Progress entries older than this are dropped on the next upload
const PROGRESS_TTL_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Client-chosen key for progress polling
    pub identifier: Option<String>,
    #[serde(default = "default_purpose")]
    pub purpose: String,
    #[serde(rename = "dialRecordId")]
    pub dial_record_id: Option<i64>,
    /// Declared file size, used for progress percentages
    pub total: Option<u64>,
}

fn default_purpose() -> String {
    "document".to_string()
}

impl From<UploadRejection> for AppError {
    fn from(rejection: UploadRejection) -> Self {
        match rejection {
            UploadRejection::UnsupportedType { .. } => {
                AppError::UnsupportedMediaType(rejection.to_string())
            }
            UploadRejection::TooLarge { .. } => AppError::PayloadTooLarge(rejection.to_string()),
            UploadRejection::Empty => AppError::BadRequest(rejection.to_string()),
        }
    }
}

/// Attachments may only be added to the caller's own draft declarations
async fn check_dial_attachment(state: &AppState, user: &CurrentUser, id: i64) -> AppResult<()> {
    let record = dial_record::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_not_found(format!("declaration {}", id))?;
    if record.user_id != user.id {
        return Err(AppError::Forbidden("not your declaration".to_string()));
    }
    if !DialStatus::parse(&record.status).map(|s| s.is_editable()).unwrap_or(false) {
        return Err(AppError::Conflict(format!(
            "declaration is {} and can no longer change",
            record.status
        )));
    }
    Ok(())
}

/// POST /api/uploads
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<UploadedFileResponse>>)> {
    if let Some(id) = query.dial_record_id {
        check_dial_attachment(&state, &current_user, id).await?;
    }

    let policy = state.upload_policy.clone();
    let identifier = query
        .identifier
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    state.progress.prune(PROGRESS_TTL_SECS);
    if let Some(total) = query.total {
        policy.check_size(total)?;
    }

    let mut received: Option<(String, String, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some(policy.field_name.as_str()) {
            tracing::debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let original_name = field.file_name().unwrap_or("").trim().to_string();
        if !is_safe_filename(&original_name) {
            return Err(AppError::BadRequest("invalid file name".to_string()));
        }
        let mime = normalize_mime(field.content_type().unwrap_or("application/octet-stream"));
        if !policy.accepts_type(&mime) {
            return Err(UploadRejection::UnsupportedType {
                mime,
                accepted: policy.accepted_types.join(", "),
            }
            .into());
        }

        state.progress.start(current_user.id, &identifier, query.total);
        let mut data = Vec::new();
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    let size = (data.len() + chunk.len()) as u64;
                    if let Err(rejection) = policy.check_size(size) {
                        tracing::warn!("Upload rejected for {}: {}", current_user.email, rejection);
                        state.progress.fail(current_user.id, &identifier, rejection.to_string());
                        return Err(rejection.into());
                    }
                    data.extend_from_slice(&chunk);
                    state.progress.advance(current_user.id, &identifier, chunk.len() as u64);
                }
                Ok(None) => break,
                Err(e) => {
                    state.progress.fail(current_user.id, &identifier, e.to_string());
                    let msg = e.to_string().to_lowercase();
                    if msg.contains("limit") || msg.contains("too large") {
                        return Err(AppError::PayloadTooLarge(format!(
                            "request exceeds {} bytes",
                            state.config.max_upload_size
                        )));
                    }
                    return Err(AppError::BadRequest(format!("failed to read upload: {}", e)));
                }
            }
        }

        received = Some((original_name, mime, data));
        break;
    }

    let Some((original_name, mime, data)) = received else {
        return Err(AppError::BadRequest(format!(
            "missing multipart field '{}'",
            policy.field_name
        )));
    };
    if let Err(rejection) = policy.validate(&mime, data.len() as u64) {
        state.progress.fail(current_user.id, &identifier, rejection.to_string());
        return Err(rejection.into());
    }

    let sha256 = content_hash(&data);
    let stored_name = stored_name_for(&original_name);
    if let Err(e) = state.files.save(current_user.id, &stored_name, &data).await {
        state.progress.fail(current_user.id, &identifier, "storage error");
        return Err(e.into());
    }

    let model = uploaded_file::ActiveModel {
        user_id: Set(current_user.id),
        dial_record_id: Set(query.dial_record_id),
        purpose: Set(query.purpose.trim().to_string()),
        original_name: Set(original_name.clone()),
        stored_name: Set(stored_name.clone()),
        mime_type: Set(mime),
        size: Set(data.len() as i64),
        sha256: Set(sha256),
        created_at: Set(chrono::Utc::now().timestamp()),
        ..Default::default()
    }
    .insert(&state.db)
    .await;
    let model = match model {
        Ok(m) => m,
        Err(e) => {
            let _ = state.files.remove(current_user.id, &stored_name).await;
            state.progress.fail(current_user.id, &identifier, "database error");
            return Err(e.into());
        }
    };
    state.progress.complete(current_user.id, &identifier);

    tracing::info!(
        "{} uploaded {} ({} bytes) as {}",
        current_user.email,
        original_name,
        model.size,
        model.stored_name
    );
    let mut entry = AuditEntry::new(&current_user, AuditAction::Upload, "uploaded_file")
        .entity(model.id)
        .details(original_name);
    if let Some(id) = model.dial_record_id {
        entry.dial_record_id = Some(id);
    }
    service::record(entry);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UploadedFileResponse::from(model))),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UploadListQuery {
    #[serde(rename = "dialRecordId")]
    pub dial_record_id: Option<i64>,
    pub purpose: Option<String>,
}

/// GET /api/uploads
pub async fn list_uploads(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<UploadListQuery>,
) -> AppResult<Json<ApiResponse<Vec<UploadedFileResponse>>>> {
    let mut select = uploaded_file::Entity::find()
        .filter(uploaded_file::Column::UserId.eq(current_user.id));
    if let Some(id) = query.dial_record_id {
        select = select.filter(uploaded_file::Column::DialRecordId.eq(id));
    }
    if let Some(purpose) = query.purpose.filter(|p| !p.is_empty()) {
        select = select.filter(uploaded_file::Column::Purpose.eq(purpose));
    }
    let files = select
        .order_by_desc(uploaded_file::Column::CreatedAt)
        .all(&*db)
        .await?
        .into_iter()
        .map(UploadedFileResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(files)))
}

async fn owned_file(db: &DbConn, user: &CurrentUser, id: i64) -> AppResult<uploaded_file::Model> {
    uploaded_file::Entity::find_by_id(id)
        .filter(uploaded_file::Column::UserId.eq(user.id))
        .one(&**db)
        .await?
        .ok_or_not_found(format!("file {}", id))
}

/// GET /api/uploads/:id/download
pub async fn download_file(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let model = owned_file(&db, &current_user, id).await?;
    let reader = match state.files.open(model.user_id, &model.stored_name).await {
        Ok(r) => r,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!("Stored file missing for upload {}: {}", id, model.stored_name);
            return Err(AppError::NotFound(format!("file {}", id)));
        }
        Err(e) => return Err(e.into()),
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        model.original_name.replace('"', "")
    );
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, model.mime_type)
        .header(header::CONTENT_LENGTH, model.size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// DELETE /api/uploads/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let model = owned_file(&db, &current_user, id).await?;
    if let Some(record_id) = model.dial_record_id {
        check_dial_attachment(&state, &current_user, record_id).await?;
    }

    uploaded_file::Entity::delete_by_id(id).exec(&*db).await?;
    if let Err(e) = state.files.remove(model.user_id, &model.stored_name).await {
        tracing::error!("Failed to remove stored file {}: {}", model.stored_name, e);
    }

    log_operation(
        &current_user,
        AuditAction::DeleteUpload,
        "uploaded_file",
        Some(id),
        model.original_name,
    );
    Ok(Json(ApiResponse::success_msg("file deleted")))
}

/// Progress with the share of the declared size received so far
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub progress: UploadProgress,
    pub percent: Option<u8>,
}

impl From<UploadProgress> for ProgressResponse {
    fn from(progress: UploadProgress) -> Self {
        Self {
            percent: progress.percent(),
            progress,
        }
    }
}

/// GET /api/uploads/progress/:identifier
pub async fn upload_progress(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(identifier): Path<String>,
) -> AppResult<Json<ApiResponse<ProgressResponse>>> {
    let progress = state
        .progress
        .get(current_user.id, &identifier)
        .ok_or_not_found(format!("upload {}", identifier))?;
    Ok(Json(ApiResponse::success(ProgressResponse::from(progress))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use crate::upload::ProgressTracker;

    #[test]
    fn progress_reports_percent() {
        let tracker = ProgressTracker::new();
        tracker.start(4, "cv", Some(400));
        tracker.advance(4, "cv", 100);
        let body = serde_json::to_value(ProgressResponse::from(tracker.get(4, "cv").unwrap())).unwrap();
        assert_eq!(body["percent"], 25);
        assert_eq!(body["received"], 100);
        assert_eq!(body["state"], "uploading");

        tracker.start(4, "photo", None);
        let body = serde_json::to_value(ProgressResponse::from(tracker.get(4, "photo").unwrap())).unwrap();
        assert!(body["percent"].is_null());
    }

    #[test]
    fn rejections_map_to_statuses() {
        let unsupported: AppError = UploadRejection::UnsupportedType {
            mime: "text/plain".to_string(),
            accepted: "application/pdf".to_string(),
        }
        .into();
        assert_eq!(
            unsupported.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );

        let too_large: AppError = UploadRejection::TooLarge { size: 10, max: 5 }.into();
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let empty: AppError = UploadRejection::Empty.into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    }
}
