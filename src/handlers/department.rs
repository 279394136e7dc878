//! Department handlers
//!
//! Implements department CRUD operations

use axum::{extract::Path, http::StatusCode, response::Json, Extension};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::entity::audit_log::AuditAction;
use crate::entity::{department, employee};
use crate::error::{AppError, AppResult, OptionExt};
use crate::handlers::audit::service::log_operation;
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

/// Create or update department request
#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub name: String,
    pub code: String,
}

impl DepartmentRequest {
    fn validated(&self) -> AppResult<(String, String)> {
        let name = self.name.trim();
        let code = self.code.trim().to_uppercase();
        if name.is_empty() {
            return Err(AppError::Validation("name: required".to_string()));
        }
        if code.is_empty() {
            return Err(AppError::Validation("code: required".to_string()));
        }
        Ok((name.to_string(), code))
    }
}

async fn ensure_unique_name(db: &DbConn, name: &str, except: Option<i64>) -> AppResult<()> {
    let mut select = department::Entity::find().filter(department::Column::Name.eq(name));
    if let Some(id) = except {
        select = select.filter(department::Column::Id.ne(id));
    }
    if select.one(&**db).await?.is_some() {
        return Err(AppError::Conflict(format!("department {} already exists", name)));
    }
    Ok(())
}

/// GET /api/departments
pub async fn list_departments(
    Extension(db): Extension<DbConn>,
) -> AppResult<Json<ApiResponse<Vec<department::Model>>>> {
    let departments = department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(&*db)
        .await?;
    Ok(Json(ApiResponse::success(departments)))
}

/// POST /api/departments
pub async fn add_department(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Json(req): Json<DepartmentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<department::Model>>)> {
    current_user.require(perm::PEOPLE)?;
    let (name, code) = req.validated()?;
    ensure_unique_name(&db, &name, None).await?;

    let model = department::ActiveModel {
        name: Set(name.clone()),
        code: Set(code),
        ..Default::default()
    }
    .insert(&*db)
    .await?;

    log_operation(&current_user, AuditAction::CreateDept, "department", Some(model.id), name);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(model))))
}

/// PUT /api/departments/:id
pub async fn update_department(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DepartmentRequest>,
) -> AppResult<Json<ApiResponse<department::Model>>> {
    current_user.require(perm::PEOPLE)?;
    let (name, code) = req.validated()?;

    let model = department::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_not_found(format!("department {}", id))?;
    ensure_unique_name(&db, &name, Some(id)).await?;

    let mut active: department::ActiveModel = model.into();
    active.name = Set(name.clone());
    active.code = Set(code);
    let updated = active.update(&*db).await?;

    log_operation(&current_user, AuditAction::UpdateDept, "department", Some(id), name);
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /api/departments/:id
pub async fn delete_department(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require(perm::PEOPLE)?;

    let staff = employee::Entity::find()
        .filter(employee::Column::DepartmentId.eq(id))
        .count(&*db)
        .await?;
    if staff > 0 {
        return Err(AppError::Conflict(format!(
            "department still has {} employees",
            staff
        )));
    }

    let result = department::Entity::delete_by_id(id).exec(&*db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("department {}", id)));
    }

    log_operation(&current_user, AuditAction::DeleteDept, "department", Some(id), "");
    Ok(Json(ApiResponse::success_msg("department deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_uppercased_and_blank_names_rejected() {
        let req = DepartmentRequest {
            name: " Finance ".to_string(),
            code: "fin".to_string(),
        };
        assert_eq!(req.validated().unwrap(), ("Finance".to_string(), "FIN".to_string()));

        let blank = DepartmentRequest {
            name: "  ".to_string(),
            code: "X".to_string(),
        };
        assert!(matches!(blank.validated(), Err(AppError::Validation(_))));
    }
}
