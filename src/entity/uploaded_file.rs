//! UploadedFile entity - hash-stamped attachment
//!
//! Table: county_uploaded_file

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_uploaded_file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owner
    pub user_id: i64,

    /// Set when the file supports a declaration
    #[sea_orm(nullable)]
    pub dial_record_id: Option<i64>,

    /// Free-form tag, e.g. "cv", "certificate", "id"
    #[sea_orm(column_type = "String(Some(32))")]
    pub purpose: String,

    #[sea_orm(column_type = "String(Some(256))")]
    pub original_name: String,

    /// Name under the owner's storage directory
    #[sea_orm(column_type = "String(Some(64))")]
    pub stored_name: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub mime_type: String,

    pub size: i64,

    /// SHA-256 of the content, hex encoded
    #[sea_orm(column_type = "String(Some(64))")]
    pub sha256: String,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Upload response item
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadedFileResponse {
    pub id: i64,
    #[serde(rename = "dialRecordId")]
    pub dial_record_id: Option<i64>,
    pub purpose: String,
    #[serde(rename = "originalName")]
    pub original_name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: i64,
    pub sha256: String,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl From<Model> for UploadedFileResponse {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            dial_record_id: m.dial_record_id,
            purpose: m.purpose,
            original_name: m.original_name,
            mime_type: m.mime_type,
            size: m.size,
            sha256: m.sha256,
            created_at: m.created_at,
        }
    }
}
