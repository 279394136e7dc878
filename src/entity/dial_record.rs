//! DialRecord entity - declaration header
//!
//! Table: county_dial_record

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_dial_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Declarant
    pub user_id: i64,

    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub personal_number: Option<String>,

    pub period_start: Date,

    pub period_end: Date,

    /// See `dial::DialStatus`
    #[sea_orm(column_type = "String(Some(16))")]
    pub status: String,

    /// 1 for an original declaration, incremented on amendment
    pub version: i32,

    /// Record this one amends
    #[sea_orm(nullable)]
    pub previous_version_id: Option<i64>,

    #[sea_orm(nullable)]
    pub submitted_at: Option<i64>,

    #[sea_orm(nullable)]
    pub reviewed_by: Option<i64>,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub review_remarks: Option<String>,

    #[sea_orm(nullable)]
    pub locked_at: Option<i64>,

    pub created_at: i64,

    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
