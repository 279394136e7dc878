//! Imprest entity - Master Imprest Register entry
//!
//! Table: county_imprest

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_imprest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub holder_name: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub holder_personal_number: String,

    #[sea_orm(column_type = "Text")]
    pub purpose: String,

    pub amount_cents: i64,

    pub issued_on: Date,

    /// Date the imprest must be accounted for
    pub due_on: Date,

    #[sea_orm(nullable)]
    pub retired_on: Option<Date>,

    #[sea_orm(nullable)]
    pub amount_retired_cents: Option<i64>,

    /// outstanding or retired
    #[sea_orm(column_type = "String(Some(16))")]
    pub status: String,

    pub created_by: i64,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
