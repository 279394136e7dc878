//! Employment entity - applicant work history
//!
//! Table: county_employment

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_employment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub employer: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub position: String,

    pub start_date: Date,

    /// None while the position is held
    #[sea_orm(nullable)]
    pub end_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
