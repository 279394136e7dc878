//! Education entity - applicant qualification record
//!
//! Table: county_education

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_education")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub institution: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub study_area: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub specialization: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub certificate_level: String,

    #[sea_orm(nullable)]
    pub graduation_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
