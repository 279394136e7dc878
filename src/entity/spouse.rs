//! Spouse entity - DIAL sub-record
//!
//! Table: county_spouse

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_spouse")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub dial_record_id: i64,

    #[sea_orm(column_type = "String(Some(64))")]
    pub surname: String,

    #[sea_orm(column_type = "String(Some(128))")]
    pub other_names: String,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub occupation: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
