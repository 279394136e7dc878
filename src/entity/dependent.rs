//! Dependent entity - DIAL sub-record
//!
//! Table: county_dependent

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_dependent")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub dial_record_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub full_name: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub relationship: String,

    #[sea_orm(nullable)]
    pub date_of_birth: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
