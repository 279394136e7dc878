//! Employee entity - county personnel record
//!
//! Table: county_employee

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_employee")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Payroll personal number (unique)
    #[sea_orm(column_type = "String(Some(32))", unique)]
    pub personal_number: String,

    /// Linked portal account, if the officer has one
    #[sea_orm(nullable)]
    pub user_id: Option<i64>,

    #[sea_orm(column_type = "String(Some(128))")]
    pub full_name: String,

    pub department_id: i64,

    #[sea_orm(column_type = "String(Some(64))")]
    pub designation: String,

    #[sea_orm(column_type = "String(Some(8))")]
    pub job_group: String,

    #[sea_orm(nullable)]
    pub date_of_appointment: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
