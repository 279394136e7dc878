//! StatementItem entity - income, asset or liability line
//!
//! Table: county_statement_item

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_statement_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub dial_record_id: i64,

    /// self, spouse or dependent
    #[sea_orm(column_type = "String(Some(16))")]
    pub owner: String,

    /// income, asset or liability
    #[sea_orm(column_type = "String(Some(16))")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub amount_cents: i64,

    #[sea_orm(column_type = "String(Some(128))", nullable)]
    pub location: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
