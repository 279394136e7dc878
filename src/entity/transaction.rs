//! Transaction entity - claim or payment awaiting A.I.E approval
//!
//! Table: county_transaction

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_transaction")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub payee_name: String,

    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub payee_id_number: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub amount_cents: i64,

    #[sea_orm(column_type = "String(Some(64))")]
    pub vote_head: String,

    /// Authority to Incur Expenditure reference
    #[sea_orm(column_type = "String(Some(32))")]
    pub aie_number: String,

    /// See `accounting::TransactionStatus`
    #[sea_orm(column_type = "String(Some(16))")]
    pub status: String,

    pub created_by: i64,

    #[sea_orm(nullable)]
    pub approved_by: Option<i64>,

    #[sea_orm(nullable)]
    pub approved_at: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,

    /// Last generated voucher, relative to the export directory
    #[sea_orm(column_type = "String(Some(256))", nullable)]
    pub voucher_path: Option<String>,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
