//! Job entity - advertised vacancy
//!
//! Table: county_job

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_job")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(nullable)]
    pub department_id: Option<i64>,

    #[sea_orm(column_type = "String(Some(128))", nullable)]
    pub required_study_area: Option<String>,

    /// Accepted specializations, comma separated (empty = any)
    #[sea_orm(column_type = "Text", default_value = "")]
    pub specializations: String,

    #[sea_orm(column_type = "String(Some(32))", nullable)]
    pub certificate_level: Option<String>,

    pub progression_allowed: bool,

    pub min_experience_years: i32,

    pub positions: i32,

    pub deadline: Date,

    #[sea_orm(column_type = "String(Some(16))")]
    pub status: String,

    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn specialization_list(&self) -> Vec<String> {
        split_list(&self.specializations)
    }

    pub fn is_open(&self) -> bool {
        self.status == STATUS_OPEN
    }
}

/// Split a comma separated column into trimmed, non-empty entries
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`split_list`]
pub fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(
            split_list(" Accounting, ,Finance ,"),
            vec!["Accounting".to_string(), "Finance".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn join_list_trims() {
        let items = vec![" Nursing ".to_string(), "".to_string(), "Midwifery".to_string()];
        assert_eq!(join_list(&items), "Nursing,Midwifery");
    }
}
