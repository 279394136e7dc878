//! Application entity - an applicant's bid for a job
//!
//! Table: county_application

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review outcome of an application
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Submitted,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(ApplicationStatus::Submitted),
            "shortlisted" => Some(ApplicationStatus::Shortlisted),
            "rejected" => Some(ApplicationStatus::Rejected),
            "hired" => Some(ApplicationStatus::Hired),
            _ => None,
        }
    }

    /// Board decisions move forward only: submitted → shortlisted → hired,
    /// and anything not yet final may be rejected.
    pub fn can_move_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Submitted, Shortlisted) | (Submitted, Rejected) | (Shortlisted, Rejected) | (Shortlisted, Hired)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_application")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub job_id: i64,

    pub user_id: i64,

    #[sea_orm(column_type = "String(Some(16))")]
    pub status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,

    pub submitted_at: i64,

    #[sea_orm(nullable)]
    pub reviewed_by: Option<i64>,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id",
        on_delete = "Cascade"
    )]
    Job,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;

    #[test]
    fn review_moves_forward_only() {
        assert!(Submitted.can_move_to(Shortlisted));
        assert!(Shortlisted.can_move_to(Hired));
        assert!(Shortlisted.can_move_to(Rejected));
        assert!(!Submitted.can_move_to(Hired));
        assert!(!Rejected.can_move_to(Shortlisted));
        assert!(!Hired.can_move_to(Rejected));
    }
}
