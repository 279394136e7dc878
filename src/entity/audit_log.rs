//! AuditLog entity - append-only action trail
//!
//! Table: county_audit_log

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audited action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Login,
    Logout,
    Register,
    CreateUser,
    EnableUser,
    DisableUser,
    CreateDept,
    UpdateDept,
    DeleteDept,
    CreateEmployee,
    UpdateEmployee,
    DeleteEmployee,
    CreateJob,
    UpdateJob,
    CloseJob,
    Apply,
    ReviewApplication,
    Upload,
    DeleteUpload,
    DialCreate,
    DialUpdate,
    DialSubmit,
    DialStartReview,
    DialApprove,
    DialReject,
    DialLock,
    DialAmend,
    CreateTransaction,
    ApproveTransaction,
    RejectTransaction,
    PayTransaction,
    GenerateVoucher,
    IssueImprest,
    RetireImprest,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::Register => "register",
            AuditAction::CreateUser => "create_user",
            AuditAction::EnableUser => "enable_user",
            AuditAction::DisableUser => "disable_user",
            AuditAction::CreateDept => "create_department",
            AuditAction::UpdateDept => "update_department",
            AuditAction::DeleteDept => "delete_department",
            AuditAction::CreateEmployee => "create_employee",
            AuditAction::UpdateEmployee => "update_employee",
            AuditAction::DeleteEmployee => "delete_employee",
            AuditAction::CreateJob => "create_job",
            AuditAction::UpdateJob => "update_job",
            AuditAction::CloseJob => "close_job",
            AuditAction::Apply => "apply",
            AuditAction::ReviewApplication => "review_application",
            AuditAction::Upload => "upload",
            AuditAction::DeleteUpload => "delete_upload",
            AuditAction::DialCreate => "dial_create",
            AuditAction::DialUpdate => "dial_update",
            AuditAction::DialSubmit => "dial_submit",
            AuditAction::DialStartReview => "dial_start_review",
            AuditAction::DialApprove => "dial_approve",
            AuditAction::DialReject => "dial_reject",
            AuditAction::DialLock => "dial_lock",
            AuditAction::DialAmend => "dial_amend",
            AuditAction::CreateTransaction => "create_transaction",
            AuditAction::ApproveTransaction => "approve_transaction",
            AuditAction::RejectTransaction => "reject_transaction",
            AuditAction::PayTransaction => "pay_transaction",
            AuditAction::GenerateVoucher => "generate_voucher",
            AuditAction::IssueImprest => "issue_imprest",
            AuditAction::RetireImprest => "retire_imprest",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "county_audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Unix timestamp
    pub created_at: i64,

    pub actor_id: i64,

    #[sea_orm(column_type = "String(Some(128))")]
    pub actor_email: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub action: String,

    /// Declaration the action touched, if any
    #[sea_orm(nullable)]
    pub dial_record_id: Option<i64>,

    #[sea_orm(column_type = "String(Some(32))")]
    pub entity_type: String,

    #[sea_orm(nullable)]
    pub entity_id: Option<i64>,

    #[sea_orm(column_type = "Text")]
    pub details: String,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub ip: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
