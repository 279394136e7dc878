//! Audit log handlers
//!
//! Append-only action trail. DIAL status changes write their entry inside the
//! same transaction as the change. Other entries are queued on a bounded
//! channel and written by a background task.

use axum::{extract::Query, response::Json, Extension};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::entity::audit_log;
use crate::error::AppResult;
use crate::middleware::auth::{perm, CurrentUser};
use crate::middleware::DbConn;
use crate::routes::ApiResponse;

/// Query parameters for log pagination
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u64,
    #[serde(rename = "dialRecordId")]
    pub dial_record_id: Option<i64>,
    #[serde(rename = "actorId")]
    pub actor_id: Option<i64>,
    pub action: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

/// Log response
#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "actorId")]
    pub actor_id: i64,
    #[serde(rename = "actorEmail")]
    pub actor_email: String,
    pub action: String,
    #[serde(rename = "dialRecordId")]
    pub dial_record_id: Option<i64>,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(rename = "entityId")]
    pub entity_id: Option<i64>,
    pub details: String,
    pub ip: Option<String>,
}

impl From<audit_log::Model> for LogResponse {
    fn from(m: audit_log::Model) -> Self {
        Self {
            id: m.id,
            created_at: m.created_at,
            actor_id: m.actor_id,
            actor_email: m.actor_email,
            action: m.action,
            dial_record_id: m.dial_record_id,
            entity_type: m.entity_type,
            entity_id: m.entity_id,
            details: m.details,
            ip: m.ip,
        }
    }
}

/// Query response with pagination
#[derive(Debug, Serialize)]
pub struct LogQueryResponse {
    pub logs: Vec<LogResponse>,
    pub total: u64,
}

/// GET /api/audit
pub async fn query_audit(
    Extension(db): Extension<DbConn>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<ApiResponse<LogQueryResponse>>> {
    current_user.require(perm::AUDIT)?;

    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);

    let mut select = audit_log::Entity::find();
    if let Some(id) = query.dial_record_id {
        select = select.filter(audit_log::Column::DialRecordId.eq(id));
    }
    if let Some(id) = query.actor_id {
        select = select.filter(audit_log::Column::ActorId.eq(id));
    }
    if let Some(action) = query.action.filter(|a| !a.is_empty()) {
        select = select.filter(audit_log::Column::Action.eq(action));
    }

    let total = select.clone().count(&*db).await?;
    let logs = select
        .order_by_desc(audit_log::Column::Id)
        .offset((page - 1) * page_size)
        .limit(page_size)
        .all(&*db)
        .await?
        .into_iter()
        .map(LogResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(LogQueryResponse { logs, total })))
}

/// Trail of one declaration, oldest first. Shared by the DIAL history endpoint.
pub async fn dial_trail(
    db: &sea_orm::DatabaseConnection,
    dial_record_id: i64,
) -> AppResult<Vec<LogResponse>> {
    let logs = audit_log::Entity::find()
        .filter(audit_log::Column::DialRecordId.eq(dial_record_id))
        .order_by_asc(audit_log::Column::Id)
        .all(db)
        .await?;
    Ok(logs.into_iter().map(LogResponse::from).collect())
}

/// Service for adding audit entries
pub mod service {
    use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
    use tokio::sync::mpsc::{self, error::TrySendError};

    use crate::entity::audit_log::{self, AuditAction};
    use crate::middleware::auth::CurrentUser;

    /// Entry to be written
    #[derive(Debug, Clone)]
    pub struct AuditEntry {
        pub actor_id: i64,
        pub actor_email: String,
        pub action: AuditAction,
        pub dial_record_id: Option<i64>,
        pub entity_type: String,
        pub entity_id: Option<i64>,
        pub details: String,
        pub ip: Option<String>,
    }

    impl AuditEntry {
        pub fn new(actor: &CurrentUser, action: AuditAction, entity_type: &str) -> Self {
            Self {
                actor_id: actor.id,
                actor_email: actor.email.clone(),
                action,
                dial_record_id: None,
                entity_type: entity_type.to_string(),
                entity_id: None,
                details: String::new(),
                ip: None,
            }
        }

        pub fn entity(mut self, id: i64) -> Self {
            self.entity_id = Some(id);
            self
        }

        pub fn dial(mut self, dial_record_id: i64) -> Self {
            self.dial_record_id = Some(dial_record_id);
            self.entity_id.get_or_insert(dial_record_id);
            self
        }

        pub fn details(mut self, details: impl Into<String>) -> Self {
            self.details = details.into();
            self
        }
    }

    /// Global log channel
    static LOG_TX: std::sync::OnceLock<mpsc::Sender<AuditEntry>> = std::sync::OnceLock::new();

    /// Initialize the audit log service
    /// This function is idempotent - calling it multiple times is safe
    pub fn init(db: sea_orm::DatabaseConnection) {
        if LOG_TX.get().is_some() {
            tracing::debug!("Audit log service already initialized, skipping");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<AuditEntry>(200);
        if LOG_TX.set(tx).is_err() {
            tracing::debug!("Audit log service initialized by another thread");
            return;
        }

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = write(&db, entry).await {
                    tracing::error!("Failed to write audit entry: {}", e);
                }
            }
        });
    }

    impl From<AuditEntry> for audit_log::ActiveModel {
        fn from(entry: AuditEntry) -> Self {
            audit_log::ActiveModel {
                created_at: Set(chrono::Utc::now().timestamp()),
                actor_id: Set(entry.actor_id),
                actor_email: Set(entry.actor_email),
                action: Set(entry.action.as_str().to_string()),
                dial_record_id: Set(entry.dial_record_id),
                entity_type: Set(entry.entity_type),
                entity_id: Set(entry.entity_id),
                details: Set(entry.details),
                ip: Set(entry.ip),
                ..Default::default()
            }
        }
    }

    /// Write an entry on `db` directly. Pass a transaction to make the entry
    /// part of the change it describes.
    pub async fn write<C: ConnectionTrait>(db: &C, entry: AuditEntry) -> Result<(), DbErr> {
        audit_log::ActiveModel::from(entry).insert(db).await?;
        Ok(())
    }

    /// Hand `entry` to the writer. When the channel is full the send waits on
    /// a spawned task instead of dropping the entry.
    pub(crate) fn enqueue(tx: &mpsc::Sender<AuditEntry>, entry: AuditEntry) {
        match tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = tx.send(entry).await {
                        tracing::error!("Audit writer stopped, entry lost: {}", e.0.action.as_str());
                    }
                });
            }
            Err(TrySendError::Closed(entry)) => {
                tracing::error!("Audit writer stopped, entry lost: {}", entry.action.as_str());
            }
        }
    }

    /// Queue an audit entry
    pub fn record(entry: AuditEntry) {
        if let Some(tx) = LOG_TX.get() {
            enqueue(tx, entry);
        } else {
            tracing::warn!(
                "Audit log service not initialized, entry dropped: {} by {}",
                entry.action.as_str(),
                entry.actor_email
            );
        }
    }

    /// Shorthand for entries without a DIAL record
    pub fn log_operation(
        actor: &CurrentUser,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<i64>,
        details: impl Into<String>,
    ) {
        let mut entry = AuditEntry::new(actor, action, entity_type).details(details);
        entry.entity_id = entity_id;
        record(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::service::AuditEntry;
    use crate::entity::audit_log::AuditAction;
    use crate::entity::user::Role;
    use crate::middleware::auth::CurrentUser;

    #[test]
    fn dial_entries_are_keyed_by_record() {
        let actor = CurrentUser {
            id: 7,
            email: "officer@county.go.ke".to_string(),
            full_name: "Officer".to_string(),
            role: Role::Officer,
            permissions: vec![],
        };
        let entry = AuditEntry::new(&actor, AuditAction::DialSubmit, "dial_record")
            .dial(12)
            .details("v1");
        assert_eq!(entry.dial_record_id, Some(12));
        assert_eq!(entry.entity_id, Some(12));
        assert_eq!(entry.actor_email, "officer@county.go.ke");
        assert_eq!(entry.details, "v1");
    }

    #[tokio::test]
    async fn full_channel_keeps_every_entry() {
        let actor = CurrentUser {
            id: 3,
            email: "reviewer@county.go.ke".to_string(),
            full_name: "Reviewer".to_string(),
            role: Role::Board,
            permissions: vec![],
        };
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        for id in 0..50 {
            super::service::enqueue(
                &tx,
                AuditEntry::new(&actor, AuditAction::DialApprove, "dial_record").dial(id),
            );
        }

        let mut seen = Vec::new();
        for _ in 0..50 {
            let entry = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .expect("writer starved")
                .expect("channel closed");
            seen.push(entry.dial_record_id.unwrap());
        }
        seen.sort();
        assert_eq!(seen, (0..50).collect::<Vec<i64>>());
    }

    #[test]
    fn entry_becomes_audit_row() {
        use sea_orm::ActiveValue;

        let actor = CurrentUser {
            id: 9,
            email: "board@county.go.ke".to_string(),
            full_name: "Board".to_string(),
            role: Role::Board,
            permissions: vec![],
        };
        let row = crate::entity::audit_log::ActiveModel::from(
            AuditEntry::new(&actor, AuditAction::DialReject, "dial_record")
                .dial(4)
                .details("under_review -> rejected: missing items"),
        );
        assert_eq!(row.actor_id, ActiveValue::Set(9));
        assert_eq!(row.dial_record_id, ActiveValue::Set(Some(4)));
        assert_eq!(row.action, ActiveValue::Set(AuditAction::DialReject.as_str().to_string()));
        assert!(row.id.is_not_set());
    }

    #[tokio::test]
    async fn record_without_service_does_not_panic() {
        let actor = CurrentUser {
            id: 1,
            email: "a@b".to_string(),
            full_name: "A".to_string(),
            role: Role::Admin,
            permissions: vec![],
        };
        super::service::record(AuditEntry::new(&actor, AuditAction::Login, "user"));
    }
}
