use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::docgen::DocumentGenerator;
use crate::permission::PermissionEnforcer;
use crate::upload::{FileStore, LocalFileStore, ProgressTracker, UploadPolicy};

/// WebSocket notification message
#[derive(Clone, Debug)]
pub struct WsNotification {
    pub user_id: i64,
    pub message: serde_json::Value,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Role permission enforcer
    pub perm: PermissionEnforcer,
    /// Application configuration
    pub config: Arc<Config>,
    /// Upload validation policy derived from config
    pub upload_policy: Arc<UploadPolicy>,
    /// Uploaded document storage
    pub files: Arc<dyn FileStore>,
    /// Per-identifier upload progress
    pub progress: ProgressTracker,
    /// Voucher generator
    pub docs: Arc<DocumentGenerator>,
    /// WebSocket notification sender
    pub ws_sender: broadcast::Sender<WsNotification>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: DatabaseConnection, perm: PermissionEnforcer, config: Config) -> Self {
        let (ws_sender, _) = broadcast::channel(1000);
        let upload_policy = UploadPolicy::from(&config.upload);
        let files = LocalFileStore::new(config.root_dir.clone());
        let docs = DocumentGenerator::new(&config.documents);

        Self {
            db,
            perm,
            config: Arc::new(config),
            upload_policy: Arc::new(upload_policy),
            files: Arc::new(files),
            progress: ProgressTracker::new(),
            docs: Arc::new(docs),
            ws_sender,
        }
    }

    /// Send notification to a specific user via WebSocket
    pub fn notify_user(&self, user_id: i64, message: serde_json::Value) {
        let notification = WsNotification { user_id, message };
        // Ignore send errors (no receivers is fine)
        let _ = self.ws_sender.send(notification);
    }

    /// Subscribe to WebSocket notifications
    pub fn subscribe(&self) -> broadcast::Receiver<WsNotification> {
        self.ws_sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_notification() {
        let notification = WsNotification {
            user_id: 1,
            message: serde_json::json!({"type": "dialStatus"}),
        };
        assert_eq!(notification.user_id, 1);
        assert_eq!(notification.message["type"], "dialStatus");
    }
}
