use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    Uploading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub received: u64,
    /// Declared size, when the client sent one
    pub total: Option<u64>,
    pub state: ProgressState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl UploadProgress {
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|t| *t > 0)?;
        Some(((self.received.min(total) * 100) / total) as u8)
    }
}

/// Upload progress keyed by owner and client-chosen identifier
#[derive(Clone, Default)]
pub struct ProgressTracker {
    entries: Arc<DashMap<(i64, String), UploadProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, owner: i64, identifier: &str, total: Option<u64>) {
        self.entries.insert(
            (owner, identifier.to_string()),
            UploadProgress {
                received: 0,
                total,
                state: ProgressState::Uploading,
                error: None,
                updated_at: chrono::Utc::now().timestamp(),
            },
        );
    }

    pub fn advance(&self, owner: i64, identifier: &str, bytes: u64) {
        if let Some(mut entry) = self.entries.get_mut(&(owner, identifier.to_string())) {
            entry.received += bytes;
            entry.updated_at = chrono::Utc::now().timestamp();
        }
    }

    pub fn complete(&self, owner: i64, identifier: &str) {
        self.finish(owner, identifier, ProgressState::Completed, None);
    }

    pub fn fail(&self, owner: i64, identifier: &str, error: impl Into<String>) {
        self.finish(owner, identifier, ProgressState::Failed, Some(error.into()));
    }

    fn finish(&self, owner: i64, identifier: &str, state: ProgressState, error: Option<String>) {
        if let Some(mut entry) = self.entries.get_mut(&(owner, identifier.to_string())) {
            entry.state = state;
            entry.error = error;
            entry.updated_at = chrono::Utc::now().timestamp();
        }
    }

    pub fn get(&self, owner: i64, identifier: &str) -> Option<UploadProgress> {
        self.entries
            .get(&(owner, identifier.to_string()))
            .map(|e| e.value().clone())
    }

    /// Drop finished entries not touched for `max_age_secs`
    pub fn prune(&self, max_age_secs: i64) -> usize {
        let cutoff = chrono::Utc::now().timestamp() - max_age_secs;
        let before = self.entries.len();
        self.entries
            .retain(|_, p| p.state == ProgressState::Uploading || p.updated_at >= cutoff);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_per_owner_and_identifier() {
        let tracker = ProgressTracker::new();
        tracker.start(1, "cv", Some(200));
        tracker.advance(1, "cv", 50);
        tracker.advance(2, "cv", 50);

        let progress = tracker.get(1, "cv").unwrap();
        assert_eq!(progress.received, 50);
        assert_eq!(progress.percent(), Some(25));
        assert!(tracker.get(2, "cv").is_none());

        tracker.fail(1, "cv", "too large");
        let progress = tracker.get(1, "cv").unwrap();
        assert_eq!(progress.state, ProgressState::Failed);
        assert_eq!(progress.error.as_deref(), Some("too large"));
    }

    #[test]
    fn prune_keeps_active_uploads() {
        let tracker = ProgressTracker::new();
        tracker.start(1, "a", None);
        tracker.start(1, "b", None);
        tracker.complete(1, "b");
        // everything finished is older than -1 seconds
        assert_eq!(tracker.prune(-1), 1);
        assert!(tracker.get(1, "a").is_some());
        assert!(tracker.get(1, "b").is_none());
        assert_eq!(tracker.get(1, "a").unwrap().percent(), None);
    }
}
