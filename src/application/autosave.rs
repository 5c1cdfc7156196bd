// Autosave - Debounced persistence of the workspace document
use crate::application::workspace_repository::WorkspaceRepository;
use crate::domain::workspace::SaveStatus;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(800);

/// Holds at most one pending write. A new change aborts the pending one and
/// restarts the quiet period.
pub struct AutosaveScheduler {
    repository: Arc<dyn WorkspaceRepository>,
    user_id: String,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    status_tx: watch::Sender<SaveStatus>,
}

impl AutosaveScheduler {
    pub fn new(repository: Arc<dyn WorkspaceRepository>, user_id: impl Into<String>, delay: Duration) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::NotSaved);
        Self {
            repository,
            user_id: user_id.into(),
            delay,
            pending: None,
            status_tx,
        }
    }

    pub fn status(&self) -> SaveStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status_tx.subscribe()
    }

    /// Mark the document as already persisted, e.g. right after hydrating.
    pub fn mark_saved(&self) {
        self.status_tx.send_replace(SaveStatus::Saved);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Schedule `state` to be written once the quiet period elapses.
    pub fn schedule(&mut self, state: Value) {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }
        self.status_tx.send_replace(SaveStatus::Saving);

        let repository = self.repository.clone();
        let user_id = self.user_id.clone();
        let delay = self.delay;
        let status_tx = self.status_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match repository.put(&user_id, &state).await {
                Ok(()) => {
                    status_tx.send_replace(SaveStatus::Saved);
                }
                Err(e) => {
                    tracing::warn!("Autosave for {} failed: {}", user_id, e);
                    status_tx.send_replace(SaveStatus::NotSaved);
                }
            }
        }));
    }

    /// Wait for the pending write, if any, to finish.
    pub async fn flush(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::workspace_repository::WorkspaceError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRepository {
        writes: Mutex<Vec<Value>>,
        fail: bool,
    }

    #[async_trait]
    impl WorkspaceRepository for RecordingRepository {
        async fn get(&self, _user_id: &str) -> Result<Option<Value>, WorkspaceError> {
            Ok(self.writes.lock().unwrap().last().cloned())
        }

        async fn put(&self, _user_id: &str, state: &Value) -> Result<(), WorkspaceError> {
            if self.fail {
                return Err(WorkspaceError::Storage(anyhow::anyhow!("disk full")));
            }
            self.writes.lock().unwrap().push(state.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_write_once() {
        let repo = Arc::new(RecordingRepository::default());
        let mut autosave = AutosaveScheduler::new(repo.clone(), "alice", DEFAULT_AUTOSAVE_DELAY);

        autosave.schedule(json!({ "n": 1 }));
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.schedule(json!({ "n": 2 }));
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.schedule(json!({ "n": 3 }));
        assert_eq!(autosave.status(), SaveStatus::Saving);
        assert!(autosave.has_pending());
        assert!(repo.writes.lock().unwrap().is_empty());

        autosave.flush().await;
        assert!(!autosave.has_pending());
        assert_eq!(*repo.writes.lock().unwrap(), vec![json!({ "n": 3 })]);
        assert_eq!(autosave.status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_waits_for_quiet_period() {
        let repo = Arc::new(RecordingRepository::default());
        let mut autosave = AutosaveScheduler::new(repo.clone(), "alice", DEFAULT_AUTOSAVE_DELAY);
        let mut status = autosave.subscribe();

        autosave.schedule(json!({}));
        assert_eq!(*status.borrow_and_update(), SaveStatus::Saving);
        tokio::time::sleep(Duration::from_millis(799)).await;
        assert!(repo.writes.lock().unwrap().is_empty());

        status.changed().await.unwrap();
        assert_eq!(*status.borrow(), SaveStatus::Saved);
        assert_eq!(repo.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_reports_not_saved() {
        let repo = Arc::new(RecordingRepository {
            fail: true,
            ..Default::default()
        });
        let mut autosave = AutosaveScheduler::new(repo, "alice", DEFAULT_AUTOSAVE_DELAY);
        autosave.mark_saved();

        autosave.schedule(json!({}));
        autosave.flush().await;
        assert_eq!(autosave.status(), SaveStatus::NotSaved);
    }
}
