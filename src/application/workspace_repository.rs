// Repository trait for per-user workspace documents
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace state must be a JSON object")]
    InvalidState,
    #[error("workspace storage failed: {0}")]
    Storage(#[from] anyhow::Error),
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Stored document for the user, if one has been written
    async fn get(&self, user_id: &str) -> Result<Option<Value>, WorkspaceError>;

    /// Replace the user's document
    async fn put(&self, user_id: &str, state: &Value) -> Result<(), WorkspaceError>;
}
