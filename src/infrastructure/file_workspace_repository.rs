// File-backed workspace store: one JSON document per user
use crate::application::workspace_repository::{WorkspaceError, WorkspaceRepository};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const WORKSPACE_NAME: &str = "Default";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWorkspace {
    user_id: String,
    name: String,
    state: Value,
    updated_at: String,
}

pub struct FileWorkspaceRepository {
    dir: PathBuf,
}

impl FileWorkspaceRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// User ids become file names, so anything outside `[A-Za-z0-9_-]` is
    /// hex-escaped.
    fn path_for(&self, user_id: &str) -> PathBuf {
        let mut name = String::with_capacity(user_id.len());
        for b in user_id.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                name.push(b as char);
            } else {
                name.push_str(&format!("%{:02x}", b));
            }
        }
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl WorkspaceRepository for FileWorkspaceRepository {
    async fn get(&self, user_id: &str) -> Result<Option<Value>, WorkspaceError> {
        let path = self.path_for(user_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read {}", path.display()))
                    .into())
            }
        };
        let stored: StoredWorkspace = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt workspace file {}", path.display()))?;
        Ok(Some(stored.state))
    }

    async fn put(&self, user_id: &str, state: &Value) -> Result<(), WorkspaceError> {
        if !state.is_object() {
            return Err(WorkspaceError::InvalidState);
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let doc = StoredWorkspace {
            user_id: user_id.to_string(),
            name: WORKSPACE_NAME.to_string(),
            state: state.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        let bytes = serde_json::to_vec_pretty(&doc).context("Failed to encode workspace")?;

        // Write next to the target then rename so readers never see a partial file
        let path = self.path_for(user_id);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to replace {}", path.display()))
                .into());
        }

        tracing::debug!("Saved workspace for {} ({} bytes)", user_id, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_workspace_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileWorkspaceRepository::new(dir.path().join("ws"));
        assert!(repo.get("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_returns_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileWorkspaceRepository::new(dir.path().join("ws"));
        let state = json!({ "tracks": [], "selectedModelId": "economic-machine" });

        repo.put("alice", &state).await.unwrap();
        repo.put("alice", &json!({ "tracks": [] })).await.unwrap();
        repo.put("bob", &state).await.unwrap();

        assert_eq!(repo.get("alice").await.unwrap(), Some(json!({ "tracks": [] })));
        assert_eq!(repo.get("bob").await.unwrap(), Some(state));

        let leftovers: Vec<_> = std::fs::read_dir(repo.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_object_state() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileWorkspaceRepository::new(dir.path());
        let err = repo.put("alice", &json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidState));
    }

    #[test]
    fn test_user_ids_are_escaped_in_file_names() {
        let repo = FileWorkspaceRepository::new("/data");
        assert_eq!(repo.path_for("../Admin"), PathBuf::from("/data/%2e%2e%2fAdmin.json"));
    }
}
