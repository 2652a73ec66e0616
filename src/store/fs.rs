//! File-backed history store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use crate::agents::{AgentRole, ConversationHistory};
use crate::error::StoreError;
use crate::store::{HistoryRecord, HistoryStore};

/// Stores one JSON blob per `(pipeline id, role)` at
/// `<root>/<pipeline id>/<role>.json`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deterministic record location for a key.
    pub fn record_path(&self, pipeline_id: &str, role: AgentRole) -> PathBuf {
        self.root
            .join(pipeline_id)
            .join(format!("{}.json", role.as_str()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl HistoryStore for FsStore {
    async fn save(
        &self,
        pipeline_id: &str,
        role: AgentRole,
        history: &ConversationHistory,
    ) -> Result<(), StoreError> {
        let record = HistoryRecord {
            pipeline_id: pipeline_id.to_string(),
            role,
            saved_at: Utc::now(),
            history: history.clone(),
        };

        let path = self.record_path(pipeline_id, role);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let blob = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&path, blob).await?;

        tracing::debug!(pipeline = pipeline_id, role = %role, path = %path.display(), "history persisted");
        Ok(())
    }

    async fn load(
        &self,
        pipeline_id: &str,
        role: AgentRole,
    ) -> Result<Option<ConversationHistory>, StoreError> {
        let path = self.record_path(pipeline_id, role);
        let blob = match tokio::fs::read(&path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: HistoryRecord = serde_json::from_slice(&blob)?;
        Ok(Some(record.history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn save_then_load_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let mut history = ConversationHistory::new("be helpful", 5);
        history.push_user("first").unwrap();
        history.push_assistant("first", ChatMessage::assistant("reply one"));

        store
            .save("pipe-1", AgentRole::Developer, &history)
            .await
            .unwrap();
        let restored = store
            .load("pipe-1", AgentRole::Developer)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(restored.messages(), history.messages());
        assert_eq!(restored.cached("first").unwrap().content, "reply one");
    }

    #[tokio::test]
    async fn missing_record_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let loaded = store.load("nope", AgentRole::Navigator).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn records_are_partitioned_by_pipeline_and_role() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let a = ConversationHistory::new("a", 1);
        let b = ConversationHistory::new("b", 1);
        store.save("p1", AgentRole::Navigator, &a).await.unwrap();
        store.save("p1", AgentRole::Developer, &b).await.unwrap();
        store.save("p2", AgentRole::Navigator, &b).await.unwrap();

        let nav = store
            .load("p1", AgentRole::Navigator)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nav.messages()[0].content, "a");

        assert_ne!(
            store.record_path("p1", AgentRole::Navigator),
            store.record_path("p2", AgentRole::Navigator)
        );
    }
}
