//! Durable conversation storage.
//!
//! One serialized record per `(pipeline id, role)` at a deterministic
//! location; concurrent pipelines never contend on the same record.

mod fs;

pub use fs::FsStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentRole, ConversationHistory};
use crate::error::StoreError;

/// Persisted envelope around one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub pipeline_id: String,
    pub role: AgentRole,
    pub saved_at: DateTime<Utc>,
    pub history: ConversationHistory,
}

/// Durable store collaborator. Write-then-read must round-trip exactly.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist the history for `(pipeline_id, role)`, replacing any
    /// previous record.
    async fn save(
        &self,
        pipeline_id: &str,
        role: AgentRole,
        history: &ConversationHistory,
    ) -> Result<(), StoreError>;

    /// Load the history for `(pipeline_id, role)`, if one was saved.
    async fn load(
        &self,
        pipeline_id: &str,
        role: AgentRole,
    ) -> Result<Option<ConversationHistory>, StoreError>;
}
