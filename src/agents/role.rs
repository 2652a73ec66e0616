//! Role identity for agents and their persisted records.

use serde::{Deserialize, Serialize};

/// The three generation roles. Explicit identity: storage keys and log
/// fields use this, never a runtime type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Navigator,
    TestDesigner,
    Developer,
}

impl AgentRole {
    /// Stable lowercase key, used for storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Navigator => "navigator",
            AgentRole::TestDesigner => "test_designer",
            AgentRole::Developer => "developer",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
