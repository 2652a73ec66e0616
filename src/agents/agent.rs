//! Shared role-agent template.
//!
//! One state machine drives all three roles; roles differ only in prompt
//! construction and output validation, supplied through [`RolePolicy`].

use std::sync::Arc;

use crate::agents::{AgentRole, ConversationHistory};
use crate::error::AgentError;
use crate::llm::{ChatMessage, CompletionBackend, CompletionRequest, GenerationParams};
use crate::store::HistoryStore;

/// Outcome of a role-specific validity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Output accepted, possibly rewritten (fences stripped, offending
    /// tests removed).
    Accept(String),
    /// Output rejected; the payload is the corrective follow-up message
    /// describing the defect.
    Retry(String),
}

/// Role specialization: prompts plus the validity check.
pub trait RolePolicy: Send {
    fn role(&self) -> AgentRole;
    fn system_prompt(&self) -> String;
    /// Initial user prompt for this role.
    fn user_prompt(&self) -> String;
    /// Judge a reply. `Retry` feeds the corrective protocol; a hard error
    /// aborts the agent.
    fn validate(&mut self, reply: &str) -> Result<Verdict, AgentError>;
}

/// A role agent: one conversation with the completion collaborator.
pub struct Agent<P: RolePolicy> {
    policy: P,
    pipeline_id: String,
    history: ConversationHistory,
    backend: Arc<dyn CompletionBackend>,
    store: Arc<dyn HistoryStore>,
    params: GenerationParams,
}

impl<P: RolePolicy> Agent<P> {
    /// Construct an agent, resuming a persisted conversation for
    /// `(pipeline_id, role)` when one exists.
    pub async fn new(
        policy: P,
        pipeline_id: impl Into<String>,
        backend: Arc<dyn CompletionBackend>,
        store: Arc<dyn HistoryStore>,
        max_iterations: usize,
        params: GenerationParams,
    ) -> Result<Self, AgentError> {
        let pipeline_id = pipeline_id.into();
        let history = match store.load(&pipeline_id, policy.role()).await? {
            Some(history) => {
                tracing::debug!(
                    pipeline = %pipeline_id,
                    role = %policy.role(),
                    messages = history.len(),
                    "resumed persisted conversation"
                );
                history
            }
            None => ConversationHistory::new(policy.system_prompt(), max_iterations),
        };

        Ok(Self {
            policy,
            pipeline_id,
            history,
            backend,
            store,
            params,
        })
    }

    pub fn role(&self) -> AgentRole {
        self.policy.role()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Run the role's initial prompt.
    pub async fn initial_generation(&mut self) -> Result<ChatMessage, AgentError> {
        let prompt = self.policy.user_prompt();
        self.generate(prompt).await
    }

    /// Send a message and return a validated reply.
    ///
    /// An exact repeat of a previously sent message returns the cached
    /// reply without a backend call. Otherwise each rejected reply turns
    /// into a corrective follow-up; the loop is bounded by the history
    /// ceiling, which surfaces as [`AgentError::MaxIterations`].
    pub async fn generate(&mut self, message: String) -> Result<ChatMessage, AgentError> {
        if let Some(hit) = self.history.cached(&message) {
            tracing::debug!(role = %self.policy.role(), "memo hit, no completion request issued");
            return Ok(hit.clone());
        }

        let mut outgoing = message;
        loop {
            self.history.push_user(outgoing.clone())?;

            let request = CompletionRequest::new(self.history.messages().to_vec())
                .with_params(self.params.clone());
            let response = self.backend.complete(request).await?;
            let reply = response
                .first()
                .cloned()
                .ok_or_else(|| crate::error::LlmError::NoChoices {
                    provider: "backend".to_string(),
                })?;

            self.history.push_assistant(&outgoing, reply.clone());
            self.persist().await?;

            match self.policy.validate(&reply.content)? {
                Verdict::Accept(content) => {
                    if content != reply.content {
                        self.history.rewrite_last_reply(&outgoing, content.clone());
                        self.persist().await?;
                    }
                    return Ok(ChatMessage::assistant(content));
                }
                Verdict::Retry(corrective) => {
                    tracing::warn!(
                        role = %self.policy.role(),
                        pipeline = %self.pipeline_id,
                        "reply rejected, sending corrective follow-up"
                    );
                    outgoing = corrective;
                }
            }
        }
    }

    async fn persist(&self) -> Result<(), AgentError> {
        self.store
            .save(&self.pipeline_id, self.policy.role(), &self.history)
            .await?;
        Ok(())
    }
}
