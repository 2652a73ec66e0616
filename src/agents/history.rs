//! Per-role conversation history: append-only, memoized, persistable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::llm::ChatMessage;

/// Conversation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// System message only; nothing sent yet.
    Uninitialized,
    /// A user message has been appended and awaits its reply.
    AwaitingResponse,
    /// The latest exchange completed.
    Responded,
    /// The message ceiling was hit. Terminal.
    Exceeded,
}

/// Ordered message history for one agent, with a memo map from outgoing
/// user text to the cached reply.
///
/// Length is bounded by `3 + 2 * max_iterations`: the system message, the
/// initial exchange, and one exchange per corrective round trip. The bound
/// is enforced, never silently truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    memo: HashMap<String, ChatMessage>,
    state: ConversationState,
    ceiling: usize,
}

impl ConversationHistory {
    /// Fresh history holding only the system message.
    pub fn new(system_prompt: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            memo: HashMap::new(),
            state: ConversationState::Uninitialized,
            ceiling: 3 + 2 * max_iterations,
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Cached reply for an exact previously-sent user message, if any.
    pub fn cached(&self, outgoing: &str) -> Option<&ChatMessage> {
        self.memo.get(outgoing)
    }

    /// Append an outgoing user message.
    ///
    /// Fails terminally when the exchange would exceed the ceiling; the
    /// history transitions to [`ConversationState::Exceeded`] and stays
    /// there.
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), AgentError> {
        if self.state == ConversationState::Exceeded || self.messages.len() + 2 > self.ceiling {
            self.state = ConversationState::Exceeded;
            return Err(AgentError::MaxIterations {
                ceiling: self.ceiling,
            });
        }
        self.messages.push(ChatMessage::user(content));
        self.state = ConversationState::AwaitingResponse;
        Ok(())
    }

    /// Append the reply to the most recent user message and memoize it
    /// under the outgoing text.
    pub fn push_assistant(&mut self, outgoing: &str, reply: ChatMessage) {
        self.memo.insert(outgoing.to_string(), reply.clone());
        self.messages.push(reply);
        self.state = ConversationState::Responded;
    }

    /// Replace the content of the latest reply, in history and memo both.
    ///
    /// Used when validation rewrites accepted output (fence stripping,
    /// fixture removal) so the persisted record matches what was returned.
    pub fn rewrite_last_reply(&mut self, outgoing: &str, content: impl Into<String>) {
        let reply = ChatMessage::assistant(content);
        if let Some(last) = self.messages.last_mut() {
            *last = reply.clone();
        }
        self.memo.insert(outgoing.to_string(), reply);
    }
}
