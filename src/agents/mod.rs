//! Role agents and the conversation machinery they share.
//!
//! Three roles cooperate on each task: the Navigator reasons about the
//! problem, the Test Designer writes a complementary pytest suite, and the
//! Developer implements code against that suite. All three are instances
//! of [`Agent`] specialized by a [`RolePolicy`].

mod agent;
mod developer;
mod history;
mod navigator;
mod role;
mod test_designer;

pub mod templates;

pub use agent::{Agent, RolePolicy, Verdict};
pub use developer::Developer;
pub use history::{ConversationHistory, ConversationState};
pub use navigator::Navigator;
pub use role::AgentRole;
pub use test_designer::{FixturePolicy, TestDesigner};
