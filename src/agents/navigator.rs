//! Navigator role: free-text analysis of the task ahead of code
//! generation.

use std::sync::Arc;

use crate::agents::templates::{
    GenerationPrompt, SystemTemplate, AVOID_PITFALLS, PERFORMANCE_CRITICAL,
};
use crate::agents::{AgentRole, RolePolicy, Verdict};
use crate::analyzer::CodeContext;
use crate::error::AgentError;

pub struct Navigator {
    context: Arc<CodeContext>,
}

impl Navigator {
    pub fn new(context: Arc<CodeContext>) -> Self {
        Self { context }
    }
}

impl RolePolicy for Navigator {
    fn role(&self) -> AgentRole {
        AgentRole::Navigator
    }

    fn system_prompt(&self) -> String {
        SystemTemplate {
            role: "Navigator",
            description: [
                "Navigators look at the context and reason on a high level about what needs to be done to solve a given problem.",
                "You should NOT actually solve the problem - rather, you should provide maximally relevant context such that the",
                "Developer and Test Designer agents can perform their jobs optimally.",
            ]
            .join("\n"),
            extra_context: vec![
                PERFORMANCE_CRITICAL.to_string(),
                AVOID_PITFALLS.to_string(),
            ],
        }
        .render()
    }

    fn user_prompt(&self) -> String {
        GenerationPrompt {
            targets: self.context.signatures.clone(),
            additional_objects: self.context.undefined.clone(),
            tests: vec![self.context.test_source()],
            command: [
                "Please reason in detail about what the user will need to do to solve the problem.",
                "Think in particular about any gotchas and edge cases that might be encountered.",
            ]
            .join("\n"),
        }
        .render()
    }

    /// Navigator output is prose; any reply is accepted verbatim.
    fn validate(&mut self, reply: &str) -> Result<Verdict, AgentError> {
        Ok(Verdict::Accept(reply.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{SymbolTable, Task};

    fn context() -> Arc<CodeContext> {
        let task = Task::new(
            r#"def test_factorial():
    """
    /gen
    factorial:
        - doc: Compute n!.
        - args:
            - n: int
        - returns: int
    /end_gen
    """
    assert factorial(5) == 120
"#,
        );
        Arc::new(CodeContext::build(&task, &SymbolTable::with_builtins()).unwrap())
    }

    #[test]
    fn system_prompt_names_the_role() {
        let nav = Navigator::new(context());
        let prompt = nav.system_prompt();
        assert!(prompt.contains("Your role is 'Navigator.'"));
        assert!(prompt.contains("performance-critical"));
    }

    #[test]
    fn user_prompt_carries_signatures_and_tests() {
        let nav = Navigator::new(context());
        let prompt = nav.user_prompt();
        assert!(prompt.contains("def factorial(n: int) -> int:"));
        assert!(prompt.contains("\"\"\"Compute n!.\"\"\""));
        assert!(prompt.contains("assert factorial(5) == 120"));
        // The signed target is not also listed as an undefined object.
        assert!(!prompt.contains("not defined in the global or local context"));
    }

    #[test]
    fn any_reply_is_accepted() {
        let mut nav = Navigator::new(context());
        let verdict = nav.validate("think about n == 0").unwrap();
        assert_eq!(verdict, Verdict::Accept("think about n == 0".to_string()));
    }
}
