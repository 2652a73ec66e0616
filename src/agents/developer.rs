//! Developer role: implements the target functions against the compiled
//! test suite.

use std::sync::Arc;

use crate::agents::templates::{
    fenced, GenerationPrompt, SystemTemplate, AVOID_PITFALLS, CODE_GENERATOR, PERFORMANCE_CRITICAL,
};
use crate::agents::{AgentRole, RolePolicy, Verdict};
use crate::analyzer::CodeContext;
use crate::error::{AgentError, ValidateError};
use crate::validate::clean_generated_code;

pub struct Developer {
    context: Arc<CodeContext>,
    /// Fenced test suite the implementation must pass.
    test_suite: String,
}

impl Developer {
    pub fn new(context: Arc<CodeContext>, test_suite: &str) -> Self {
        Self {
            context,
            test_suite: fenced(test_suite),
        }
    }
}

impl RolePolicy for Developer {
    fn role(&self) -> AgentRole {
        AgentRole::Developer
    }

    fn system_prompt(&self) -> String {
        SystemTemplate {
            role: "Developer",
            description: "Developers implement python code that satisfies the test constraints provided by the Test Designer role agent.".to_string(),
            extra_context: vec![
                PERFORMANCE_CRITICAL.to_string(),
                AVOID_PITFALLS.to_string(),
                format!(
                    "The test suite your code must pass is as follows:\n{}",
                    self.test_suite
                ),
                CODE_GENERATOR.to_string(),
            ],
        }
        .render()
    }

    fn user_prompt(&self) -> String {
        let mut command: Vec<String> =
            vec!["Please implement the following functions to pass the provided tests:".to_string()];
        command.extend(self.context.fn_names.iter().cloned());
        command.push(String::new());
        command.push("Please also implement any necessary undefined code objects.".to_string());
        command.push(
            "NOTE: The code you generate will be placed above the test suite provided by the Test Designer agent;"
                .to_string(),
        );
        command.push("As such, you do not need to reimplement any of the provided tests.".to_string());

        GenerationPrompt {
            targets: self.context.signatures.clone(),
            additional_objects: self.context.undefined.clone(),
            tests: vec![self.test_suite.clone()],
            command: command.join("\n"),
        }
        .render()
    }

    fn validate(&mut self, reply: &str) -> Result<Verdict, AgentError> {
        match clean_generated_code(reply) {
            Ok(code) => Ok(Verdict::Accept(code)),
            Err(ValidateError::InvalidGenerated { issue, .. }) => Ok(Verdict::Retry(format!(
                "Your implementation was not valid python!\n{issue}\nPlease regenerate, outputting only pure python source."
            ))),
            Err(e) => Err(e.into()),
        }
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
    fn system_prompt_embeds_the_suite() {
        let dev = Developer::new(context(), "def test_zero():\n    assert factorial(0) == 1");
        let prompt = dev.system_prompt();
        assert!(prompt.contains("Your role is 'Developer.'"));
        assert!(prompt.contains("```python\ndef test_zero():"));
    }

    #[test]
    fn user_prompt_names_the_targets() {
        let dev = Developer::new(context(), "def test_zero():\n    assert factorial(0) == 1");
        let prompt = dev.user_prompt();
        assert!(prompt.contains("def factorial(n: int) -> int:"));
        assert!(prompt.contains("Please implement the following functions"));
        assert!(prompt.contains("factorial"));
        assert!(prompt.contains("you do not need to reimplement"));
    }

    #[test]
    fn fenced_reply_is_stripped() {
        let mut dev = Developer::new(context(), "def test_zero():\n    assert factorial(0) == 1");
        let verdict = dev
            .validate("```python\ndef factorial(n: int) -> int:\n    return 1\n```")
            .unwrap();
        match verdict {
            Verdict::Accept(code) => {
                assert!(code.starts_with("def factorial"));
                assert!(!code.contains("```"));
            }
            other => panic!("expected accept, got {other:?}"),
        }
    }

    #[test]
    fn prose_reply_triggers_retry() {
        let mut dev = Developer::new(context(), "def test_zero():\n    assert factorial(0) == 1");
        match dev.validate("I would approach this recursively!").unwrap() {
            Verdict::Retry(message) => assert!(message.contains("not valid python")),
            other => panic!("expected retry, got {other:?}"),
        }
    }
}
