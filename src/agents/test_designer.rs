//! Test Designer role: generates a pytest suite complementing the user's
//! task tests.
//!
//! Replies pass a three-stage check: code extraction, import resolution
//! against a [`ModuleIndex`] snapshot, and fixture screening. Accepted
//! tests and their resolvable imports are retained on the policy for the
//! pipeline to compile.

use std::sync::Arc;

use crate::agents::templates::{
    GenerationPrompt, SystemTemplate, AVOID_PITFALLS, CODE_GENERATOR, PERFORMANCE_CRITICAL,
};
use crate::agents::{AgentRole, RolePolicy, Verdict};
use crate::analyzer::{CodeContext, TestCase};
use crate::error::{AgentError, ValidateError};
use crate::validate::{
    clean_generated_code, compile_tests, extract_imports, extract_tests, filter_imports,
    ModuleIndex, DEFAULT_TEST_PREFIX,
};

/// How to react when generated tests take parameters (fixture usage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixturePolicy {
    /// Strip offending tests when they are a strict subset of the suite;
    /// regenerate only when every test offends.
    #[default]
    StripOffending,
    /// Any offending test triggers regeneration of the whole suite.
    AlwaysRegenerate,
}

pub struct TestDesigner {
    context: Arc<CodeContext>,
    nav_reasoning: String,
    index: Arc<ModuleIndex>,
    fixture_policy: FixturePolicy,
    tests: Vec<TestCase>,
    imports: Vec<String>,
}

impl TestDesigner {
    pub fn new(context: Arc<CodeContext>, nav_reasoning: String, index: Arc<ModuleIndex>) -> Self {
        Self {
            context,
            nav_reasoning,
            index,
            fixture_policy: FixturePolicy::default(),
            tests: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn with_fixture_policy(mut self, policy: FixturePolicy) -> Self {
        self.fixture_policy = policy;
        self
    }

    /// Tests retained from the last accepted reply.
    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn test_sources(&self) -> Vec<String> {
        self.tests.iter().map(|t| t.source.clone()).collect()
    }

    /// Resolvable imports from the last accepted reply, `import pytest`
    /// guaranteed present.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    fn record_imports(&mut self, mut resolvable: Vec<String>) {
        if !resolvable.iter().any(|s| s == "import pytest") {
            resolvable.insert(0, "import pytest".to_string());
        }
        self.imports = resolvable;
    }
}

impl RolePolicy for TestDesigner {
    fn role(&self) -> AgentRole {
        AgentRole::TestDesigner
    }

    fn system_prompt(&self) -> String {
        SystemTemplate {
            role: "Test Designer",
            description: [
                "Test Designers focus on writing comprehensive pytest tests to satisfy the constraints",
                "of the prompt presented by the user, and the analysis provided by the Navigator role.",
                "You should be sure to include edge cases and potential gotchas in your tests.",
                "You should follow the principles of Test-Driven Design, wherein tests are written first",
                "to define the desired scope and behavior of production code.",
            ]
            .join("\n"),
            extra_context: vec![
                PERFORMANCE_CRITICAL.to_string(),
                AVOID_PITFALLS.to_string(),
                format!(
                    "The reasoning provided by the Navigator role is the following - please take this into account\n\
                     when generating your response.\n\
                     Navigator Reasoning:\n{}",
                    self.nav_reasoning
                ),
                CODE_GENERATOR.to_string(),
            ],
        }
        .render()
    }

    fn user_prompt(&self) -> String {
        GenerationPrompt {
            targets: self.context.signatures.clone(),
            additional_objects: self.context.undefined.clone(),
            tests: self.context.test_sources.clone(),
            command: [
                "Please write a pytest-compatible test suite that compliments the test(s) provided by the user.",
                "Please note that you should *not* actually implement the system under test - that will be handled",
                "by the Developer role agent.",
                "Just write the tests for the system.",
            ]
            .join("\n"),
        }
        .render()
    }

    fn validate(&mut self, reply: &str) -> Result<Verdict, AgentError> {
        let code = match clean_generated_code(reply) {
            Ok(code) => code,
            Err(ValidateError::InvalidGenerated { issue, .. }) => {
                return Ok(Verdict::Retry(format!(
                    "Your generated code was not valid python!\n{issue}\nPlease regenerate valid python code only."
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let statements = extract_imports(&code);
        let (resolvable, unresolvable) = filter_imports(&statements, &self.index);
        if !unresolvable.is_empty() {
            return Ok(Verdict::Retry(format!(
                "Your test suite references imports that are not available in the execution environment:\n{}\n\
                 Please regenerate your tests using only available modules.",
                unresolvable.join("\n")
            )));
        }

        let tests = extract_tests(&code, DEFAULT_TEST_PREFIX);
        let offending = tests.iter().filter(|t| t.is_parameterized()).count();

        if offending == 0 {
            self.tests = tests;
            self.record_imports(resolvable);
            return Ok(Verdict::Accept(code));
        }

        // Fixtures are not allowed in generated tests.
        let whole_suite_offends = offending == tests.len();
        if whole_suite_offends || self.fixture_policy == FixturePolicy::AlwaysRegenerate {
            return Ok(Verdict::Retry(
                "Your generated pytest suite contained fixtures, which we do not allow!\n\
                 Please regenerate your tests so they are fixture-free."
                    .to_string(),
            ));
        }

        let kept: Vec<TestCase> = tests.into_iter().filter(|t| !t.is_parameterized()).collect();
        let sources: Vec<String> = kept.iter().map(|t| t.source.clone()).collect();
        self.record_imports(resolvable);
        let recompiled = compile_tests(&sources, &[], Some(&self.imports))?;
        self.tests = kept;
        Ok(Verdict::Accept(recompiled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{SymbolTable, Task};
    use pretty_assertions::assert_eq;

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

    fn designer() -> TestDesigner {
        TestDesigner::new(
            context(),
            "watch out for n == 0".to_string(),
            Arc::new(ModuleIndex::default()),
        )
    }

    #[test]
    fn user_prompt_carries_the_rendered_stub() {
        let prompt = designer().user_prompt();
        assert!(prompt.contains("def factorial(n: int) -> int:"));
        assert!(prompt.contains("assert factorial(5) == 120"));
    }

    #[test]
    fn system_prompt_embeds_navigator_reasoning() {
        let prompt = designer().system_prompt();
        assert!(prompt.contains("Your role is 'Test Designer.'"));
        assert!(prompt.contains("watch out for n == 0"));
        assert!(prompt.contains("passed directly to a python interpreter"));
    }

    #[test]
    fn clean_suite_is_accepted_and_retained() {
        let mut designer = designer();
        let reply = "```python\nimport pytest\n\ndef test_zero():\n    assert factorial(0) == 1\n```";
        let verdict = designer.validate(reply).unwrap();
        match verdict {
            Verdict::Accept(code) => assert!(code.contains("def test_zero():")),
            other => panic!("expected accept, got {other:?}"),
        }
        assert_eq!(designer.tests().len(), 1);
        assert_eq!(designer.tests()[0].name, "test_zero");
        assert_eq!(designer.imports(), &["import pytest".to_string()]);
    }

    #[test]
    fn unresolvable_import_triggers_retry() {
        let mut designer = designer();
        let reply = "```python\nimport numpy\n\ndef test_zero():\n    assert factorial(0) == 1\n```";
        match designer.validate(reply).unwrap() {
            Verdict::Retry(message) => {
                assert!(message.contains("import numpy"));
                assert!(message.contains("not available"));
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn offending_subset_is_stripped() {
        let mut designer = designer();
        let reply = "```python\n\
            def test_zero():\n    assert factorial(0) == 1\n\n\
            def test_with_fixture(tmp_path):\n    assert factorial(1) == 1\n```";
        match designer.validate(reply).unwrap() {
            Verdict::Accept(code) => {
                assert!(code.contains("def test_zero():"));
                assert!(!code.contains("test_with_fixture"));
                assert!(code.contains("import pytest"));
            }
            other => panic!("expected accept, got {other:?}"),
        }
        assert_eq!(designer.tests().len(), 1);
    }

    #[test]
    fn fully_offending_suite_triggers_regeneration() {
        let mut designer = designer();
        let reply = "```python\ndef test_with_fixture(tmp_path):\n    assert factorial(1) == 1\n```";
        match designer.validate(reply).unwrap() {
            Verdict::Retry(message) => assert!(message.contains("fixtures")),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn always_regenerate_rejects_any_fixture() {
        let mut designer = designer().with_fixture_policy(FixturePolicy::AlwaysRegenerate);
        let reply = "```python\n\
            def test_zero():\n    assert factorial(0) == 1\n\n\
            def test_with_fixture(tmp_path):\n    assert factorial(1) == 1\n```";
        match designer.validate(reply).unwrap() {
            Verdict::Retry(message) => assert!(message.contains("fixtures")),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn non_code_reply_triggers_retry() {
        let mut designer = designer();
        match designer.validate("Sure! Here is my plan for the tests.").unwrap() {
            Verdict::Retry(message) => assert!(message.contains("not valid python")),
            other => panic!("expected retry, got {other:?}"),
        }
    }
}
