//! Prompt templates shared by the role agents.
//!
//! Rendering is deterministic: the same inputs always produce the same
//! text, so memoization and resumed conversations stay exact.

/// Brevity directive attached to every system prompt.
pub const PERFORMANCE_CRITICAL: &str = "\
Please also note that you are running in a performance-critical environment; your generated responses should be:
    * short
    * concise
    * to the point
    * high level
    * optimally useful";

/// Anti-noise directive attached to every system prompt.
pub const AVOID_PITFALLS: &str = "\
You should avoid:
    * extraneous context
    * obvious information that does not need to be clarified
    * meta-commentary on the problem";

/// Directive for roles whose output is fed to an interpreter.
pub const CODE_GENERATOR: &str = "\
IMPORTANT: Your output will be passed directly to a python interpreter.
As such, you should *only* output code; any commentary you provide should
be in the form of # python comments or docstrings.";

/// System prompt for one role.
#[derive(Debug, Clone)]
pub struct SystemTemplate {
    pub role: &'static str,
    pub description: String,
    pub extra_context: Vec<String>,
}

impl SystemTemplate {
    pub fn render(&self) -> String {
        let mut parts = vec![
            "You are a Pair Programming agent in a multi-agent environment.".to_string(),
            format!("Your role is '{}.'", self.role),
            self.description.clone(),
        ];
        parts.extend(self.extra_context.iter().cloned());
        parts.join("\n")
    }
}

/// User prompt describing a generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationPrompt {
    /// Rendered signature stubs for the code to generate.
    pub targets: Vec<String>,
    /// Task/test sources providing the acceptance constraints.
    pub tests: Vec<String>,
    /// Undefined-but-unsigned objects that likely also need generating.
    pub additional_objects: Vec<String>,
    /// Role-specific instruction appended last.
    pub command: String,
}

impl GenerationPrompt {
    pub fn render(&self) -> String {
        let mut sections = vec![
            "A user wants to generate some code. This code will need to pass a series of unit tests."
                .to_string(),
        ];

        if !self.targets.is_empty() {
            let plural = self.targets.len() > 1;
            sections.push(format!(
                "The signature{} of the code to generate {}:\n{}",
                if plural { "s" } else { "" },
                if plural { "are" } else { "is" },
                self.targets.join("\n"),
            ));
        }

        if !self.additional_objects.is_empty() {
            sections.push(format!(
                "The following code objects are not defined in the global or local context and so likely will also need to be generated:\n{}",
                self.additional_objects.join(", "),
            ));
        }

        if !self.tests.is_empty() {
            sections.push(format!(
                "The user has provided the following test(s) for this context:\n{}",
                self.tests.join("\n"),
            ));
        }

        if !self.command.is_empty() {
            sections.push(self.command.clone());
        }

        sections.join("\n")
    }
}

/// Wrap source in a python code fence for embedding in prose prompts.
pub fn fenced(code: &str) -> String {
    format!("```python\n{}\n```", code.trim_end())
}
