//! Validation and assembly of generated Python text.
//!
//! Syntax-checks model output, classifies imports, locates test-shaped
//! definitions, and reassembles runnable scripts.

mod imports;

pub use imports::{filter_imports, ModuleIndex};

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Tree;

use crate::analyzer::walker::{parse_python, syntax_issue};
use crate::analyzer::{find_imports, find_tests, TestCase};
use crate::error::{SyntaxIssue, ValidateError};

/// Test function name prefix recognized by default.
pub const DEFAULT_TEST_PREFIX: &str = "test_";

/// Import preamble used when none is supplied.
pub const DEFAULT_IMPORTS: &[&str] = &["import pytest"];

static PYTHON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```python(.*?)```").expect("fence pattern"));

/// Attempt to parse a string as Python.
///
/// Ordinary syntax errors come back through the `Err` side as a located
/// issue; this never panics. The bundled grammar makes parser setup
/// infallible in practice, so a setup failure also surfaces as an issue.
pub fn check_syntax(code: &str) -> Result<Tree, SyntaxIssue> {
    let tree = parse_python(code).map_err(|e| SyntaxIssue {
        line: 1,
        column: 0,
        message: e.to_string(),
    })?;
    match syntax_issue(&tree, code) {
        None => Ok(tree),
        Some(issue) => Err(issue),
    }
}

/// Exact source text of every import statement in `code`, best effort.
pub fn extract_imports(code: &str) -> Vec<String> {
    match parse_python(code) {
        Ok(tree) => find_imports(&tree, code),
        Err(_) => Vec::new(),
    }
}

/// Ordered test definitions in `code` whose names match `prefix`,
/// best effort.
pub fn extract_tests(code: &str, prefix: &str) -> Vec<TestCase> {
    match parse_python(code) {
        Ok(tree) => find_tests(&tree, code, prefix),
        Err(_) => Vec::new(),
    }
}

/// Assemble a runnable script: import preamble, then implementation
/// fragments, then test fragments, formatted.
///
/// The fragments were individually validated, so a result that fails to
/// re-parse means assembly itself broke; that is a hard error.
pub fn compile_tests(
    tests: &[String],
    implementations: &[String],
    imports: Option<&[String]>,
) -> Result<String, ValidateError> {
    let default_imports: Vec<String> = DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect();
    let imports = imports.unwrap_or(&default_imports);

    let script = imports
        .iter()
        .chain(implementations.iter())
        .chain(tests.iter())
        .map(|s| s.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n");
    let script = format_source(&script);

    match check_syntax(&script) {
        Ok(_) => Ok(script),
        Err(issue) => Err(ValidateError::Compile { issue }),
    }
}

/// Extract code from a model reply and validate it.
///
/// Fenced ```` ```python ```` blocks are pulled out and joined when present;
/// otherwise the whole text is treated as code. Output that fails to parse
/// is a distinguished invalid-generated-code error carrying the original
/// text; valid output is formatted before returning.
pub fn clean_generated_code(text: &str) -> Result<String, ValidateError> {
    let fenced: Vec<&str> = PYTHON_FENCE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let extracted = if fenced.is_empty() {
        text.to_string()
    } else {
        fenced
            .iter()
            .map(|block| block.trim_matches('\n'))
            .collect::<Vec<_>>()
            .join("\n")
    };

    match check_syntax(&extracted) {
        Ok(_) => Ok(format_source(&extracted)),
        Err(issue) => Err(ValidateError::InvalidGenerated {
            issue,
            original: text.to_string(),
        }),
    }
}

/// Deterministic whitespace normalization.
///
/// Stands in for the out-of-scope heavyweight formatter: strips trailing
/// whitespace, collapses runs of blank lines to at most two, and guarantees
/// a single trailing newline. Never touches non-blank line content.
pub fn format_source(code: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0usize;

    for line in code.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
