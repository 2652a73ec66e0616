//! Derived analysis context for one generation task.

use tree_sitter::Node;

use crate::analyzer::finders::{SymbolTable, UndefinedFinder};
use crate::analyzer::signature::find_signatures;
use crate::analyzer::walker::{node_text, parse_python, syntax_issue, visit_nodes};
use crate::error::AnalyzerError;

/// A human-authored executable specification: a function whose body is a set
/// of assertions, optionally annotated with a `/gen` signature block in its
/// docstring.
#[derive(Debug, Clone)]
pub struct Task {
    /// Literal Python source of the task function.
    pub source: String,
}

impl Task {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Analysis artifact for one task. Built once, immutable thereafter, owned
/// by the pipeline.
#[derive(Debug, Clone)]
pub struct CodeContext {
    /// Names of the functions to generate, from the signature block only.
    pub fn_names: Vec<String>,
    /// Numbered canonical stubs, one per signature target, in block order.
    pub signatures: Vec<String>,
    /// Undefined symbols with no signature: additional objects that still
    /// must be generated. Discovery order, for prompt determinism.
    pub undefined: Vec<String>,
    /// Raw task source(s).
    pub test_sources: Vec<String>,
}

impl CodeContext {
    /// Analyze a task against an explicit symbol table of names visible at
    /// the point the task was captured.
    ///
    /// An ill-formed task (unparseable source, no test function) is a
    /// construction error; the pipeline treats it as fatal and never retries.
    pub fn build(task: &Task, defined: &SymbolTable) -> Result<Self, AnalyzerError> {
        let tree = parse_python(&task.source)?;
        if let Some(issue) = syntax_issue(&tree, &task.source) {
            return Err(AnalyzerError::Syntax(issue));
        }

        let mut has_function = false;
        visit_nodes(tree.root_node(), &mut |node| {
            has_function |= node.kind() == "function_definition";
        });
        if !has_function {
            return Err(AnalyzerError::NoTestFunction);
        }

        let doc = task_docstring(&tree.root_node(), &task.source).unwrap_or_default();
        let parsed = find_signatures(&doc);

        let fn_names: Vec<String> = parsed.iter().map(|s| s.name.clone()).collect();
        let signatures: Vec<String> = parsed
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s.render()))
            .collect();

        let undefined = UndefinedFinder::scan(defined, &tree, &task.source)
            .into_iter()
            .filter(|name| !fn_names.contains(name))
            .collect();

        tracing::debug!(
            targets = fn_names.len(),
            additional = ?undefined,
            "code context built"
        );

        Ok(Self {
            fn_names,
            signatures,
            undefined,
            test_sources: vec![task.source.clone()],
        })
    }

    /// All task sources joined, for single-string prompt slots.
    pub fn test_source(&self) -> String {
        self.test_sources.join("\n")
    }
}

/// Docstring of the first function definition: the first statement of its
/// body when that statement is a bare string.
fn task_docstring(root: &Node<'_>, source: &str) -> Option<String> {
    let mut doc = None;
    visit_nodes(*root, &mut |node| {
        if doc.is_some() || node.kind() != "function_definition" {
            return;
        }
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let Some(first) = body.named_child(0) else {
            return;
        };
        if first.kind() != "expression_statement" {
            return;
        }
        let Some(inner) = first.named_child(0) else {
            return;
        };
        if inner.kind() == "string" {
            doc = Some(strip_quotes(node_text(inner, source)));
        }
    });
    doc
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(rest) = trimmed
            .strip_prefix(quote)
            .and_then(|r| r.strip_suffix(quote))
        {
            return rest.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FACTORIAL_TASK: &str = r#"
def factorial_task():
    """
    /gen
    factorial:
        - doc: An efficient implementation of the factorial function.
        - args:
            - input: int
        - returns: int
    /end_gen
    """
    assert factorial(1) == 1
    assert factorial(2) == 2
    assert factorial(3) == 6
"#;

    #[test]
    fn factorial_context_matches_expectations() {
        let task = Task::new(FACTORIAL_TASK);
        let context = CodeContext::build(&task, &SymbolTable::with_builtins()).unwrap();

        assert_eq!(context.fn_names, vec!["factorial".to_string()]);
        assert_eq!(context.signatures.len(), 1);
        assert!(context.signatures[0].starts_with("1. def factorial(input: int) -> int:"));
        assert!(context.undefined.is_empty());
    }

    #[test]
    fn unsigned_undefined_symbols_become_additional_objects() {
        let src = "\
def fib_task():
    assert fib(1) == 1
    assert fib(4) == 3
";
        let context = CodeContext::build(&Task::new(src), &SymbolTable::with_builtins()).unwrap();
        assert!(context.fn_names.is_empty());
        assert!(context.signatures.is_empty());
        assert_eq!(context.undefined, vec!["fib".to_string()]);
    }

    #[test]
    fn broken_task_source_is_a_construction_error() {
        let err = CodeContext::build(
            &Task::new("def broken(:\n  pass"),
            &SymbolTable::with_builtins(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Syntax(_)));
    }

    #[test]
    fn task_without_function_is_rejected() {
        let err =
            CodeContext::build(&Task::new("x = 1\n"), &SymbolTable::with_builtins()).unwrap_err();
        assert!(matches!(err, AnalyzerError::NoTestFunction));
    }
}
