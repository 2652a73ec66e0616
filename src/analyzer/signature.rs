//! Signature extraction from task docstrings.
//!
//! A task may annotate itself with a delimited block describing the
//! functions it expects to be generated:
//!
//! ```text
//! /gen
//! factorial:
//!     - doc: An efficient implementation of the factorial function.
//!     - args:
//!         - input: int
//!     - returns: int
//! /end_gen
//! ```
//!
//! The block body is YAML. Parsing is tolerant: a malformed or absent block
//! yields an empty result, never an error.

use std::sync::LazyLock;

use regex::Regex;

static GEN_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)/gen(.*?)/end_gen").expect("gen block pattern"));

/// Structured signature for one generation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnSignature {
    pub name: String,
    /// One-line natural language description.
    pub doc: Option<String>,
    /// Ordered (name, type) argument pairs.
    pub args: Vec<(String, String)>,
    /// Return type annotation; `...` when unspecified.
    pub returns: Option<String>,
}

impl FnSignature {
    /// Render the canonical stub header for this target.
    ///
    /// Deterministic: same signature in, same text out, so prompts built
    /// from stubs are reproducible.
    pub fn render(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|(name, ty)| format!("{name}: {ty}"))
            .collect::<Vec<_>>()
            .join(", ");
        let returns = self.returns.as_deref().unwrap_or("...");

        let mut stub = format!("def {}({}) -> {}:", self.name, args, returns);
        if let Some(doc) = &self.doc {
            stub.push_str(&format!("\n    \"\"\"{doc}\"\"\""));
        }
        stub.push_str("\n    ...");
        stub
    }
}

/// Extract per-function signatures from a task docstring.
///
/// Returns targets in block order. Anything that does not match the expected
/// shape is skipped rather than reported.
pub fn find_signatures(doc: &str) -> Vec<FnSignature> {
    let Some(captures) = GEN_BLOCK.captures(doc) else {
        return Vec::new();
    };
    let body = dedent(&captures[1]);

    let Ok(parsed) = serde_yaml::from_str::<serde_yaml::Value>(&body) else {
        return Vec::new();
    };
    let Some(mapping) = parsed.as_mapping() else {
        return Vec::new();
    };

    let mut signatures = Vec::new();
    for (key, value) in mapping {
        let Some(name) = key.as_str() else { continue };
        let Some(fields) = flatten_entries(value) else {
            continue;
        };

        let doc = fields
            .iter()
            .find(|(k, _)| k == "doc")
            .and_then(|(_, v)| v.as_str())
            .map(|s| s.to_string());
        let returns = fields
            .iter()
            .find(|(k, _)| k == "returns")
            .and_then(|(_, v)| yaml_scalar(v));

        let mut args = Vec::new();
        if let Some((_, args_value)) = fields.iter().find(|(k, _)| k == "args") {
            let Some(seq) = args_value.as_sequence() else {
                continue;
            };
            for entry in seq {
                let Some(pair) = entry.as_mapping().and_then(|m| m.iter().next()) else {
                    continue;
                };
                if let (Some(arg), Some(ty)) = (pair.0.as_str(), yaml_scalar(pair.1)) {
                    args.push((arg.to_string(), ty));
                }
            }
        }

        signatures.push(FnSignature {
            name: name.to_string(),
            doc,
            args,
            returns,
        });
    }
    signatures
}

/// The block value is a sequence of single-key mappings; flatten it into
/// (key, value) pairs. `None` when the shape is something else entirely.
fn flatten_entries(value: &serde_yaml::Value) -> Option<Vec<(String, serde_yaml::Value)>> {
    let seq = value.as_sequence()?;
    let mut fields = Vec::new();
    for entry in seq {
        let mapping = entry.as_mapping()?;
        for (k, v) in mapping {
            fields.push((k.as_str()?.to_string(), v.clone()));
        }
    }
    Some(fields)
}

/// Scalar-to-string that also tolerates bare type names YAML reads as
/// non-strings (e.g. a plain `int` stays a string, but `...` does not).
fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strip the common leading indentation docstrings carry.
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| if l.len() >= indent { &l[indent..] } else { l })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FACTORIAL_DOC: &str = r#"
    /gen
    factorial:
        - doc: An efficient implementation of the factorial function.
        - args:
            - input: int
        - returns: int
    /end_gen
    "#;

    #[test]
    fn extracts_factorial_signature() {
        let sigs = find_signatures(FACTORIAL_DOC);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].name, "factorial");
        assert_eq!(sigs[0].args, vec![("input".to_string(), "int".to_string())]);
        assert_eq!(sigs[0].returns.as_deref(), Some("int"));
    }

    #[test]
    fn renders_canonical_stub() {
        let sigs = find_signatures(FACTORIAL_DOC);
        assert_eq!(
            sigs[0].render(),
            "def factorial(input: int) -> int:\n    \
             \"\"\"An efficient implementation of the factorial function.\"\"\"\n    ..."
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = find_signatures(FACTORIAL_DOC)[0].render();
        let b = find_signatures(FACTORIAL_DOC)[0].render();
        assert_eq!(a, b);
    }

    #[test]
    fn absent_block_yields_empty() {
        assert!(find_signatures("just a docstring").is_empty());
        assert!(find_signatures("").is_empty());
    }

    #[test]
    fn malformed_yaml_yields_empty_not_error() {
        let doc = "/gen\n  ][ not yaml: [unclosed\n/end_gen";
        assert!(find_signatures(doc).is_empty());
    }

    #[test]
    fn missing_return_renders_ellipsis() {
        let doc = "/gen\nthing:\n    - doc: A thing.\n    - args:\n        - x: str\n/end_gen";
        let sigs = find_signatures(doc);
        assert_eq!(sigs[0].render(), "def thing(x: str) -> ...:\n    \"\"\"A thing.\"\"\"\n    ...");
    }

    #[test]
    fn multiple_targets_keep_block_order() {
        let doc = "\
/gen
beta:
    - doc: Second alphabetically, first in the block.
    - args:
        - x: int
alpha:
    - doc: First alphabetically.
    - args:
        - y: int
/end_gen";
        let names: Vec<_> = find_signatures(doc).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["beta".to_string(), "alpha".to_string()]);
    }
}
