//! Generic tree-walking substrate over tree-sitter Python trees.
//!
//! One walker visits every node and dispatches to a callback; the
//! specialized finders in [`super::finders`] are composed on top of it
//! instead of each owning its own traversal.

use tree_sitter::{Node, Tree};

use crate::error::{AnalyzerError, SyntaxIssue};

/// Parse a Python source string.
///
/// tree-sitter is error-tolerant: a tree is produced even for broken input,
/// with `ERROR`/`MISSING` nodes marking the damage. Use [`syntax_issue`] to
/// decide whether the source is actually valid.
pub fn parse_python(source: &str) -> Result<Tree, AnalyzerError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| AnalyzerError::ParserInit {
            reason: e.to_string(),
        })?;

    parser.parse(source, None).ok_or(AnalyzerError::ParseFailed)
}

/// Visit `node` and every descendant, calling `callback` on each.
pub fn visit_nodes(node: Node<'_>, callback: &mut dyn FnMut(Node<'_>)) {
    callback(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_nodes(child, callback);
    }
}

/// Source text covered by a node.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Locate the first syntax problem in a parsed tree, if any.
pub fn syntax_issue(tree: &Tree, source: &str) -> Option<SyntaxIssue> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let mut issue: Option<SyntaxIssue> = None;
    visit_nodes(root, &mut |node| {
        if issue.is_some() {
            return;
        }
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let snippet: String = node_text(node, source).chars().take(40).collect();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                format!("unexpected `{}`", snippet.trim())
            };
            issue = Some(SyntaxIssue {
                line: pos.row + 1,
                column: pos.column,
                message,
            });
        }
    });

    // has_error() was true, so a node-level issue must exist; fall back to
    // the root position if traversal somehow missed it.
    issue.or(Some(SyntaxIssue {
        line: 1,
        column: 0,
        message: "syntax error".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_python() {
        let tree = parse_python("def f(x):\n    return x + 1\n").unwrap();
        assert!(syntax_issue(&tree, "def f(x):\n    return x + 1\n").is_none());
    }

    #[test]
    fn flags_broken_python() {
        let src = "def function[] -> nope:\nprint(";
        let tree = parse_python(src).unwrap();
        let issue = syntax_issue(&tree, src).unwrap();
        assert!(issue.line >= 1);
    }

    #[test]
    fn visits_every_node() {
        let src = "x = 1\ny = x + 2\n";
        let tree = parse_python(src).unwrap();
        let mut count = 0usize;
        visit_nodes(tree.root_node(), &mut |_| count += 1);
        assert!(count > 5);
    }
}
