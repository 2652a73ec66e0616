//! Import classification against an explicit module index.
//!
//! The original system asked the live interpreter whether each module was
//! importable. Here the index is a read-only snapshot passed in explicitly,
//! which makes [`filter_imports`] a pure function and safe to share across
//! concurrent pipelines.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use crate::analyzer::walker::{node_text, parse_python, syntax_issue, visit_nodes};

/// Standard-library modules assumed importable by default, plus `pytest`.
/// Attribute sets are left open for these: any `from m import x` resolves.
const DEFAULT_MODULES: &[&str] = &[
    "__future__",
    "abc",
    "bisect",
    "collections",
    "copy",
    "dataclasses",
    "datetime",
    "decimal",
    "enum",
    "fractions",
    "functools",
    "heapq",
    "io",
    "itertools",
    "json",
    "math",
    "operator",
    "os",
    "pathlib",
    "pytest",
    "random",
    "re",
    "statistics",
    "string",
    "sys",
    "textwrap",
    "time",
    "typing",
    "unittest",
];

/// Read-only snapshot of resolvable modules.
///
/// Each entry maps a module name to its known attributes: `None` means the
/// attribute set is open (any selective import resolves), `Some` restricts
/// selective imports to the listed names.
#[derive(Debug, Clone)]
pub struct ModuleIndex {
    modules: HashMap<String, Option<HashSet<String>>>,
}

impl ModuleIndex {
    /// Index with nothing resolvable.
    pub fn empty() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module; `attrs` restricts selective imports when given.
    pub fn with_module(mut self, name: &str, attrs: Option<&[&str]>) -> Self {
        self.modules.insert(
            name.to_string(),
            attrs.map(|a| a.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    fn entry(&self, name: &str) -> Option<&Option<HashSet<String>>> {
        self.modules.get(name)
    }

    /// Whether a possibly dotted module path resolves.
    pub fn resolves_module(&self, dotted: &str) -> bool {
        if self.entry(dotted).is_some() {
            return true;
        }
        let Some((root, rest)) = dotted.split_once('.') else {
            return false;
        };
        match self.entry(root) {
            Some(None) => true,
            Some(Some(attrs)) => {
                let first = rest.split('.').next().unwrap_or(rest);
                attrs.contains(first)
            }
            None => false,
        }
    }

    /// Whether `from module import attr` resolves.
    pub fn resolves_attr(&self, module: &str, attr: &str) -> bool {
        if !self.resolves_module(module) {
            return false;
        }
        match self.entry(module) {
            Some(Some(attrs)) => attrs.contains(attr),
            // Open attribute set, or the module resolved through its root.
            Some(None) | None => true,
        }
    }
}

impl Default for ModuleIndex {
    fn default() -> Self {
        let mut modules = HashMap::new();
        for name in DEFAULT_MODULES {
            modules.insert(name.to_string(), None);
        }
        Self { modules }
    }
}

/// Partition import statements into (resolvable, unresolvable).
///
/// Pure function of the statement set and the index snapshot: identical
/// inputs always yield the identical partition. Syntactically broken
/// statements are unresolvable. Both lists come back sorted.
pub fn filter_imports(statements: &[String], index: &ModuleIndex) -> (Vec<String>, Vec<String>) {
    let mut resolvable: Vec<String> = Vec::new();
    let mut unresolvable: Vec<String> = Vec::new();

    for statement in statements {
        match statement_resolves(statement, index) {
            Some(true) => resolvable.push(statement.clone()),
            Some(false) => unresolvable.push(statement.clone()),
            // Valid Python but not an import statement: not our concern.
            None => {}
        }
    }

    resolvable.sort();
    resolvable.dedup();
    unresolvable.sort();
    unresolvable.dedup();
    (resolvable, unresolvable)
}

/// `Some(true|false)` for import statements, `None` for non-imports.
fn statement_resolves(statement: &str, index: &ModuleIndex) -> Option<bool> {
    let Ok(tree) = parse_python(statement) else {
        return Some(false);
    };
    if syntax_issue(&tree, statement).is_some() {
        return Some(false);
    }

    let mut verdict: Option<bool> = None;
    visit_nodes(tree.root_node(), &mut |node| {
        let node_ok = match node.kind() {
            "import_statement" => import_resolves(node, statement, index),
            "import_from_statement" => import_from_resolves(node, statement, index),
            "future_import_statement" => index.resolves_module("__future__"),
            _ => return,
        };
        verdict = Some(verdict.unwrap_or(true) && node_ok);
    });
    verdict
}

/// `import a.b, c as d`: every named module must resolve.
fn import_resolves(node: Node<'_>, source: &str, index: &ModuleIndex) -> bool {
    let mut cursor = node.walk();
    let mut names = node.children_by_field_name("name", &mut cursor).peekable();
    if names.peek().is_none() {
        return false;
    }
    names.all(|name| match name.kind() {
        "dotted_name" => index.resolves_module(node_text(name, source)),
        "aliased_import" => name
            .child_by_field_name("name")
            .is_some_and(|inner| index.resolves_module(node_text(inner, source))),
        _ => false,
    })
}

/// `from m import a, b as c`: the module and every named attribute must
/// resolve. Relative imports have no package context here and never resolve.
fn import_from_resolves(node: Node<'_>, source: &str, index: &ModuleIndex) -> bool {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return false;
    };
    if module_node.kind() == "relative_import" {
        return false;
    }
    let module = node_text(module_node, source);

    let mut cursor = node.walk();
    let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
    if names.is_empty() {
        // `from m import *`
        return index.resolves_module(module);
    }

    names.iter().all(|name| {
        let attr_node = match name.kind() {
            "aliased_import" => name.child_by_field_name("name"),
            _ => Some(*name),
        };
        attr_node.is_some_and(|n| index.resolves_attr(module, node_text(n, source)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn owned(statements: &[&str]) -> Vec<String> {
        statements.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partitions_known_and_unknown_modules() {
        let index = ModuleIndex::default();
        let (ok, bad) = filter_imports(
            &owned(&["import math", "import torch", "import pytest"]),
            &index,
        );
        assert_eq!(ok, owned(&["import math", "import pytest"]));
        assert_eq!(bad, owned(&["import torch"]));
    }

    #[test]
    fn selective_import_of_missing_attribute_is_unresolvable() {
        let index = ModuleIndex::empty().with_module("math", Some(&["sqrt", "floor"]));
        let (ok, bad) = filter_imports(
            &owned(&["from math import sqrt", "from math import nope"]),
            &index,
        );
        assert_eq!(ok, owned(&["from math import sqrt"]));
        assert_eq!(bad, owned(&["from math import nope"]));
    }

    #[test]
    fn broken_statement_is_unresolvable() {
        let (ok, bad) = filter_imports(&owned(&["import ((("]), &ModuleIndex::default());
        assert!(ok.is_empty());
        assert_eq!(bad, owned(&["import ((("]));
    }

    #[test]
    fn aliased_and_dotted_forms_resolve() {
        let index = ModuleIndex::default();
        let (ok, bad) = filter_imports(
            &owned(&[
                "import os.path",
                "import itertools as it",
                "from collections import OrderedDict as OD",
            ]),
            &index,
        );
        assert_eq!(ok.len(), 3);
        assert!(bad.is_empty());
    }

    #[test]
    fn relative_imports_never_resolve() {
        let (ok, bad) = filter_imports(&owned(&["from . import thing"]), &ModuleIndex::default());
        assert!(ok.is_empty());
        assert_eq!(bad, owned(&["from . import thing"]));
    }

    #[test]
    fn filter_is_pure_for_a_fixed_snapshot() {
        let index = ModuleIndex::default();
        let input = owned(&["import math", "import torch", "from sys import argv"]);
        let first = filter_imports(&input, &index);
        let second = filter_imports(&input, &index);
        assert_eq!(first, second);
    }
}
