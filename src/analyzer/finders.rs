//! Specialized finders composed on the generic walker.

use std::collections::HashSet;

use tree_sitter::{Node, Tree};

use crate::analyzer::walker::{node_text, visit_nodes};

/// Names treated as always visible. Python resolves these from the builtins
/// namespace, which the explicit symbol table would otherwise miss.
const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "callable", "chr", "dict", "divmod", "enumerate",
    "filter", "float", "format", "frozenset", "getattr", "hasattr", "hash", "hex", "int",
    "isinstance", "issubclass", "iter", "len", "list", "map", "max", "min", "next", "object",
    "oct", "ord", "pow", "print", "range", "repr", "reversed", "round", "set", "setattr",
    "slice", "sorted", "str", "sum", "tuple", "type", "zip", "Exception", "ValueError",
    "TypeError", "KeyError", "IndexError", "ZeroDivisionError", "AssertionError",
    "NotImplementedError", "StopIteration", "True", "False", "None", "self",
];

/// Explicit table of names visible to a task at the point it was captured.
///
/// Replaces the original system's caller-frame introspection: whoever builds
/// the context says what is in scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: HashSet<String>,
}

impl SymbolTable {
    /// Empty table; even builtins count as undefined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with Python builtins.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table
            .names
            .extend(PYTHON_BUILTINS.iter().map(|s| s.to_string()));
        table
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

impl Extend<String> for SymbolTable {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.names.extend(iter);
    }
}

/// Finds identifiers referenced in a tree that are absent from the symbol
/// table and not bound anywhere within the tree itself.
pub struct UndefinedFinder;

impl UndefinedFinder {
    /// Scan a parsed source for undefined identifiers, in discovery order.
    pub fn scan(defined: &SymbolTable, tree: &Tree, source: &str) -> Vec<String> {
        let root = tree.root_node();

        // First pass: every name the source binds itself.
        let mut bound: HashSet<String> = HashSet::new();
        visit_nodes(root, &mut |node| {
            collect_bindings(node, source, &mut bound);
        });

        // Second pass: referenced identifiers not bound and not in scope.
        let mut seen: HashSet<String> = HashSet::new();
        let mut undefined: Vec<String> = Vec::new();
        visit_nodes(root, &mut |node| {
            if node.kind() != "identifier" || !is_reference(node) {
                return;
            }
            let name = node_text(node, source);
            if name.is_empty()
                || defined.contains(name)
                || bound.contains(name)
                || seen.contains(name)
            {
                return;
            }
            seen.insert(name.to_string());
            undefined.push(name.to_string());
        });

        undefined
    }
}

/// Record what a node binds, if anything.
fn collect_bindings(node: Node<'_>, source: &str, bound: &mut HashSet<String>) {
    match node.kind() {
        "function_definition" | "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                bound.insert(node_text(name, source).to_string());
            }
        }
        "assignment" | "augmented_assignment" | "for_statement" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_identifiers(left, source, bound);
            }
        }
        "named_expression" => {
            if let Some(name) = node.child_by_field_name("name") {
                bound.insert(node_text(name, source).to_string());
            }
        }
        "as_pattern" => {
            if let Some(alias) = node.child_by_field_name("alias") {
                collect_identifiers(alias, source, bound);
            }
        }
        "parameters" | "lambda_parameters" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if let Some(name) = parameter_name(child, source) {
                    bound.insert(name);
                }
            }
        }
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                bound.insert(imported_binding(name, source));
            }
        }
        "import_from_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                bound.insert(imported_binding(name, source));
            }
        }
        "global_statement" | "nonlocal_statement" => {
            collect_identifiers(node, source, bound);
        }
        _ => {}
    }
}

/// All identifier leaves under a node.
fn collect_identifiers(node: Node<'_>, source: &str, out: &mut HashSet<String>) {
    visit_nodes(node, &mut |n| {
        if n.kind() == "identifier" {
            out.insert(node_text(n, source).to_string());
        }
    });
}

/// Name an `import`/`from … import` clause binds in the importing scope.
///
/// `import a.b` binds `a`; `import a.b as c` and `from m import x as c`
/// bind `c`; `from m import x` binds `x`.
fn imported_binding(name_node: Node<'_>, source: &str) -> String {
    match name_node.kind() {
        "aliased_import" => name_node
            .child_by_field_name("alias")
            .map(|a| node_text(a, source).to_string())
            .unwrap_or_default(),
        "dotted_name" => node_text(name_node, source)
            .split('.')
            .next()
            .unwrap_or("")
            .to_string(),
        _ => node_text(name_node, source).to_string(),
    }
}

/// Whether an identifier node is a plain reference rather than an attribute
/// name, keyword-argument name, or part of an import path.
fn is_reference(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return true;
    };
    match parent.kind() {
        "attribute" => parent
            .child_by_field_name("attribute")
            .is_none_or(|attr| attr.id() != node.id()),
        "keyword_argument" => parent
            .child_by_field_name("name")
            .is_none_or(|name| name.id() != node.id()),
        "dotted_name" | "aliased_import" | "relative_import" => false,
        "function_definition" | "class_definition" => parent
            .child_by_field_name("name")
            .is_none_or(|name| name.id() != node.id()),
        _ => true,
    }
}

/// One test-shaped function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Function name (including the prefix).
    pub name: String,
    /// Exact source of the definition.
    pub source: String,
    /// Declared parameters without defaults, minus `self`. Any entry here
    /// marks the test as parameterized/fixture-style.
    pub params: Vec<String>,
    /// Default-valued keyword parameters.
    pub default_params: Vec<String>,
}

impl TestCase {
    /// Whether the test requests fixtures via plain parameters.
    pub fn is_parameterized(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Locate function definitions whose name matches `prefix`, in source order.
pub fn find_tests(tree: &Tree, source: &str, prefix: &str) -> Vec<TestCase> {
    let mut tests = Vec::new();
    visit_nodes(tree.root_node(), &mut |node| {
        if node.kind() != "function_definition" {
            return;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, source);
        if !name.starts_with(prefix) {
            return;
        }

        let mut params = Vec::new();
        let mut default_params = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for child in parameters.named_children(&mut cursor) {
                match child.kind() {
                    "default_parameter" | "typed_default_parameter" => {
                        if let Some(n) = child.child_by_field_name("name") {
                            default_params.push(node_text(n, source).to_string());
                        }
                    }
                    _ => {
                        if let Some(n) = parameter_name(child, source) {
                            if n != "self" {
                                params.push(n);
                            }
                        }
                    }
                }
            }
        }

        tests.push(TestCase {
            name: name.to_string(),
            source: node_text(node, source).to_string(),
            params,
            default_params,
        });
    });
    tests
}

/// Plain name of a parameter node, whatever its shape.
fn parameter_name(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "default_parameter" | "typed_default_parameter" => node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string()),
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            let mut found = None;
            visit_nodes(node, &mut |n| {
                if found.is_none() && n.kind() == "identifier" {
                    found = Some(node_text(n, source).to_string());
                }
            });
            found
        }
        _ => None,
    }
}

/// Exact source text of every import statement, in source order.
pub fn find_imports(tree: &Tree, source: &str) -> Vec<String> {
    let mut imports = Vec::new();
    visit_nodes(tree.root_node(), &mut |node| {
        if matches!(
            node.kind(),
            "import_statement" | "import_from_statement" | "future_import_statement"
        ) {
            imports.push(node_text(node, source).to_string());
        }
    });
    imports
}
