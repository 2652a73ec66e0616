//! Task source analysis.
//!
//! Resolves which symbols a task needs generated: a generic tree walker over
//! tree-sitter Python trees, specialized finders composed on it, signature
//! extraction from the task docstring, and the [`CodeContext`] build step
//! that ties them together.

mod context;
mod finders;
mod signature;
pub mod walker;

pub use context::{CodeContext, Task};
pub use finders::{find_imports, find_tests, SymbolTable, TestCase, UndefinedFinder};
pub use signature::{find_signatures, FnSignature};
