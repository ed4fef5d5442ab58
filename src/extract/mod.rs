//! Declaration extraction over a parsed [`SyntaxTree`].
//!
//! Two independent passes walk the same read-only tree:
//!
//! - [`extract_functions`] collects every function-like declaration.
//! - [`extract_classes`] collects class declarations with their attributes,
//!   methods, and nested classes.
//!
//! Neither pass mutates the tree or shares state, so [`extract_report`] runs
//! them side by side.

mod classes;
mod functions;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::parser::{parse_file, parse_source, ParseError};
use crate::syntax::SyntaxTree;

pub use classes::{extract_classes, extract_classes_with};
pub use functions::extract_functions;

/// Name reported for a function declaration that has no name field.
pub const ANONYMOUS_FUNCTION: &str = "<lambda>";

/// Conventional name of an instance method's first parameter.
pub const DEFAULT_SELF_NAME: &str = "self";

/// How a function relates to its surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Function,
    AsyncFunction,
    /// Immediately enclosed by a class body.
    Method,
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionKind::Function => write!(f, "function"),
            FunctionKind::AsyncFunction => write!(f, "async_function"),
            FunctionKind::Method => write!(f, "method"),
        }
    }
}

/// A function, async function, or method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    #[serde(rename = "type")]
    pub kind: FunctionKind,
    pub name: String,
    /// Raw parameter list text, including parentheses. Empty when absent.
    pub parameters: String,
    /// Raw docstring literal, quotes included.
    pub docstring: Option<String>,
    pub decorators: SmallVec<[String; 2]>,
    pub enclosing_class: Option<String>,
    pub start_byte: usize,
    pub end_byte: usize,
    /// 0-indexed start line.
    pub start_line: usize,
    /// 0-indexed end line (inclusive).
    pub end_line: usize,
    pub text: String,
}

/// A class declaration and what it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: Option<String>,
    /// Raw superclass list text, parentheses included.
    pub base_classes: Option<String>,
    /// Identifiers assigned directly in the class body, in order.
    pub attributes: Vec<String>,
    /// Properties assigned through the self parameter inside methods.
    pub instance_attributes: BTreeSet<String>,
    pub methods: Vec<String>,
    pub inner_classes: Vec<ClassRecord>,
    pub parent_class: Option<String>,
    /// 0-indexed start line.
    pub start_line: usize,
    /// 0-indexed end line (inclusive).
    pub end_line: usize,
    pub text: String,
}

impl ClassRecord {
    /// Count this class and every class nested under it.
    pub fn class_count(&self) -> usize {
        1 + self
            .inner_classes
            .iter()
            .map(ClassRecord::class_count)
            .sum::<usize>()
    }

    /// Find a directly nested class by name.
    pub fn inner(&self, name: &str) -> Option<&ClassRecord> {
        self.inner_classes
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }
}

/// Options for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Identifier treated as the bound instance in methods.
    pub self_name: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            self_name: DEFAULT_SELF_NAME.to_string(),
        }
    }
}

impl ExtractOptions {
    pub fn with_self_name(name: impl Into<String>) -> Self {
        Self {
            self_name: name.into(),
        }
    }
}

/// Everything extracted from one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub lines: usize,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
}

impl SourceReport {
    /// Total classes including nested ones.
    pub fn class_count(&self) -> usize {
        self.classes.iter().map(ClassRecord::class_count).sum()
    }

    pub fn method_count(&self) -> usize {
        self.functions
            .iter()
            .filter(|f| f.kind == FunctionKind::Method)
            .count()
    }
}

/// Run both extractors over a tree.
pub fn extract_report(tree: &SyntaxTree, options: &ExtractOptions) -> SourceReport {
    let root = tree.root();
    let (functions, classes) = rayon::join(
        || extract_functions(root),
        || extract_classes_with(root, options),
    );

    SourceReport {
        path: None,
        lines: tree.line_count(),
        functions,
        classes,
    }
}

/// Parse in-memory source and extract a report.
pub fn extract_source(source: &[u8], options: &ExtractOptions) -> Result<SourceReport, ParseError> {
    let tree = parse_source(source)?;
    Ok(extract_report(&tree, options))
}

/// Parse a file and extract a report tagged with its path.
pub fn extract_file(path: &Path, options: &ExtractOptions) -> Result<SourceReport, ParseError> {
    let tree = parse_file(path)?;
    let mut report = extract_report(&tree, options);
    report.path = Some(path.to_path_buf());
    Ok(report)
}
