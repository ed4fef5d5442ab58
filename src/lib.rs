//! declmap - Extract function and class declarations from Python source.
//!
//! declmap parses Python with tree-sitter, walks the concrete syntax tree,
//! and reports every function (with decorators, docstring, and class binding)
//! and every class (with attributes, instance attributes, methods, and
//! nested classes).
//!
//! # Quick Start
//!
//! ```no_run
//! use declmap::extract::{extract_source, ExtractOptions};
//!
//! let code = b"class A:\n    def __init__(self):\n        self.y = 2\n";
//! let report = extract_source(code, &ExtractOptions::default()).unwrap();
//!
//! assert_eq!(report.classes[0].methods, vec!["__init__"]);
//! assert_eq!(report.functions[0].enclosing_class.as_deref(), Some("A"));
//! ```
//!
//! # Modules
//!
//! - [`syntax`] - Immutable syntax tree and node kinds
//! - [`parser`] - tree-sitter parsing and normalization
//! - [`extract`] - Function and class extraction
//! - [`walker`] - Source discovery with gitignore support
//! - [`builder`] - Fluent API for multi-file extraction
//! - [`output`] - Text and JSON rendering
//! - [`config`] - Layered configuration
//! - [`logging`] - Tracing subscriber setup

pub mod syntax;
pub mod parser;
pub mod extract;
pub mod errors;
pub mod walker;
pub mod output;
pub mod builder;
pub mod config;
pub mod logging;

// Re-export key types at crate root for convenience
pub use builder::{Declmap, DeclmapResult};
pub use config::{ConfigError, DeclmapConfig};
pub use errors::DeclmapError;
pub use extract::{
    extract_classes, extract_functions, ClassRecord, ExtractOptions, FunctionKind,
    FunctionRecord, SourceReport,
};
pub use output::OutputError;
pub use parser::{parse_file, parse_source, ParseError};
pub use syntax::{NodeKind, SyntaxNode, SyntaxTree};
pub use walker::WalkError;
