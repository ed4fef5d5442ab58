//! Tree provider: parses Python source with tree-sitter and lowers the
//! result into a [`SyntaxTree`].
//!
//! Lowering decodes grammar kinds into [`NodeKind`] once and reshapes a few
//! tree-sitter-python constructs into declaration-level form:
//!
//! - `function_definition` carrying an `async` token becomes
//!   [`NodeKind::AsyncFunctionDefinition`].
//! - `decorated_definition` disappears; its decorators become the leading
//!   children of the wrapped definition, whose range widens to cover them.
//! - An `expression_statement` holding a single `assignment` is replaced by
//!   that assignment. Assignments with a `type` field are
//!   [`NodeKind::AnnotatedAssignment`].
//! - `attribute` becomes [`NodeKind::MemberAccess`] with `object` and
//!   `property` fields; a class's `superclasses` field becomes `base`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

use crate::syntax::{Field, NodeId, NodeKind, SyntaxTree, TreeBuilder};

/// Errors raised while obtaining a tree for a source unit.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("source not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("python parser unavailable: {reason}")]
    ParseUnavailable { reason: String },
}

// Thread-local parser caching to avoid re-initialization overhead.
thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn init_python_parser() -> Result<Parser, ParseError> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError::ParseUnavailable {
            reason: e.to_string(),
        })?;
    Ok(p)
}

/// Execute a function with a cached Python parser.
fn with_python_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut Parser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(init_python_parser()?);
        }

        let parser = slot.as_mut().ok_or_else(|| ParseError::ParseUnavailable {
            reason: "parser slot empty after initialization".to_string(),
        })?;
        Ok(f(parser))
    })
}

/// Parse an in-memory source unit.
///
/// Source containing syntax errors still yields a tree; tree-sitter recovers
/// and the extractors degrade around the damaged region.
pub fn parse_source(source: &[u8]) -> Result<SyntaxTree, ParseError> {
    let tree = with_python_parser(|parser| parser.parse(source, None))?.ok_or_else(|| {
        ParseError::ParseUnavailable {
            reason: "parser returned no tree".to_string(),
        }
    })?;

    let root = tree.root_node();
    if root.has_error() {
        warn!(
            bytes = source.len(),
            "source contains syntax errors, extraction may be partial"
        );
    }

    let mut lowering = Lowering {
        builder: TreeBuilder::new(source.to_vec()),
    };
    let root_id = lowering.lower(root);
    lowering
        .builder
        .finish(root_id)
        .ok_or_else(|| ParseError::ParseUnavailable {
            reason: "lowered tree has dangling node references".to_string(),
        })
}

/// Read and parse a source file.
pub fn parse_file(path: &Path) -> Result<SyntaxTree, ParseError> {
    if !path.exists() {
        return Err(ParseError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let source = std::fs::read(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let tree = parse_source(&source)?;
    debug!(path = %path.display(), nodes = tree.len(), "parsed source file");
    Ok(tree)
}

struct Lowering {
    builder: TreeBuilder,
}

/// A node whose children are still being lowered.
struct Frame<'tree> {
    node: Node<'tree>,
    kind: NodeKind,
    /// Field label in the parent.
    label: Option<Field>,
    /// Start position when decorators widen the node.
    start: Option<(usize, usize)>,
    pending: std::vec::IntoIter<(Option<Field>, Node<'tree>)>,
    children: Vec<(Option<Field>, NodeId)>,
}

impl<'tree> Frame<'tree> {
    /// Open a frame for `node`, applying the declaration-level reshaping.
    fn open(node: Node<'tree>, label: Option<Field>) -> Self {
        match node.kind() {
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(definition) => {
                    let mut cursor = node.walk();
                    let leading: Vec<_> = node
                        .children(&mut cursor)
                        .filter(|child| child.id() != definition.id())
                        .collect();
                    let start = (node.start_byte(), node.start_position().row);
                    Self::with_leading(definition, leading, Some(start), label)
                }
                None => Self::with_leading(node, Vec::new(), None, label),
            },
            "expression_statement" => match sole_assignment(node) {
                Some(assignment) => Self::with_leading(assignment, Vec::new(), None, label),
                None => Self::with_leading(node, Vec::new(), None, label),
            },
            _ => Self::with_leading(node, Vec::new(), None, label),
        }
    }

    fn with_leading(
        node: Node<'tree>,
        leading: Vec<Node<'tree>>,
        start: Option<(usize, usize)>,
        label: Option<Field>,
    ) -> Self {
        let kind = classify(node);
        let mut pending: Vec<_> = leading.into_iter().map(|n| (None, n)).collect();

        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let field = cursor.field_name().and_then(|name| map_field(kind, name));
                pending.push((field, cursor.node()));
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        Self {
            node,
            kind,
            label,
            start,
            children: Vec::with_capacity(pending.len()),
            pending: pending.into_iter(),
        }
    }
}

impl Lowering {
    /// Lower `root` and everything under it, children before parents.
    ///
    /// Expression chains can nest thousands of levels deep, so the walk
    /// keeps its own stack instead of recursing.
    fn lower(&mut self, root: Node) -> NodeId {
        let mut stack: Vec<Frame> = Vec::new();
        let mut current = Frame::open(root, None);

        loop {
            if let Some((label, child)) = current.pending.next() {
                let parent = std::mem::replace(&mut current, Frame::open(child, label));
                stack.push(parent);
                continue;
            }

            let label = current.label;
            let id = self.build(current);
            match stack.pop() {
                Some(mut parent) => {
                    parent.children.push((label, id));
                    current = parent;
                }
                None => return id,
            }
        }
    }

    fn build(&mut self, frame: Frame) -> NodeId {
        let node = frame.node;
        let (start_byte, start_line) = frame
            .start
            .unwrap_or((node.start_byte(), node.start_position().row));
        self.builder.node(
            frame.kind,
            start_byte..node.end_byte(),
            start_line,
            node.end_position().row,
            frame.children,
        )
    }
}

fn classify(node: Node) -> NodeKind {
    match node.kind() {
        "module" => NodeKind::Module,
        "function_definition" => {
            let is_async = node
                .children(&mut node.walk())
                .any(|c| c.kind() == "async");
            if is_async {
                NodeKind::AsyncFunctionDefinition
            } else {
                NodeKind::FunctionDefinition
            }
        }
        "class_definition" => NodeKind::ClassDefinition,
        "block" => NodeKind::Block,
        "assignment" => {
            if node.child_by_field_name("type").is_some() {
                NodeKind::AnnotatedAssignment
            } else {
                NodeKind::Assignment
            }
        }
        "decorator" => NodeKind::Decorator,
        "identifier" => NodeKind::Identifier,
        "attribute" => NodeKind::MemberAccess,
        "expression_statement" => NodeKind::ExpressionStatement,
        "string" => NodeKind::String,
        other => NodeKind::Other(other),
    }
}

fn map_field(parent: NodeKind, name: &str) -> Option<Field> {
    match (parent, name) {
        (_, "name") => Some(Field::Name),
        (_, "parameters") => Some(Field::Parameters),
        (NodeKind::ClassDefinition, "superclasses") => Some(Field::Base),
        (_, "left") => Some(Field::Left),
        (_, "object") => Some(Field::Object),
        (NodeKind::MemberAccess, "attribute") => Some(Field::Property),
        _ => None,
    }
}

/// The assignment inside `expression_statement`, when it is the only named child.
fn sole_assignment(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let mut named = node.named_children(&mut cursor);
    let first = named.next()?;
    if named.next().is_some() || first.kind() != "assignment" {
        return None;
    }
    Some(first)
}
