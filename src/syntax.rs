//! Immutable concrete syntax tree consumed by the extractors.
//!
//! Nodes live in an arena owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`]. [`SyntaxNode`] is a cheap, copyable view pairing a tree with
//! one of its nodes. Kind tags are decoded into [`NodeKind`] once, when the
//! tree is built, so traversal code never dispatches on raw strings.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;

/// Node kinds the extractors distinguish.
///
/// Everything else keeps its grammar tag in [`NodeKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    FunctionDefinition,
    AsyncFunctionDefinition,
    ClassDefinition,
    Block,
    Assignment,
    AnnotatedAssignment,
    Decorator,
    Identifier,
    MemberAccess,
    ExpressionStatement,
    String,
    Other(&'static str),
}

impl NodeKind {
    /// Synchronous or asynchronous function definition.
    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDefinition | NodeKind::AsyncFunctionDefinition
        )
    }

    pub fn is_class_like(self) -> bool {
        matches!(self, NodeKind::ClassDefinition)
    }

    /// Plain or annotated assignment statement.
    pub fn is_assignment(self) -> bool {
        matches!(self, NodeKind::Assignment | NodeKind::AnnotatedAssignment)
    }

    /// Grammar-style tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::FunctionDefinition => "function_definition",
            NodeKind::AsyncFunctionDefinition => "async_function_definition",
            NodeKind::ClassDefinition => "class_definition",
            NodeKind::Block => "block",
            NodeKind::Assignment => "assignment",
            NodeKind::AnnotatedAssignment => "annotated_assignment",
            NodeKind::Decorator => "decorator",
            NodeKind::Identifier => "identifier",
            NodeKind::MemberAccess => "member_expression",
            NodeKind::ExpressionStatement => "expression_statement",
            NodeKind::String => "string",
            NodeKind::Other(kind) => kind,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named fields that label specific children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Parameters,
    Base,
    Left,
    Object,
    Property,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Parameters => "parameters",
            Field::Base => "base",
            Field::Left => "left",
            Field::Object => "object",
            Field::Property => "property",
        }
    }
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    kind: NodeKind,
    byte_range: Range<usize>,
    start_line: usize,
    end_line: usize,
    children: Vec<NodeId>,
    fields: SmallVec<[(Field, NodeId); 4]>,
}

/// A parsed source unit: the raw bytes plus an arena of nodes.
///
/// Structural equality compares bytes and every node, so two parses of the
/// same input compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    source: Vec<u8>,
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn root(&self) -> SyntaxNode<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id }
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        let newlines = bytecount::count(&self.source, b'\n');
        if self.source.last().is_some_and(|b| *b != b'\n') {
            newlines + 1
        } else {
            newlines
        }
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.data().byte_range.clone()
    }

    pub fn start_byte(&self) -> usize {
        self.data().byte_range.start
    }

    pub fn end_byte(&self) -> usize {
        self.data().byte_range.end
    }

    /// 0-indexed first line.
    pub fn start_line(&self) -> usize {
        self.data().start_line
    }

    /// 0-indexed last line (inclusive).
    pub fn end_line(&self) -> usize {
        self.data().end_line
    }

    /// Direct children in document order.
    pub fn children(
        &self,
    ) -> impl DoubleEndedIterator<Item = SyntaxNode<'t>> + ExactSizeIterator + 't {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |&id| SyntaxNode { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn first_child(&self) -> Option<SyntaxNode<'t>> {
        self.children().next()
    }

    /// First direct child of the given kind.
    pub fn child_of_kind(&self, kind: NodeKind) -> Option<SyntaxNode<'t>> {
        self.children().find(|c| c.kind() == kind)
    }

    /// Child labelled with `field`, if present.
    pub fn field(&self, field: Field) -> Option<SyntaxNode<'t>> {
        let tree = self.tree;
        self.data()
            .fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|&(_, id)| SyntaxNode { tree, id })
    }

    /// Raw source text of this node, decoded lossily.
    pub fn text(&self) -> Cow<'t, str> {
        String::from_utf8_lossy(&self.tree.source[self.data().byte_range.clone()])
    }

    /// Owned text of a field child.
    pub fn field_text(&self, field: Field) -> Option<String> {
        self.field(field).map(|n| n.text().into_owned())
    }

    fn data(&self) -> &'t NodeData {
        self.tree.data(self.id)
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxNode")
            .field("kind", &self.kind())
            .field("bytes", &self.byte_range())
            .field("lines", &(self.start_line()..=self.end_line()))
            .finish()
    }
}

/// Builds a [`SyntaxTree`] bottom-up: children are pushed before parents.
///
/// The parser uses it to lower tree-sitter output. Tests use it to shape
/// trees that no real grammar produces.
///
/// ```
/// use declmap::syntax::{Field, NodeKind, TreeBuilder};
///
/// let mut b = TreeBuilder::new("class A: pass");
/// let name = b.leaf(NodeKind::Identifier, 6..7, 0, 0);
/// let class = b.node(NodeKind::ClassDefinition, 0..13, 0, 0, [(Some(Field::Name), name)]);
/// let module = b.node(NodeKind::Module, 0..13, 0, 0, [(None, class)]);
/// let tree = b.finish(module).unwrap();
/// assert_eq!(tree.root().children().count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    source: Vec<u8>,
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
        }
    }

    /// Push a node without children.
    pub fn leaf(
        &mut self,
        kind: NodeKind,
        byte_range: Range<usize>,
        start_line: usize,
        end_line: usize,
    ) -> NodeId {
        self.node(kind, byte_range, start_line, end_line, [])
    }

    /// Push a node whose children (optionally labelled) are already built.
    ///
    /// Byte ranges are clamped to the source length.
    pub fn node(
        &mut self,
        kind: NodeKind,
        byte_range: Range<usize>,
        start_line: usize,
        end_line: usize,
        children: impl IntoIterator<Item = (Option<Field>, NodeId)>,
    ) -> NodeId {
        let len = self.source.len();
        let end = byte_range.end.min(len);
        let start = byte_range.start.min(end);

        let mut data = NodeData {
            kind,
            byte_range: start..end,
            start_line,
            end_line,
            children: Vec::new(),
            fields: SmallVec::new(),
        };
        for (field, child) in children {
            data.children.push(child);
            if let Some(field) = field {
                data.fields.push((field, child));
            }
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    /// Byte range of an already pushed node.
    pub fn byte_range(&self, id: NodeId) -> Option<Range<usize>> {
        self.nodes.get(id.index()).map(|n| n.byte_range.clone())
    }

    /// Seal the tree with `root` as its root.
    ///
    /// Returns `None` unless `root` was pushed on this builder and every
    /// child was pushed before its parent.
    pub fn finish(self, root: NodeId) -> Option<SyntaxTree> {
        if root.index() >= self.nodes.len() {
            return None;
        }
        let ordered = self.nodes.iter().enumerate().all(|(index, node)| {
            node.children.iter().all(|child| child.index() < index)
        });
        if !ordered {
            return None;
        }

        Some(SyntaxTree {
            source: self.source,
            nodes: self.nodes,
            root,
        })
    }
}
