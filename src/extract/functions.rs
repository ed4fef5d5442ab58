//! Function declaration extraction.

use tracing::debug;

use super::{FunctionKind, FunctionRecord, ANONYMOUS_FUNCTION};
use crate::syntax::{Field, NodeKind, SyntaxNode};

/// The declaration a node's children are immediately nested in.
///
/// Class context crosses class bodies but never function bodies: a function
/// defined inside a method sees `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationContext<'t> {
    None,
    Class(SyntaxNode<'t>),
}

/// Collect every function-like declaration under `root`, in document order.
///
/// Outer declarations precede the declarations nested inside them.
pub fn extract_functions(root: SyntaxNode<'_>) -> Vec<FunctionRecord> {
    let mut functions = Vec::new();
    let mut stack = vec![(root, DeclarationContext::None)];

    // Pre-order walk; children are pushed in reverse so they pop in order.
    while let Some((node, context)) = stack.pop() {
        let kind = node.kind();
        if kind.is_function_like() {
            functions.push(function_record(node, context));
        }

        let child_context = if kind.is_class_like() {
            DeclarationContext::Class(node)
        } else if kind.is_function_like() {
            DeclarationContext::None
        } else {
            context
        };
        stack.extend(node.children().rev().map(|child| (child, child_context)));
    }

    functions
}

fn function_record(node: SyntaxNode<'_>, context: DeclarationContext<'_>) -> FunctionRecord {
    let name = node.field_text(Field::Name).unwrap_or_else(|| {
        debug!(line = node.start_line(), "function without name field");
        ANONYMOUS_FUNCTION.to_string()
    });

    let (kind, enclosing_class) = match context {
        DeclarationContext::Class(class) => (FunctionKind::Method, class.field_text(Field::Name)),
        DeclarationContext::None if node.kind() == NodeKind::AsyncFunctionDefinition => {
            (FunctionKind::AsyncFunction, None)
        }
        DeclarationContext::None => (FunctionKind::Function, None),
    };

    let decorators = node
        .children()
        .filter(|c| c.kind() == NodeKind::Decorator)
        .map(|c| c.text().trim_end().to_string())
        .collect();

    FunctionRecord {
        kind,
        name,
        parameters: node.field_text(Field::Parameters).unwrap_or_default(),
        docstring: docstring(node),
        decorators,
        enclosing_class,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_line: node.start_line(),
        end_line: node.end_line(),
        text: node.text().into_owned(),
    }
}

/// First expression statement whose leading child is a string literal.
///
/// Statements sit under the body block in tree-sitter-python, so the body's
/// direct children are scanned after the function's own.
fn docstring(node: SyntaxNode<'_>) -> Option<String> {
    let body = node.child_of_kind(NodeKind::Block);
    node.children()
        .chain(body.into_iter().flat_map(|b| b.children()))
        .find_map(|stmt| {
            if stmt.kind() != NodeKind::ExpressionStatement {
                return None;
            }
            let first = stmt.first_child()?;
            (first.kind() == NodeKind::String).then(|| first.text().into_owned())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::syntax::TreeBuilder;
    use pretty_assertions::assert_eq;

    fn functions(code: &str) -> Vec<FunctionRecord> {
        let tree = parse_source(code.as_bytes()).unwrap();
        extract_functions(tree.root())
    }

    fn names(records: &[FunctionRecord]) -> Vec<&str> {
        records.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_method_in_class() {
        let code = "class A:\n    x = 1\n    def __init__(self):\n        self.y = 2\n    class B:\n        pass";
        let funcs = functions(code);
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "__init__");
        assert_eq!(funcs[0].kind, FunctionKind::Method);
        assert_eq!(funcs[0].enclosing_class.as_deref(), Some("A"));
        assert_eq!(funcs[0].parameters, "(self)");
        assert_eq!(funcs[0].start_line, 2);
        assert_eq!(funcs[0].end_line, 3);
    }

    #[test]
    fn test_async_function_with_docstring() {
        let funcs = functions("async def f():\n    \"\"\"doc\"\"\"\n    pass");
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].kind, FunctionKind::AsyncFunction);
        assert_eq!(funcs[0].docstring.as_deref(), Some("\"\"\"doc\"\"\""));
        assert_eq!(funcs[0].enclosing_class, None);
        assert_eq!(funcs[0].text, "async def f():\n    \"\"\"doc\"\"\"\n    pass");
    }

    #[test]
    fn test_docstring_first_string_statement_only() {
        let code = "def f():\n    x = 1\n    'first'\n    'second'\n";
        let funcs = functions(code);
        assert_eq!(funcs[0].docstring.as_deref(), Some("'first'"));

        let funcs = functions("def g():\n    return 1\n");
        assert_eq!(funcs[0].docstring, None);
    }

    #[test]
    fn test_nested_function_in_method_is_not_method() {
        let code = "\
class A:
    def m(self):
        def helper():
            pass
        return helper
";
        let funcs = functions(code);
        assert_eq!(names(&funcs), vec!["m", "helper"]);
        assert_eq!(funcs[0].kind, FunctionKind::Method);
        assert_eq!(funcs[1].kind, FunctionKind::Function);
        assert_eq!(funcs[1].enclosing_class, None);
    }

    #[test]
    fn test_async_method_is_method() {
        let funcs = functions("class A:\n    async def run(self):\n        pass\n");
        assert_eq!(funcs[0].kind, FunctionKind::Method);
        assert_eq!(funcs[0].enclosing_class.as_deref(), Some("A"));
    }

    #[test]
    fn test_method_of_class_nested_in_function() {
        let code = "\
def factory():
    class Local:
        def run(self):
            async def inner():
                pass
    return Local
";
        let funcs = functions(code);
        assert_eq!(names(&funcs), vec!["factory", "run", "inner"]);
        assert_eq!(funcs[0].kind, FunctionKind::Function);
        assert_eq!(funcs[1].kind, FunctionKind::Method);
        assert_eq!(funcs[1].enclosing_class.as_deref(), Some("Local"));
        assert_eq!(funcs[2].kind, FunctionKind::AsyncFunction);
    }

    #[test]
    fn test_decorators_in_order() {
        let code = "\
class Service:
    @staticmethod
    @cached(ttl=5)
    def build():
        pass

@app.route('/x')
def handler():
    pass
";
        let funcs = functions(code);
        assert_eq!(names(&funcs), vec!["build", "handler"]);
        assert_eq!(funcs[0].kind, FunctionKind::Method);
        assert_eq!(
            funcs[0].decorators.to_vec(),
            vec!["@staticmethod".to_string(), "@cached(ttl=5)".to_string()]
        );
        assert_eq!(funcs[1].decorators.to_vec(), vec!["@app.route('/x')".to_string()]);
        assert!(funcs[1].text.starts_with("@app.route"));
        assert_eq!(funcs[1].start_line, 6);
    }

    #[test]
    fn test_every_function_found_once_in_document_order() {
        let code = "\
def a():
    def b():
        def c():
            pass
    async def d():
        pass

class K:
    def e(self):
        pass
    class L:
        def f(self):
            pass

def g():
    pass
";
        let funcs = functions(code);
        assert_eq!(names(&funcs), vec!["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(funcs[4].enclosing_class.as_deref(), Some("K"));
        assert_eq!(funcs[5].enclosing_class.as_deref(), Some("L"));
    }

    #[test]
    fn test_deeply_nested_expression() {
        let code = format!(
            "def f():\n    return 1{}\n\nasync def g():\n    pass\n",
            " + 1".repeat(5000)
        );
        let funcs = functions(&code);
        assert_eq!(names(&funcs), vec!["f", "g"]);
        assert_eq!(funcs[1].kind, FunctionKind::AsyncFunction);
        assert_eq!(funcs[1].start_line, 3);
    }

    #[test]
    fn test_missing_fields_degrade() {
        // A definition with neither a name nor a parameters field.
        let src = "def : pass";
        let mut b = TreeBuilder::new(src);
        let body = b.leaf(NodeKind::Block, 6..10, 0, 0);
        let func = b.node(NodeKind::FunctionDefinition, 0..10, 0, 0, [(None, body)]);
        let module = b.node(NodeKind::Module, 0..10, 0, 0, [(None, func)]);
        let tree = b.finish(module).unwrap();

        let funcs = extract_functions(tree.root());
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, ANONYMOUS_FUNCTION);
        assert_eq!(funcs[0].parameters, "");
        assert_eq!(funcs[0].docstring, None);
    }

    #[test]
    fn test_unnamed_class_still_traversed() {
        let src = "class : def m(): pass";
        let mut b = TreeBuilder::new(src);
        let method_name = b.leaf(NodeKind::Identifier, 12..13, 0, 0);
        let method = b.node(
            NodeKind::FunctionDefinition,
            8..21,
            0,
            0,
            [(Some(Field::Name), method_name)],
        );
        let body = b.node(NodeKind::Block, 8..21, 0, 0, [(None, method)]);
        let class = b.node(NodeKind::ClassDefinition, 0..21, 0, 0, [(None, body)]);
        let module = b.node(NodeKind::Module, 0..21, 0, 0, [(None, class)]);
        let tree = b.finish(module).unwrap();

        let funcs = extract_functions(tree.root());
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "m");
        assert_eq!(funcs[0].kind, FunctionKind::Method);
        assert_eq!(funcs[0].enclosing_class, None);
    }
}
