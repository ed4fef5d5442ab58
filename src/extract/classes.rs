//! Class declaration extraction.

use std::collections::BTreeSet;

use tracing::debug;

use super::{ClassRecord, ExtractOptions, ANONYMOUS_FUNCTION};
use crate::syntax::{Field, NodeId, NodeKind, SyntaxNode};

/// Collect class declarations under `root` with the conventional `self` name.
pub fn extract_classes(root: SyntaxNode<'_>) -> Vec<ClassRecord> {
    extract_classes_with(root, &ExtractOptions::default())
}

/// Collect class declarations under `root`.
///
/// Classes nested directly in another class appear only in that class's
/// `inner_classes`. Classes found anywhere else, including inside function
/// bodies, are reported in the returned list.
pub fn extract_classes_with(root: SyntaxNode<'_>, options: &ExtractOptions) -> Vec<ClassRecord> {
    collect(root, None, &options.self_name)
}

/// Walk `root` for classes, all reported with the same `parent_class`.
///
/// Only nesting inside class bodies recurses, through `scan_class`; the
/// walk over everything else keeps its own stack.
fn collect(root: SyntaxNode<'_>, parent_class: Option<&str>, self_name: &str) -> Vec<ClassRecord> {
    let mut classes = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !node.kind().is_class_like() {
            stack.extend(node.children().rev());
            continue;
        }

        let scan = scan_class(node, parent_class, self_name);
        classes.push(scan.record);

        // Keep walking for classes nested elsewhere, skipping the ones already
        // attached as inner classes.
        let mut rest = Vec::new();
        for child in node.children() {
            if scan.consumed.contains(&child.id()) {
                continue;
            }
            if scan.body == Some(child) {
                rest.extend(
                    child
                        .children()
                        .filter(|stmt| !scan.consumed.contains(&stmt.id())),
                );
            } else {
                rest.push(child);
            }
        }
        stack.extend(rest.into_iter().rev());
    }

    classes
}

struct ClassScan<'t> {
    record: ClassRecord,
    body: Option<SyntaxNode<'t>>,
    /// Class nodes extracted into `record.inner_classes`.
    consumed: Vec<NodeId>,
}

fn scan_class<'t>(node: SyntaxNode<'t>, parent_class: Option<&str>, self_name: &str) -> ClassScan<'t> {
    let name = node.field_text(Field::Name);
    if name.is_none() {
        debug!(line = node.start_line(), "class without name field");
    }

    let mut attributes = Vec::new();
    let mut instance_attributes = BTreeSet::new();
    let mut methods = Vec::new();
    let mut inner_classes = Vec::new();
    let mut consumed = Vec::new();

    let body = node.child_of_kind(NodeKind::Block);
    if let Some(body) = body {
        for stmt in body.children() {
            let kind = stmt.kind();
            if kind.is_assignment() {
                attributes.extend(assigned_identifiers(stmt));
            } else if kind.is_function_like() {
                methods.push(
                    stmt.field_text(Field::Name)
                        .unwrap_or_else(|| ANONYMOUS_FUNCTION.to_string()),
                );
                instance_attributes.extend(self_assignments(stmt, self_name));
            } else if kind.is_class_like() {
                consumed.push(stmt.id());
                inner_classes.extend(collect(stmt, name.as_deref(), self_name));
            }
        }
    } else {
        debug!(line = node.start_line(), "class without body block");
    }

    // Some grammars attach nested classes beside the body rather than in it.
    for child in node.children() {
        if child.kind().is_class_like() && !consumed.contains(&child.id()) {
            consumed.push(child.id());
            inner_classes.extend(collect(child, name.as_deref(), self_name));
        }
    }

    let record = ClassRecord {
        base_classes: node.field_text(Field::Base),
        name,
        attributes,
        instance_attributes,
        methods,
        inner_classes,
        parent_class: parent_class.map(str::to_string),
        start_line: node.start_line(),
        end_line: node.end_line(),
        text: node.text().into_owned(),
    };

    ClassScan {
        record,
        body,
        consumed,
    }
}

/// Identifiers on the left-hand side of an assignment statement.
fn assigned_identifiers(stmt: SyntaxNode<'_>) -> Vec<String> {
    let Some(left) = stmt.field(Field::Left) else {
        return Vec::new();
    };

    if left.kind() == NodeKind::Identifier {
        return vec![left.text().into_owned()];
    }

    left.children()
        .filter(|c| c.kind() == NodeKind::Identifier)
        .map(|c| c.text().into_owned())
        .collect()
}

/// Properties assigned as `<self_name>.<property>` directly in a method body.
fn self_assignments(method: SyntaxNode<'_>, self_name: &str) -> Vec<String> {
    let Some(body) = method.child_of_kind(NodeKind::Block) else {
        return Vec::new();
    };

    body.children()
        .filter(|stmt| stmt.kind().is_assignment())
        .filter_map(|stmt| {
            let left = stmt.field(Field::Left)?;
            if left.kind() != NodeKind::MemberAccess {
                return None;
            }
            let object = left.field(Field::Object)?;
            let property = left.field(Field::Property)?;
            let matches = object.kind() == NodeKind::Identifier
                && property.kind() == NodeKind::Identifier
                && object.text() == self_name;
            matches.then(|| property.text().into_owned())
        })
        .collect()
}
