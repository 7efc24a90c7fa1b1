//! Tree queries shared by the analyzers.

use super::ast::{for_each_node, AstNode, NodeKind};

/// Decision points for cyclomatic complexity.
///
/// Each case is an independent path per McCabe's methodology; the
/// default arm is not. Short-circuit operators are counted separately.
pub const DECISION_KINDS: &[NodeKind] = &[
    NodeKind::IfStatement,
    NodeKind::TernaryExpression,
    NodeKind::SwitchCase,
    NodeKind::ForStatement,
    NodeKind::ForInStatement,
    NodeKind::WhileStatement,
    NodeKind::DoStatement,
    NodeKind::CatchClause,
];

/// Constructs that add `1 + nesting` to cognitive complexity and nest
/// their children one level deeper.
pub const NESTING_KINDS: &[NodeKind] = &[
    NodeKind::IfStatement,
    NodeKind::SwitchStatement,
    NodeKind::ForStatement,
    NodeKind::ForInStatement,
    NodeKind::WhileStatement,
    NodeKind::DoStatement,
    NodeKind::CatchClause,
];

/// Short-circuit operators counted as decision points.
pub fn is_logical_operator(op: &str) -> bool {
    op == "&&" || op == "||"
}

/// A binary expression joined by `&&` or `||`.
pub fn is_logical_expression(node: &AstNode) -> bool {
    node.kind == NodeKind::BinaryExpression && node.operator().is_some_and(is_logical_operator)
}

/// An `if` that is the direct body of an `else` clause.
pub fn is_else_if(node: &AstNode, parent: Option<&AstNode>) -> bool {
    node.kind == NodeKind::IfStatement && parent.is_some_and(|p| p.kind == NodeKind::ElseClause)
}

/// All nodes of `kind` in pre-order.
pub fn find_nodes_of_kind(tree: &AstNode, kind: NodeKind) -> Vec<&AstNode> {
    let mut found = Vec::new();
    for_each_node(tree, |node, _| {
        if node.kind == kind {
            found.push(node);
        }
    });
    found
}

/// Function declarations, expressions, arrows and methods in pre-order.
pub fn find_all_function_like_nodes(tree: &AstNode) -> Vec<&AstNode> {
    let mut found = Vec::new();
    for_each_node(tree, |node, _| {
        if node.is_function_like() {
            found.push(node);
        }
    });
    found
}

/// Class declarations and class expressions in pre-order.
pub fn find_all_class_like_nodes(tree: &AstNode) -> Vec<&AstNode> {
    let mut found = Vec::new();
    for_each_node(tree, |node, _| {
        if node.is_class_like() {
            found.push(node);
        }
    });
    found
}

/// Visit every descendant of `unit` that belongs to it, stopping at
/// nested function boundaries.
pub fn for_each_in_unit<'a, F>(unit: &'a AstNode, mut f: F)
where
    F: FnMut(&'a AstNode, &'a AstNode),
{
    fn walk<'a, F: FnMut(&'a AstNode, &'a AstNode)>(node: &'a AstNode, f: &mut F) {
        for child in node.children() {
            if child.is_function_like() {
                continue;
            }
            f(child, node);
            walk(child, f);
        }
    }
    walk(unit, &mut f);
}

/// Number of source lines spanned by `node`.
pub fn count_lines(node: &AstNode) -> usize {
    node.end_line().saturating_sub(node.start_line()) + 1
}

/// The source text covered by `node`.
pub fn extract_source_slice<'s>(node: &AstNode, source: &'s str) -> &'s str {
    source.get(node.range.start..node.range.end).unwrap_or("")
}

/// A function-like node together with the name it is known by.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSite<'a> {
    pub node: &'a AstNode,
    pub name: &'a str,
}

/// Function-like nodes with their resolved names.
///
/// Anonymous functions take the name of the variable, property or
/// assignment target they are bound to, else `anonymous`.
pub fn function_sites(tree: &AstNode) -> Vec<FunctionSite<'_>> {
    let mut sites = Vec::new();
    for_each_node(tree, |node, parent| {
        if node.is_function_like() {
            sites.push(FunctionSite {
                node,
                name: function_name(node, parent),
            });
        }
    });
    sites
}

/// Resolve the display name of a function-like node.
pub fn function_name<'a>(node: &'a AstNode, parent: Option<&'a AstNode>) -> &'a str {
    if let Some(name) = node.child("name").and_then(name_text) {
        return name;
    }

    let bound = parent.and_then(|parent| match parent.kind {
        NodeKind::VariableDeclarator => parent.child("name").and_then(name_text),
        NodeKind::Pair => parent.child("key").and_then(name_text),
        NodeKind::AssignmentExpression => parent.child("left").and_then(name_text),
        NodeKind::FieldDefinition => parent
            .child("name")
            .or_else(|| parent.child("property"))
            .and_then(name_text),
        _ => None,
    });
    bound.unwrap_or("anonymous")
}

/// Name of a class-like node, or `anonymous`.
pub fn class_name(node: &AstNode) -> &str {
    node.child("name").and_then(name_text).unwrap_or("anonymous")
}

/// Text of an identifier-ish node; member expressions resolve to their
/// property name.
pub fn name_text(node: &AstNode) -> Option<&str> {
    match node.kind {
        NodeKind::MemberExpression => node.child("property").and_then(name_text),
        NodeKind::String => node.text().map(unquote),
        _ => node.text(),
    }
}

/// Strip one layer of matching quotes from a string literal.
pub fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && matches!(first, b'"' | b'\'' | b'`') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Parameter count of a function-like node.
pub fn parameter_count(node: &AstNode) -> usize {
    if let Some(params) = node.child("parameters") {
        return params.children().count();
    }
    usize::from(node.child("parameter").is_some())
}

/// Property name of a call's callee when it is a member access.
pub fn callee_property(call: &AstNode) -> Option<&str> {
    let callee = call.child("function")?;
    match callee.kind {
        NodeKind::MemberExpression => callee.child("property").and_then(AstNode::text),
        _ => None,
    }
}

/// Plain name of a call's callee (`foo()` or `obj.foo()`).
pub fn callee_name(call: &AstNode) -> Option<&str> {
    let callee = call.child("function")?;
    match callee.kind {
        NodeKind::Identifier => callee.text(),
        NodeKind::MemberExpression => callee.child("property").and_then(AstNode::text),
        _ => None,
    }
}
