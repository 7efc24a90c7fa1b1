//! Shallow control-flow and data-flow records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::symbols::Collected;
use crate::parser::{for_each_node, AstNode, NodeKind, CHILDREN};

/// Line numbers of the control structures in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlow {
    /// Program root and every function-like node.
    pub entry_points: Vec<usize>,
    /// `return` statements.
    pub exit_points: Vec<usize>,
    pub conditional_blocks: Vec<usize>,
    pub loop_blocks: Vec<usize>,
    pub unreachable_blocks: Vec<usize>,
}

/// Definition and use lines per variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlow {
    pub defined_variables: BTreeMap<String, Vec<usize>>,
    pub used_variables: BTreeMap<String, Vec<usize>>,
    /// Definition lines of variables that are never read.
    pub dead_definitions: Vec<usize>,
}

pub fn data_flow(collected: &Collected) -> DataFlow {
    let mut dead_definitions: Vec<usize> = collected
        .definitions
        .iter()
        .filter(|(name, _)| collected.uses.get(*name).map_or(true, Vec::is_empty))
        .flat_map(|(_, lines)| lines.iter().copied())
        .collect();
    dead_definitions.sort_unstable();

    DataFlow {
        defined_variables: collected.definitions.clone(),
        used_variables: collected.uses.clone(),
        dead_definitions,
    }
}

pub fn control_flow(root: &AstNode) -> ControlFlow {
    let mut flow = ControlFlow::default();

    for_each_node(root, |node, _| {
        let line = node.start_line();
        match node.kind {
            NodeKind::Program => flow.entry_points.push(line),
            kind if kind.is_function_like() => flow.entry_points.push(line),
            NodeKind::ReturnStatement => flow.exit_points.push(line),
            NodeKind::IfStatement | NodeKind::SwitchStatement => {
                flow.conditional_blocks.push(line)
            }
            kind if kind.is_loop() => flow.loop_blocks.push(line),
            _ => {}
        }
    });

    flow.unreachable_blocks = unreachable_statements(root)
        .iter()
        .map(|node| node.start_line())
        .collect();
    flow
}

fn is_terminator(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ReturnStatement
            | NodeKind::ThrowStatement
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement
    )
}

/// Statement lists of blocks, program bodies and switch arms.
fn statement_list(node: &AstNode) -> Option<&[AstNode]> {
    match node.kind {
        NodeKind::Program | NodeKind::StatementBlock => Some(node.children_of(CHILDREN)),
        NodeKind::SwitchCase | NodeKind::SwitchDefault => Some(node.children_of("body")),
        _ => None,
    }
}

/// The first statement after a `return`, `throw`, `break` or `continue`
/// in each block. Hoisted function declarations are never unreachable.
pub fn unreachable_statements(root: &AstNode) -> Vec<&AstNode> {
    let mut found = Vec::new();

    for_each_node(root, |node, _| {
        let Some(statements) = statement_list(node) else {
            return;
        };
        let mut terminated = false;
        for statement in statements {
            if terminated
                && !matches!(
                    statement.kind,
                    NodeKind::FunctionDeclaration
                        | NodeKind::GeneratorFunctionDeclaration
                        | NodeKind::EmptyStatement
                )
            {
                found.push(statement);
                break;
            }
            terminated |= is_terminator(statement.kind);
        }
    });

    found.sort_by_key(|node| node.range.start);
    found
}

/// `while (true)`, `do {} while (true)` and `for (;;)` with no way out.
pub fn infinite_loops(root: &AstNode) -> Vec<&AstNode> {
    let mut found = Vec::new();

    for_each_node(root, |node, _| {
        let always_true = match node.kind {
            NodeKind::WhileStatement | NodeKind::DoStatement => {
                node.child("condition").is_some_and(is_always_true)
            }
            NodeKind::ForStatement => match node.child("condition") {
                None => true,
                Some(cond) if cond.kind == NodeKind::EmptyStatement => true,
                Some(cond) if cond.kind == NodeKind::ExpressionStatement => {
                    cond.children().next().is_some_and(is_always_true)
                }
                Some(cond) => is_always_true(cond),
            },
            _ => false,
        };
        if !always_true {
            return;
        }
        let body = node.child("body");
        if !body.is_some_and(|b| escapes(b, false)) {
            found.push(node);
        }
    });

    found
}

fn is_always_true(node: &AstNode) -> bool {
    match node.kind {
        NodeKind::ParenthesizedExpression => node.children().next().is_some_and(is_always_true),
        NodeKind::True => true,
        NodeKind::Number => node
            .text()
            .and_then(|t| t.parse::<f64>().ok())
            .is_some_and(|n| n != 0.0),
        _ => false,
    }
}

/// Whether `node` can leave the enclosing loop.
///
/// Unlabelled `break` inside a nested loop or switch targets that inner
/// construct; nested functions never exit the loop.
fn escapes(node: &AstNode, nested: bool) -> bool {
    match node.kind {
        kind if kind.is_function_like() => false,
        NodeKind::ReturnStatement | NodeKind::ThrowStatement => true,
        NodeKind::BreakStatement => !nested || node.child("label").is_some(),
        _ => node.children().any(|child| {
            let inner = nested || child.kind.is_loop() || child.kind == NodeKind::SwitchStatement;
            escapes(child, inner)
        }),
    }
}
