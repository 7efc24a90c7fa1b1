//! Cyclomatic and cognitive complexity over the normalized tree.
//!
//! # Overview
//!
//! - **Cyclomatic Complexity**: Counts the number of linearly independent paths through code.
//!   Based on McCabe (1976) "A Complexity Measure", IEEE TSE SE-2(4).
//!
//! - **Cognitive Complexity**: Measures how hard code is to understand, with penalties
//!   for nesting. Based on SonarSource's methodology.
//!   Reference: https://www.sonarsource.com/docs/CognitiveComplexity.pdf
//!
//! Every function-like node is its own unit: nested functions are excluded
//! from their parent's counts. Statements outside any function form the
//! module unit, so a file without functions still has a cyclomatic value.

use serde::{Deserialize, Serialize};

use crate::parser::queries::{is_logical_expression, DECISION_KINDS, NESTING_KINDS};
use crate::parser::{AstNode, NodeKind};

/// Complexity metrics for one unit (function or module top level).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Cyclomatic complexity.
    pub cyclomatic: u32,
    /// Cognitive complexity.
    pub cognitive: u32,
    /// Maximum nesting depth of control constructs.
    pub max_nesting: u32,
}

/// File-level complexity summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileComplexity {
    /// Maximum cyclomatic complexity over all units.
    pub cyclomatic: u32,
    /// Whole-tree cognitive complexity; function bodies nest.
    pub cognitive: u32,
    /// Deepest control nesting in any unit.
    pub max_nesting: u32,
}

/// Metrics for a single function-like node, ignoring nested functions.
pub fn analyze_function(func: &AstNode) -> Metrics {
    Metrics {
        cyclomatic: cyclomatic_complexity(func),
        cognitive: func
            .children()
            .map(|child| cognitive_walk(child, 0, true))
            .sum(),
        max_nesting: func
            .children()
            .map(|child| nesting_walk(child, 0))
            .max()
            .unwrap_or(0),
    }
}

/// Metrics for the module unit: top-level code outside every function.
pub fn analyze_module(root: &AstNode) -> Metrics {
    Metrics {
        cyclomatic: cyclomatic_complexity(root),
        cognitive: root
            .children()
            .filter(|child| !child.is_function_like())
            .map(|child| cognitive_walk(child, 0, false))
            .sum(),
        max_nesting: nesting_walk(root, 0),
    }
}

/// File-level summary.
///
/// Cyclomatic complexity is the maximum over units so the headline value
/// bounds the path count of any single unit.
pub fn analyze_file<'a>(
    root: &AstNode,
    functions: impl IntoIterator<Item = &'a AstNode>,
) -> FileComplexity {
    let module = analyze_module(root);
    let mut summary = FileComplexity {
        cyclomatic: module.cyclomatic,
        cognitive: cognitive_complexity(root),
        max_nesting: module.max_nesting,
    };
    for func in functions {
        summary.cyclomatic = summary.cyclomatic.max(cyclomatic_complexity(func));
        summary.max_nesting = summary.max_nesting.max(analyze_function(func).max_nesting);
    }
    summary
}

/// `1 + decision points` within `unit`, excluding nested functions.
pub fn cyclomatic_complexity(unit: &AstNode) -> u32 {
    1 + unit.children().map(count_decision_points).sum::<u32>()
}

fn count_decision_points(node: &AstNode) -> u32 {
    if node.is_function_like() {
        return 0;
    }
    let own = u32::from(DECISION_KINDS.contains(&node.kind) || is_logical_expression(node));
    own + node.children().map(count_decision_points).sum::<u32>()
}

/// Whole-tree cognitive complexity where function bodies add a nesting level.
pub fn cognitive_complexity(root: &AstNode) -> u32 {
    cognitive_walk(root, 0, true)
}

/// Nesting level for `child` of `node`, given the level inside `node`.
///
/// An `if` directly under `else` stays at the level of its chain head.
fn child_level(node: &AstNode, child: &AstNode, inner: u32) -> u32 {
    if node.kind == NodeKind::ElseClause && child.kind == NodeKind::IfStatement {
        inner.saturating_sub(1)
    } else {
        inner
    }
}

fn cognitive_walk(node: &AstNode, nesting: u32, descend_functions: bool) -> u32 {
    let mut total = 0;
    let mut inner = nesting;

    if NESTING_KINDS.contains(&node.kind) {
        total += 1 + nesting;
        inner = nesting + 1;
    } else if node.is_function_like() {
        if !descend_functions {
            return 0;
        }
        inner = nesting + 1;
    }

    for child in node.children() {
        total += cognitive_walk(child, child_level(node, child, inner), descend_functions);
    }
    total
}

fn nesting_walk(node: &AstNode, depth: u32) -> u32 {
    if node.is_function_like() {
        return depth;
    }
    let here = if NESTING_KINDS.contains(&node.kind) {
        depth + 1
    } else {
        depth
    };
    node.children()
        .map(|child| nesting_walk(child, child_level(node, child, here)))
        .max()
        .unwrap_or(0)
        .max(here)
}
