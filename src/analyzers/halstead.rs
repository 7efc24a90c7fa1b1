//! Halstead volume and the maintainability index.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::parser::{for_each_node, AstNode, NodeKind};

/// Operator and operand counts with the derived volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HalsteadMetrics {
    pub distinct_operators: usize,
    pub distinct_operands: usize,
    pub total_operators: usize,
    pub total_operands: usize,
    /// `N * log2(n)` with a vocabulary floor of 1.
    pub volume: f64,
}

impl HalsteadMetrics {
    pub fn vocabulary(&self) -> usize {
        self.distinct_operators + self.distinct_operands
    }

    pub fn length(&self) -> usize {
        self.total_operators + self.total_operands
    }
}

/// Count binary/logical operator tokens and identifier/literal operands.
pub fn analyze(root: &AstNode) -> HalsteadMetrics {
    let mut operators: HashSet<&str> = HashSet::new();
    let mut operands: HashSet<&str> = HashSet::new();
    let mut total_operators = 0;
    let mut total_operands = 0;

    for_each_node(root, |node, _| {
        if node.kind == NodeKind::BinaryExpression {
            if let Some(op) = node.operator() {
                operators.insert(op);
                total_operators += 1;
            }
        } else if node.kind.is_operand() {
            operands.insert(node.text().unwrap_or(node.kind.as_str()));
            total_operands += 1;
        }
    });

    let vocabulary = (operators.len() + operands.len()).max(1);
    let length = total_operators + total_operands;

    HalsteadMetrics {
        distinct_operators: operators.len(),
        distinct_operands: operands.len(),
        total_operators,
        total_operands,
        volume: length as f64 * (vocabulary as f64).log2(),
    }
}

/// `171 − 5.2·ln(V) − 0.23·CC − 16.2·ln(LOC)`, clamped to `[0, 100]`.
///
/// Logarithm arguments are floored at 1 so empty inputs stay finite.
pub fn maintainability_index(volume: f64, cyclomatic: u32, lines_of_code: usize) -> f64 {
    let volume = volume.max(1.0);
    let loc = (lines_of_code as f64).max(1.0);
    let mi = 171.0 - 5.2 * volume.ln() - 0.23 * f64::from(cyclomatic) - 16.2 * loc.ln();
    mi.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    #[test]
    fn test_counts_for_simple_add() {
        let root = parse("function add(a, b) { return a + b; }", Path::new("h.js")).unwrap();
        let h = analyze(&root);
        assert_eq!(h.total_operators, 1);
        assert_eq!(h.distinct_operators, 1);
        // add, a, b, a, b
        assert_eq!(h.total_operands, 5);
        assert_eq!(h.distinct_operands, 3);
        assert_eq!(h.vocabulary(), 4);
        assert!((h.volume - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_source_has_zero_volume() {
        let root = parse("", Path::new("h.ts")).unwrap();
        let h = analyze(&root);
        assert_eq!(h.length(), 0);
        assert_eq!(h.volume, 0.0);
    }

    #[test]
    fn test_literals_are_operands() {
        let root = parse("const s = 'a' + 1 + true;", Path::new("h.ts")).unwrap();
        let h = analyze(&root);
        assert_eq!(h.total_operators, 2);
        assert_eq!(h.total_operands, 4);
    }

    #[test]
    fn test_maintainability_index_clamped() {
        assert_eq!(maintainability_index(0.0, 1, 0), 100.0);
        assert_eq!(maintainability_index(1e12, 500, 1_000_000), 0.0);
    }

    #[test]
    fn test_maintainability_decreases_with_complexity() {
        let low = maintainability_index(2000.0, 2, 200);
        let high = maintainability_index(2000.0, 40, 200);
        assert!(high < low);
    }
}
