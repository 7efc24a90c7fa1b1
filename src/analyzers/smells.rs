//! Code smell detection.
//!
//! Two independent passes feed one list: a lexical pass over raw source
//! lines (non-deterministic logic, placeholder markers) and a structural
//! pass over the tree (long methods, large classes, complex conditions).
//! Lines carrying `vincian:ignore` are skipped by the lexical pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::core::{Error, Result};
use crate::parser::queries::{
    class_name, count_lines, find_all_class_like_nodes, function_sites, is_logical_operator,
};
use crate::parser::{for_each_node, AstNode, NodeKind};

static MATH_RANDOM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bMath\s*\.\s*random\b").expect("valid Math.random pattern"));

const IGNORE_DIRECTIVE: &str = "vincian:ignore";

/// Smell severity, weighted for technical debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmellSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SmellSeverity {
    /// Debt points contributed by one smell of this severity.
    pub fn debt_weight(&self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 4,
            Self::Critical => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellKind {
    NonDeterministicLogic,
    PlaceholderMarker,
    LongMethod,
    LargeClass,
    ComplexCondition,
}

/// A detected smell. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSmell {
    #[serde(rename = "type")]
    pub kind: SmellKind,
    pub severity: SmellSeverity,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub suggestion: String,
}

/// Sum of severity-weighted smells.
pub fn technical_debt(smells: &[CodeSmell]) -> u32 {
    smells.iter().map(|s| s.severity.debt_weight()).sum()
}

/// Configured smell detector.
pub struct SmellDetector {
    placeholder: Option<Regex>,
    long_method_lines: usize,
    large_class_lines: usize,
    max_connectives: usize,
}

impl SmellDetector {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let markers: Vec<String> = config
            .placeholder_markers
            .iter()
            .filter(|m| !m.trim().is_empty())
            .map(|m| regex::escape(m.trim()))
            .collect();
        let placeholder = if markers.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b({})\b", markers.join("|"));
            Some(Regex::new(&pattern).map_err(|e| {
                Error::config(format!("invalid placeholder marker pattern: {e}"))
            })?)
        };

        Ok(Self {
            placeholder,
            long_method_lines: config.long_method_lines,
            large_class_lines: config.large_class_lines,
            max_connectives: config.complex_condition_connectives,
        })
    }

    /// Run both passes and merge them in source order.
    pub fn detect(&self, root: &AstNode, source: &str) -> Vec<CodeSmell> {
        let mut smells = self.lexical_pass(source);
        smells.extend(self.structural_pass(root));
        smells.sort_by_key(|s| (s.line, s.column));
        smells
    }

    /// Pattern matches over raw text, at most one marker smell per line.
    pub fn lexical_pass(&self, source: &str) -> Vec<CodeSmell> {
        let mut smells = Vec::new();

        for (index, line) in source.lines().enumerate() {
            if line.contains(IGNORE_DIRECTIVE) {
                continue;
            }

            if let Some(m) = MATH_RANDOM.find(line) {
                smells.push(CodeSmell {
                    kind: SmellKind::NonDeterministicLogic,
                    severity: SmellSeverity::Critical,
                    line: index + 1,
                    column: char_column(line, m.start()),
                    message: "Math.random() detected - replace with deterministic logic"
                        .to_string(),
                    suggestion: "Implement real calculation logic instead of random generation"
                        .to_string(),
                });
            }

            if let Some(m) = self.placeholder.as_ref().and_then(|re| re.find(line)) {
                smells.push(CodeSmell {
                    kind: SmellKind::PlaceholderMarker,
                    severity: SmellSeverity::High,
                    line: index + 1,
                    column: char_column(line, m.start()),
                    message: format!("{} marker detected", m.as_str()),
                    suggestion: "Replace with production-ready implementation".to_string(),
                });
            }
        }

        smells
    }

    /// Shape heuristics over the tree.
    pub fn structural_pass(&self, root: &AstNode) -> Vec<CodeSmell> {
        let mut smells = Vec::new();

        for site in function_sites(root) {
            let lines = count_lines(site.node);
            if lines > self.long_method_lines {
                smells.push(CodeSmell {
                    kind: SmellKind::LongMethod,
                    severity: SmellSeverity::Medium,
                    line: site.node.loc.start.line,
                    column: site.node.loc.start.column,
                    message: format!("Function '{}' too long ({lines} lines)", site.name),
                    suggestion: "Break down into smaller functions".to_string(),
                });
            }
        }

        for class in find_all_class_like_nodes(root) {
            let lines = count_lines(class);
            if lines > self.large_class_lines {
                smells.push(CodeSmell {
                    kind: SmellKind::LargeClass,
                    severity: SmellSeverity::Medium,
                    line: class.loc.start.line,
                    column: class.loc.start.column,
                    message: format!("Class '{}' too large ({lines} lines)", class_name(class)),
                    suggestion: "Split responsibilities into smaller classes".to_string(),
                });
            }
        }

        for_each_node(root, |node, _| {
            let Some(condition) = condition_of(node) else {
                return;
            };
            let connectives = count_connectives(condition);
            if connectives > self.max_connectives {
                smells.push(CodeSmell {
                    kind: SmellKind::ComplexCondition,
                    severity: SmellSeverity::Medium,
                    line: node.loc.start.line,
                    column: node.loc.start.column,
                    message: format!("Complex conditional logic ({connectives} connectives)"),
                    suggestion: "Extract condition to well-named function".to_string(),
                });
            }
        });

        smells
    }
}

/// The tested condition of an `if`, loop or ternary.
pub fn condition_of(node: &AstNode) -> Option<&AstNode> {
    match node.kind {
        NodeKind::IfStatement
        | NodeKind::WhileStatement
        | NodeKind::DoStatement
        | NodeKind::TernaryExpression => node.child("condition"),
        _ => None,
    }
}

/// Count `&&`/`||` connectives in a boolean expression, looking through
/// parentheses and negation.
pub fn count_connectives(node: &AstNode) -> usize {
    match node.kind {
        NodeKind::BinaryExpression if node.operator().is_some_and(is_logical_operator) => {
            1 + node.children().map(count_connectives).sum::<usize>()
        }
        NodeKind::ParenthesizedExpression => node.children().map(count_connectives).sum(),
        NodeKind::UnaryExpression if node.operator() == Some("!") => {
            node.children().map(count_connectives).sum()
        }
        _ => 0,
    }
}

/// Character offset of byte index `byte` within `line`.
fn char_column(line: &str, byte: usize) -> usize {
    line.get(..byte).map_or(byte, |prefix| prefix.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn detector() -> SmellDetector {
        SmellDetector::new(&MetricsConfig::default()).unwrap()
    }

    fn detect(source: &str) -> Vec<CodeSmell> {
        let root = parse(source, Path::new("s.ts")).unwrap();
        detector().detect(&root, source)
    }

    #[test]
    fn test_math_random_is_critical() {
        let smells = detect("const roll = Math.random() * 6;");
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::NonDeterministicLogic);
        assert_eq!(smells[0].severity, SmellSeverity::Critical);
        assert_eq!(smells[0].line, 1);
        assert_eq!(smells[0].column, 13);
    }

    #[test]
    fn test_column_counts_characters_not_bytes() {
        let smells = detect("const s = 'é'; const r = Math.random();");
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].column, 25);
    }

    #[test]
    fn test_one_marker_per_line() {
        let smells = detect("// TODO: fixme, this is a placeholder\nconst a = 1;");
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::PlaceholderMarker);
        assert_eq!(smells[0].severity, SmellSeverity::High);
        assert_eq!(smells[0].message, "TODO marker detected");
    }

    #[test]
    fn test_markers_require_word_boundary() {
        let smells = detect("const mockingbird = 'todos';");
        assert!(smells.is_empty());
    }

    #[test]
    fn test_ignore_directive() {
        let smells = detect("// TODO later vincian:ignore\nconst a = 1;");
        assert!(smells.is_empty());
    }

    #[test]
    fn test_long_method() {
        let body = "  a++;\n".repeat(55);
        let source = format!("function big(a: number) {{\n{body}}}\n");
        let smells = detect(&source);
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::LongMethod);
        assert_eq!(smells[0].severity, SmellSeverity::Medium);
        assert!(smells[0].message.contains("big"));
    }

    #[test]
    fn test_complex_condition_threshold() {
        let ok = detect("if (a && b && c || d) {}");
        assert!(ok.is_empty());
        let smells = detect("if (a && b && (c || d) && !(e || f)) {}");
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::ComplexCondition);
    }

    #[test]
    fn test_large_class_threshold_is_configurable() {
        let config = MetricsConfig {
            large_class_lines: 2,
            ..MetricsConfig::default()
        };
        let source = "class Wide {\n  a = 1;\n  b = 2;\n}";
        let root = parse(source, Path::new("s.ts")).unwrap();
        let smells = SmellDetector::new(&config).unwrap().detect(&root, source);
        assert_eq!(smells.len(), 1);
        assert_eq!(smells[0].kind, SmellKind::LargeClass);
    }

    #[test]
    fn test_technical_debt_weights() {
        let smells = detect("const r = Math.random(); // TODO\nconst s = 1; // FIXME");
        // critical(8) + high(4) + high(4)
        assert_eq!(technical_debt(&smells), 16);
    }

    #[test]
    fn test_custom_markers() {
        let config = MetricsConfig {
            placeholder_markers: vec!["stub".to_string()],
            ..MetricsConfig::default()
        };
        let detector = SmellDetector::new(&config).unwrap();
        assert_eq!(detector.lexical_pass("// STUB value\n// TODO").len(), 1);
    }
}
