//! File-level code metrics.
//!
//! Combines complexity, Halstead volume, maintainability, smells,
//! dependencies and per-function/per-class summaries into one
//! [`CodeMetrics`] record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::complexity;
use super::halstead::{self, HalsteadMetrics};
use super::smells::{technical_debt, CodeSmell, SmellDetector, SmellSeverity};
use crate::config::MetricsConfig;
use crate::core::{count_code_lines, Result};
use crate::parser::queries::{
    callee_property, class_name, count_lines, extract_source_slice, find_all_class_like_nodes,
    for_each_in_unit, function_sites, parameter_count, unquote,
};
use crate::parser::{for_each_node, AstNode, NodeKind};

/// Metrics for one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMetrics {
    /// Maximum over the module unit and every function.
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub max_nesting: u32,
    pub lines_of_code: usize,
    /// Clamped to `[0, 100]`.
    pub maintainability_index: f64,
    pub technical_debt: u32,
    pub halstead: HalsteadMetrics,
    pub code_smells: Vec<CodeSmell>,
    pub dependencies: BTreeSet<String>,
    pub functions: Vec<FunctionAnalysis>,
    pub classes: Vec<ClassAnalysis>,
}

impl CodeMetrics {
    pub fn critical_smells(&self) -> impl Iterator<Item = &CodeSmell> {
        self.code_smells
            .iter()
            .filter(|s| s.severity == SmellSeverity::Critical)
    }
}

/// Per-function summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAnalysis {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub lines: usize,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub max_nesting: u32,
    pub parameters: usize,
    pub return_statements: usize,
    /// Contains a `try` block or a `.catch(...)` handler.
    pub has_error_handling: bool,
    /// Free of fake-logic markers and does some actual work.
    pub uses_real_logic: bool,
}

/// Per-class summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAnalysis {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub methods: usize,
    pub properties: usize,
    /// Cyclomatic complexity over every method body.
    pub complexity: u32,
    /// `methods / (methods + properties)`, or 0 when either count is 0.
    pub cohesion: f64,
}

const FAKE_LOGIC_MARKERS: &[&str] = &["math.random", "settimeout", "hardcoded", "placeholder"];

/// Computes [`CodeMetrics`] from a parsed tree and its source.
pub struct MetricsAnalyzer {
    smells: SmellDetector,
}

impl MetricsAnalyzer {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        Ok(Self {
            smells: SmellDetector::new(config)?,
        })
    }

    pub fn analyze(&self, root: &AstNode, source: &str) -> CodeMetrics {
        let sites = function_sites(root);
        let file = complexity::analyze_file(root, sites.iter().map(|s| s.node));
        let halstead = halstead::analyze(root);
        let lines_of_code = count_code_lines(source);
        let code_smells = self.smells.detect(root, source);

        let functions: Vec<FunctionAnalysis> = sites
            .iter()
            .map(|site| analyze_function(site.node, site.name, source))
            .collect();
        let classes: Vec<ClassAnalysis> = find_all_class_like_nodes(root)
            .into_iter()
            .map(analyze_class)
            .collect();

        debug!(
            functions = functions.len(),
            classes = classes.len(),
            smells = code_smells.len(),
            "Computed code metrics"
        );

        CodeMetrics {
            cyclomatic_complexity: file.cyclomatic,
            cognitive_complexity: file.cognitive,
            max_nesting: file.max_nesting,
            lines_of_code,
            maintainability_index: halstead::maintainability_index(
                halstead.volume,
                file.cyclomatic,
                lines_of_code,
            ),
            technical_debt: technical_debt(&code_smells),
            halstead,
            code_smells,
            dependencies: extract_dependencies(root),
            functions,
            classes,
        }
    }
}

fn analyze_function(node: &AstNode, name: &str, source: &str) -> FunctionAnalysis {
    let metrics = complexity::analyze_function(node);

    let mut return_statements = 0;
    let mut has_error_handling = false;
    let mut does_work = false;
    for_each_in_unit(node, |child, _| match child.kind {
        NodeKind::ReturnStatement => return_statements += 1,
        NodeKind::TryStatement => has_error_handling = true,
        NodeKind::CallExpression => {
            does_work = true;
            if callee_property(child) == Some("catch") {
                has_error_handling = true;
            }
        }
        NodeKind::AwaitExpression
        | NodeKind::NewExpression
        | NodeKind::BinaryExpression
        | NodeKind::AssignmentExpression
        | NodeKind::AugmentedAssignmentExpression
        | NodeKind::UpdateExpression => does_work = true,
        _ => {}
    });

    let text = extract_source_slice(node, source).to_ascii_lowercase();
    let has_fake_markers = FAKE_LOGIC_MARKERS.iter().any(|m| text.contains(m));

    FunctionAnalysis {
        name: name.to_string(),
        start_line: node.start_line(),
        end_line: node.end_line(),
        lines: count_lines(node),
        cyclomatic_complexity: metrics.cyclomatic,
        cognitive_complexity: metrics.cognitive,
        max_nesting: metrics.max_nesting,
        parameters: parameter_count(node),
        return_statements,
        has_error_handling,
        uses_real_logic: does_work && !has_fake_markers,
    }
}

/// Member counts, complexity and cohesion of one class.
pub fn analyze_class(node: &AstNode) -> ClassAnalysis {
    let members: Vec<&AstNode> = node
        .child("body")
        .map(|body| body.children().collect())
        .unwrap_or_default();
    let methods = members
        .iter()
        .filter(|m| m.kind == NodeKind::MethodDefinition)
        .count();
    let properties = members
        .iter()
        .filter(|m| m.kind == NodeKind::FieldDefinition)
        .count();

    let mut decisions = 0;
    for_each_node(node, |child, _| {
        if child.is_function_like() {
            decisions += complexity::cyclomatic_complexity(child) - 1;
        }
    });

    let cohesion = if methods == 0 || properties == 0 {
        0.0
    } else {
        methods as f64 / (methods + properties) as f64
    };

    ClassAnalysis {
        name: class_name(node).to_string(),
        start_line: node.start_line(),
        end_line: node.end_line(),
        methods,
        properties,
        complexity: 1 + decisions,
        cohesion,
    }
}

/// Module specifiers from static imports, re-exports, `require` and
/// dynamic `import()`.
pub fn extract_dependencies(root: &AstNode) -> BTreeSet<String> {
    let mut dependencies = BTreeSet::new();

    for_each_node(root, |node, _| {
        let specifier = match node.kind {
            NodeKind::ImportStatement | NodeKind::ExportStatement => node.child("source"),
            NodeKind::CallExpression => {
                let callee = node.child("function");
                let is_loader = callee.is_some_and(|c| {
                    c.kind == NodeKind::Import
                        || (c.kind == NodeKind::Identifier && c.text() == Some("require"))
                });
                if is_loader {
                    node.child("arguments").and_then(|args| args.children().next())
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(text) = specifier
            .filter(|s| s.kind == NodeKind::String)
            .and_then(AstNode::text)
        {
            dependencies.insert(unquote(text).to_string());
        }
    });

    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn metrics(source: &str) -> CodeMetrics {
        let root = parse(source, Path::new("m.ts")).unwrap();
        MetricsAnalyzer::new(&MetricsConfig::default())
            .unwrap()
            .analyze(&root, source)
    }

    #[test]
    fn test_add_function() {
        let m = metrics("function add(a, b) { return a + b; }");
        assert_eq!(m.cyclomatic_complexity, 1);
        assert_eq!(m.lines_of_code, 1);
        assert_eq!(m.technical_debt, 0);
        assert_eq!(m.functions.len(), 1);
        let f = &m.functions[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.parameters, 2);
        assert_eq!(f.return_statements, 1);
        assert!(f.uses_real_logic);
        assert!(!f.has_error_handling);
        assert!(m.maintainability_index > 0.0 && m.maintainability_index <= 100.0);
    }

    #[test]
    fn test_dependencies() {
        let m = metrics(
            "import fs from 'fs';\nimport { a } from \"./a\";\nexport { b } from './b';\nconst c = require('c');\nconst d = import('./d');\nconst e = require(name);",
        );
        let deps: Vec<_> = m.dependencies.iter().map(String::as_str).collect();
        assert_eq!(deps, vec!["./a", "./b", "./d", "c", "fs"]);
    }

    #[test]
    fn test_fake_logic_flags() {
        let m = metrics(
            "function roll() { return Math.random(); }\nasync function load(url) { try { return await fetch(url); } catch (e) { throw e; } }",
        );
        assert!(!m.functions[0].uses_real_logic);
        assert!(m.functions[1].uses_real_logic);
        assert!(m.functions[1].has_error_handling);
        assert_eq!(m.technical_debt, 8);
    }

    #[test]
    fn test_class_summary() {
        let m = metrics(
            "class Counter {\n  count = 0;\n  inc() { this.count++; }\n  dec() { if (this.count > 0) { this.count--; } }\n  reset() { this.count = 0; }\n}",
        );
        assert_eq!(m.classes.len(), 1);
        let c = &m.classes[0];
        assert_eq!(c.name, "Counter");
        assert_eq!(c.methods, 3);
        assert_eq!(c.properties, 1);
        assert_eq!(c.complexity, 2);
        assert!((c.cohesion - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_class_without_properties_has_zero_cohesion() {
        let m = metrics("class A { run() {} }");
        assert_eq!(m.classes[0].cohesion, 0.0);
    }

    #[test]
    fn test_file_cyclomatic_is_max_of_functions() {
        let m = metrics("function a(x) { if (x) {} }\nfunction b(x) { if (x) {} if (x) {} if (x) {} }");
        assert_eq!(m.cyclomatic_complexity, 4);
        assert_eq!(m.functions[0].cyclomatic_complexity, 2);
    }
}
