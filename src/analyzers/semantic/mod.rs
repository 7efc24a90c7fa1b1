//! Lightweight semantic analysis: symbols, def/use, control flow and
//! the issues derived from them.
//!
//! Everything is computed from one parsed tree; nothing crosses file
//! boundaries, so imported names resolve to their import binding only.

pub mod flow;
pub mod issues;
pub mod symbols;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::AstNode;

pub use flow::{ControlFlow, DataFlow};
pub use issues::{IssueKind, IssueSeverity, SemanticIssue};
pub use symbols::{SymbolInfo, SymbolKind};

/// Semantic analysis output for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticReport {
    pub issues: Vec<SemanticIssue>,
    pub symbols: Vec<SymbolInfo>,
    pub data_flow: DataFlow,
    pub control_flow: ControlFlow,
}

impl SemanticReport {
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn errors(&self) -> usize {
        self.count(IssueSeverity::Error)
    }
}

/// Stateless semantic analyzer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticAnalyzer;

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, root: &AstNode) -> SemanticReport {
        let collected = symbols::collect(root);
        let data_flow = flow::data_flow(&collected);
        let control_flow = flow::control_flow(root);

        let mut issues = issues::unused_symbols(&collected);
        issues.extend(issues::undefined_references(&collected));
        issues.extend(issues::unreachable_code(root));
        issues.extend(issues::infinite_loop_issues(root));
        issues.extend(issues::leak_prone_calls(root));
        issues.sort_by_key(|i| (i.line, i.column));

        debug!(
            symbols = collected.table.len(),
            issues = issues.len(),
            "Completed semantic analysis"
        );

        SemanticReport {
            issues,
            symbols: collected.table.into_vec(),
            data_flow,
            control_flow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn analyze(source: &str, path: &str) -> SemanticReport {
        let root = parse(source, Path::new(path)).unwrap();
        SemanticAnalyzer::new().analyze(&root)
    }

    fn kinds(report: &SemanticReport) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_single_unused_variable() {
        let report = analyze(
            "export function compute(a: number) {\n  const unused = 42;\n  return a * 2;\n}",
            "u.ts",
        );
        assert_eq!(kinds(&report), vec![IssueKind::UnusedVariable]);
        let issue = &report.issues[0];
        assert_eq!(issue.severity, IssueSeverity::Warning);
        assert_eq!(issue.line, 2);
        assert!(issue.message.contains("'unused'"));
    }

    #[test]
    fn test_parameters_are_never_unused() {
        let report = analyze("export function f(a, b) { return 1; }", "p.js");
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_undefined_reference() {
        let report = analyze("export function f() { return missing + Math.PI; }", "r.ts");
        assert_eq!(kinds(&report), vec![IssueKind::UndefinedReference]);
        assert_eq!(report.issues[0].severity, IssueSeverity::Error);
        assert_eq!(report.errors(), 1);
    }

    #[test]
    fn test_unreachable_and_leaks() {
        let report = analyze(
            "export function f(el) {\n  el.addEventListener('click', f);\n  setTimeout(f, 10);\n  return 1;\n  f();\n}",
            "l.js",
        );
        assert_eq!(
            kinds(&report),
            vec![
                IssueKind::MemoryLeak,
                IssueKind::MemoryLeak,
                IssueKind::UnreachableCode
            ]
        );
        assert_eq!(report.control_flow.unreachable_blocks, vec![5]);
        assert_eq!(report.count(IssueSeverity::Info), 2);
    }

    #[test]
    fn test_infinite_loop_issue() {
        let report = analyze("export function spin() { while (true) { tick(); } }\nfunction tick() {}\nspin();", "i.ts");
        assert_eq!(kinds(&report), vec![IssueKind::InfiniteLoop]);
    }

    #[test]
    fn test_jsx_intrinsic_tags_are_not_references() {
        let report = analyze(
            "import { Button } from './button';\nexport const App = () => <div><Button /></div>;",
            "a.tsx",
        );
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_type_only_import_is_used() {
        let report = analyze(
            "import { Foo } from './foo';\nexport function f(x: Foo): Foo { return x; }",
            "t.ts",
        );
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_unresolved_type_names_are_not_errors() {
        let report = analyze(
            "export function wrap<T>(value: T): Box<T> { return { value }; }\nexport interface Named { name: Label }",
            "g.ts",
        );
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_namespace_is_declared() {
        let report = analyze(
            "export namespace Geometry {\n  export const pi = 3.14;\n}",
            "n.ts",
        );
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert!(report
            .symbols
            .iter()
            .any(|s| s.name == "Geometry" && s.kind == SymbolKind::Namespace && s.exported));
    }

    #[test]
    fn test_overload_signatures_declare_the_function() {
        let report = analyze(
            "function pick(a: string): string;\nfunction pick(a: number): number;\nfunction pick(a: any) { return a; }\npick(1);",
            "o.ts",
        );
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn test_report_serializes_issue_type() {
        let report = analyze("const x = 1;", "s.ts");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["type"], "unused_variable");
        assert_eq!(json["symbols"][0]["type"], "number");
    }
}
