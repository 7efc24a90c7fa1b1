//! Semantic issue rules layered over the symbol table and flow records.

use serde::{Deserialize, Serialize};

use super::flow::{infinite_loops, unreachable_statements};
use super::symbols::{is_builtin, Collected, SymbolKind};
use crate::parser::queries::{callee_name, callee_property};
use crate::parser::{for_each_node, AstNode, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnusedVariable,
    UndefinedReference,
    UnreachableCode,
    InfiniteLoop,
    MemoryLeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl SemanticIssue {
    fn at(node: &AstNode, kind: IssueKind, severity: IssueSeverity) -> Self {
        Self {
            kind,
            severity,
            line: node.loc.start.line,
            column: node.loc.start.column,
            message: String::new(),
            fix: None,
        }
    }

    fn message(mut self, message: impl Into<String>, fix: impl Into<String>) -> Self {
        self.message = message.into();
        self.fix = Some(fix.into());
        self
    }
}

/// Declared, never read, not exported and not a parameter.
pub fn unused_symbols(collected: &Collected) -> Vec<SemanticIssue> {
    collected
        .table
        .iter()
        .filter(|s| s.usage_count == 0 && !s.exported && s.kind != SymbolKind::Parameter)
        .map(|s| SemanticIssue {
            kind: IssueKind::UnusedVariable,
            severity: IssueSeverity::Warning,
            line: s.line,
            column: s.column,
            message: format!("{} '{}' is declared but never used", s.kind.label(), s.name),
            fix: Some(format!("Remove unused {} '{}'", s.kind.label().to_lowercase(), s.name)),
        })
        .collect()
}

/// Reads that resolve to no declaration and no builtin global.
pub fn undefined_references(collected: &Collected) -> Vec<SemanticIssue> {
    collected
        .references
        .iter()
        .filter(|r| !r.resolved && !r.type_only && !is_builtin(&r.name))
        .map(|r| SemanticIssue {
            kind: IssueKind::UndefinedReference,
            severity: IssueSeverity::Error,
            line: r.line,
            column: r.column,
            message: format!("'{}' is not defined", r.name),
            fix: Some(format!("Define '{}' or import it", r.name)),
        })
        .collect()
}

pub fn unreachable_code(root: &AstNode) -> Vec<SemanticIssue> {
    unreachable_statements(root)
        .into_iter()
        .map(|node| {
            SemanticIssue::at(node, IssueKind::UnreachableCode, IssueSeverity::Warning)
                .message("Unreachable code detected", "Remove unreachable code")
        })
        .collect()
}

pub fn infinite_loop_issues(root: &AstNode) -> Vec<SemanticIssue> {
    infinite_loops(root)
        .into_iter()
        .map(|node| {
            SemanticIssue::at(node, IssueKind::InfiniteLoop, IssueSeverity::Warning).message(
                "Potential infinite loop detected",
                "Add break condition or modify loop condition",
            )
        })
        .collect()
}

/// Listener and timer registrations whose removal cannot be proven.
pub fn leak_prone_calls(root: &AstNode) -> Vec<SemanticIssue> {
    let mut issues = Vec::new();

    for_each_node(root, |node, _| {
        if node.kind != NodeKind::CallExpression {
            return;
        }
        let issue = SemanticIssue::at(node, IssueKind::MemoryLeak, IssueSeverity::Info);
        if callee_property(node) == Some("addEventListener") {
            issues.push(issue.message(
                "Event listener added - ensure it is removed to prevent memory leaks",
                "Add corresponding removeEventListener call",
            ));
        } else if matches!(callee_name(node), Some("setTimeout" | "setInterval")) {
            issues.push(issue.message(
                "Timer created - ensure it is cleared to prevent memory leaks",
                "Store timer ID and call clearTimeout/clearInterval",
            ));
        }
    });

    issues
}
