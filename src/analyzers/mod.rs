//! Per-file analyzers: complexity, Halstead, smells, code metrics and
//! semantic analysis.

pub mod complexity;
pub mod halstead;
pub mod metrics;
pub mod semantic;
pub mod smells;

// Re-export analyzer types for convenience
pub use metrics::{ClassAnalysis, CodeMetrics, FunctionAnalysis, MetricsAnalyzer};
pub use semantic::{IssueSeverity, SemanticAnalyzer, SemanticIssue, SemanticReport};
pub use smells::{CodeSmell, SmellDetector, SmellKind, SmellSeverity};
