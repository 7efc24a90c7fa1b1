//! Analysis orchestration.
//!
//! [`Engine::analyze_source`] runs the per-file pipeline:
//! cache lookup, parse, code metrics, semantic analysis, the dimension
//! fan-out and scoring. [`Engine::analyze_project`] batches that over a
//! set of files.

mod project;

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::analyzers::{
    CodeMetrics, MetricsAnalyzer, SemanticAnalyzer, SemanticIssue, SemanticReport,
};
use crate::config::Config;
use crate::core::{
    AnalysisContext, AnalysisOptions, Deadline, Error, LanguageFamily, Result, SourceUnit,
};
use crate::dimensions::{default_analyzers, Dimension, DimensionAnalyzer, DimensionOutcome};
use crate::parser::{AstNode, Parser};
use crate::score::{CompositeScore, ScoreEngine, ScoreMetadata};

pub use project::{PriorityFile, ProjectAnalysis, ProjectMetrics, SkippedFile};

/// Cyclomatic complexity above which a file is told to split functions.
const ADVICE_CYCLOMATIC: u32 = 15;
/// Cognitive complexity above which a file is told to simplify.
const ADVICE_COGNITIVE: u32 = 20;
/// Dimension score below which the dimension gets its own advice.
const ADVICE_DIMENSION_FLOOR: u8 = 60;

/// Timing and volume of one file analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub analysis_time_ms: u64,
    pub lines_analyzed: usize,
    /// Code smells plus semantic issues.
    pub issues_found: usize,
}

/// Everything known about one analyzed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file_path: PathBuf,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    pub language: LanguageFamily,
    /// Code metrics came from the cache.
    pub cache_hit: bool,
    pub code_metrics: CodeMetrics,
    pub semantic_issues: Vec<SemanticIssue>,
    pub composite_score: CompositeScore,
    /// File-level advice.
    pub recommendations: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
    /// Raw dimension metrics, present when requested.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dimension_metrics: Option<BTreeMap<Dimension, BTreeMap<String, f64>>>,
}

impl FileAnalysis {
    pub fn overall_score(&self) -> u8 {
        self.composite_score.overall
    }
}

/// The analysis pipeline, built once per configuration.
pub struct Engine {
    parser: Parser,
    metrics: MetricsAnalyzer,
    semantic: SemanticAnalyzer,
    dimensions: Vec<Box<dyn DimensionAnalyzer>>,
    scorer: ScoreEngine,
}

impl Engine {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            parser: Parser::new(),
            metrics: MetricsAnalyzer::new(&config.metrics)?,
            semantic: SemanticAnalyzer::new(),
            dimensions: default_analyzers(config),
            scorer: ScoreEngine::new(),
        })
    }

    /// Replace the dimension analyzers.
    pub fn with_dimensions(mut self, dimensions: Vec<Box<dyn DimensionAnalyzer>>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Parse a source unit.
    pub fn parse(&self, unit: &SourceUnit, deadline: &Deadline) -> Result<AstNode> {
        self.parser.parse_unit(unit, deadline.remaining())
    }

    /// Code metrics for a unit, served from the cache when unchanged.
    ///
    /// Returns the metrics and whether they were a cache hit.
    pub fn code_metrics(
        &self,
        ctx: &AnalysisContext<'_>,
        unit: &SourceUnit,
        root: &AstNode,
    ) -> (CodeMetrics, bool) {
        if let Some(metrics) = ctx.cache.and_then(|c| c.get(&unit.path, &unit.content)) {
            return (metrics, true);
        }
        let metrics = self.metrics.analyze(root, &unit.content);
        if let Some(cache) = ctx.cache {
            cache.insert(&unit.path, &unit.content, metrics.clone());
        }
        (metrics, false)
    }

    /// Semantic analysis of an already parsed unit.
    pub fn semantic(&self, root: &AstNode) -> SemanticReport {
        self.semantic.analyze(root)
    }

    /// Run every dimension analyzer in parallel on the same tree.
    ///
    /// A panicking analyzer is reported as a failed dimension.
    pub fn dimensions(
        &self,
        root: &AstNode,
        source: &str,
    ) -> Vec<(Dimension, Result<DimensionOutcome>)> {
        self.dimensions
            .par_iter()
            .map(|analyzer| {
                let dimension = analyzer.dimension();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    analyzer.analyze(root, source)
                }))
                .unwrap_or_else(|payload| {
                    Err(Error::analyzer(
                        dimension.as_str(),
                        format!("panicked: {}", panic_message(payload.as_ref())),
                    ))
                });
                (dimension, outcome)
            })
            .collect()
    }

    /// Analyze a single file. Parse errors and timeouts propagate.
    pub fn analyze_source(
        &self,
        ctx: &AnalysisContext<'_>,
        unit: &SourceUnit,
        options: &AnalysisOptions,
    ) -> Result<FileAnalysis> {
        let span = debug_span!(parent: &ctx.span, "analyze_file", path = %unit.path.display());
        let _guard = span.enter();

        let weights = options
            .weights
            .clone()
            .unwrap_or_else(|| ctx.config.weights.clone());
        weights.validate()?;

        let deadline = Deadline::start(options.timeout);
        let root = self.parse(unit, &deadline)?;
        deadline.check(&unit.path)?;

        let (code_metrics, cache_hit) = self.code_metrics(ctx, unit, &root);
        deadline.check(&unit.path)?;

        let semantic = self.semantic(&root);
        deadline.check(&unit.path)?;

        let outcomes = self.dimensions(&root, &unit.content);
        deadline.check(&unit.path)?;

        let dimension_metrics = options.include_metrics.then(|| {
            outcomes
                .iter()
                .filter_map(|(dimension, outcome)| match outcome {
                    Ok(DimensionOutcome::Scored(result)) => {
                        Some((*dimension, result.metrics.clone()))
                    }
                    _ => None,
                })
                .collect()
        });

        let analysis_time_ms = deadline.elapsed().as_millis() as u64;
        let metadata = ScoreMetadata {
            lines_of_code: unit.total_lines(),
            files_analyzed: 1,
            analysis_time_ms,
            timestamp: Utc::now(),
        };
        let composite_score = self.scorer.score(outcomes, &weights, metadata);
        let recommendations = file_advice(&code_metrics, &semantic, &composite_score);

        debug!(
            score = composite_score.overall,
            cache_hit,
            elapsed_ms = analysis_time_ms,
            "Analyzed file"
        );

        Ok(FileAnalysis {
            file_path: unit.path.clone(),
            file_name: unit.file_name(),
            timestamp: composite_score.metadata.timestamp,
            language: unit.language.family(),
            cache_hit,
            performance_metrics: PerformanceMetrics {
                analysis_time_ms,
                lines_analyzed: code_metrics.lines_of_code,
                issues_found: code_metrics.code_smells.len() + semantic.issues.len(),
            },
            code_metrics,
            semantic_issues: semantic.issues,
            composite_score,
            recommendations,
            dimension_metrics,
        })
    }

    /// Load a file from disk and analyze it.
    pub fn analyze_path(
        &self,
        ctx: &AnalysisContext<'_>,
        path: &Path,
        options: &AnalysisOptions,
    ) -> Result<FileAnalysis> {
        let unit = SourceUnit::load(path)?;
        self.analyze_source(ctx, &unit, options)
    }
}

/// Human-readable advice for one file, most urgent first.
pub fn file_advice(
    metrics: &CodeMetrics,
    semantic: &SemanticReport,
    score: &CompositeScore,
) -> Vec<String> {
    let mut advice = Vec::new();

    let critical: Vec<_> = metrics.critical_smells().collect();
    if !critical.is_empty() {
        advice.push(format!(
            "Fix {} critical code issues immediately",
            critical.len()
        ));
        for smell in critical {
            advice.push(format!("  - Line {}: {}", smell.line, smell.suggestion));
        }
    }

    let errors = semantic.errors();
    if errors > 0 {
        advice.push(format!("Resolve {errors} semantic errors"));
    }

    if metrics.cyclomatic_complexity > ADVICE_CYCLOMATIC {
        advice.push("Reduce cyclomatic complexity by breaking down large functions".to_string());
    }
    if metrics.cognitive_complexity > ADVICE_COGNITIVE {
        advice.push("Simplify cognitive complexity with clearer logic flow".to_string());
    }

    let below = |dimension: Dimension| {
        score
            .breakdown
            .get(&dimension)
            .is_some_and(|s| *s < ADVICE_DIMENSION_FLOOR)
    };
    if below(Dimension::Movement) {
        advice.push("Improve code flow by reducing nested complexity".to_string());
    }
    if below(Dimension::Balance) {
        advice.push("Balance code structure with better function/class distribution".to_string());
    }
    if below(Dimension::Simplicity) {
        advice.push("Enhance simplicity by reducing cognitive load".to_string());
    }

    if score.overall < 70 {
        advice.push("Focus on code quality fundamentals: naming, structure, and testing".to_string());
    } else if score.overall > 85 {
        advice.push("Excellent code quality! Consider mentoring others with your practices".to_string());
    }

    advice
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AnalysisCache;
    use crate::core::Error;
    use crate::score::{DimensionStatus, DimensionWeights};
    use std::time::Duration;

    struct Exploding;

    impl DimensionAnalyzer for Exploding {
        fn dimension(&self) -> Dimension {
            Dimension::Contrast
        }

        fn analyze(&self, _ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
            Err(Error::analyzer("contrast", "exploded"))
        }
    }

    struct Panicking;

    impl DimensionAnalyzer for Panicking {
        fn dimension(&self) -> Dimension {
            Dimension::Unity
        }

        fn analyze(&self, _ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
            panic!("unity analyzer bug")
        }
    }

    fn unit(path: &str, source: &str) -> SourceUnit {
        SourceUnit::new(path, source).unwrap()
    }

    #[test]
    fn test_simple_file_end_to_end() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let ctx = AnalysisContext::new(&config);
        let analysis = engine
            .analyze_source(
                &ctx,
                &unit("src/add.ts", "export function add(a: number, b: number) {\n  return a + b;\n}\n"),
                &AnalysisOptions::new(),
            )
            .unwrap();

        assert_eq!(analysis.file_name, "add.ts");
        assert_eq!(analysis.code_metrics.cyclomatic_complexity, 1);
        assert!(analysis.semantic_issues.is_empty());
        assert!(analysis.composite_score.overall >= 85);
        assert!(analysis.composite_score.breakdown[&Dimension::Movement] >= 95);
        assert_eq!(analysis.composite_score.metadata.lines_of_code, 3);
        assert!(!analysis.cache_hit);
        assert!(analysis.dimension_metrics.is_none());
    }

    #[test]
    fn test_parse_error_propagates() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let ctx = AnalysisContext::new(&config);
        let err = engine
            .analyze_source(&ctx, &unit("bad.ts", "function ( {"), &AnalysisOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_second_run_hits_cache() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let cache = AnalysisCache::new(config.cache.clone());
        let ctx = AnalysisContext::new(&config).with_cache(&cache);
        let source = unit("a.js", "function f(x) { if (x) { return 1; } return 2; }\nf(1);\n");

        let first = engine.analyze_source(&ctx, &source, &AnalysisOptions::new()).unwrap();
        let second = engine.analyze_source(&ctx, &source, &AnalysisOptions::new()).unwrap();
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.code_metrics, second.code_metrics);

        let changed = unit("a.js", "function f(x) { if (x) { return 1; } return 3; }\nf(1);\n");
        let third = engine.analyze_source(&ctx, &changed, &AnalysisOptions::new()).unwrap();
        assert!(!third.cache_hit);
    }

    #[test]
    fn test_failing_dimension_is_neutral() {
        let config = Config::default();
        let engine = Engine::new(&config)
            .unwrap()
            .with_dimensions(vec![Box::new(Exploding)]);
        let ctx = AnalysisContext::new(&config);
        let analysis = engine
            .analyze_source(&ctx, &unit("x.ts", "export const x = 1;"), &AnalysisOptions::new())
            .unwrap();
        assert_eq!(
            analysis.composite_score.status[&Dimension::Contrast],
            DimensionStatus::Failed
        );
        assert_eq!(analysis.composite_score.overall, 85);
    }

    #[test]
    fn test_panicking_dimension_does_not_abort_siblings() {
        let config = Config::default();
        let mut dimensions = default_analyzers(&config);
        dimensions.retain(|a| a.dimension() != Dimension::Unity);
        dimensions.push(Box::new(Panicking));
        let engine = Engine::new(&config).unwrap().with_dimensions(dimensions);
        let ctx = AnalysisContext::new(&config);

        let root = engine
            .parse(&unit("p.ts", "export const p = 1;"), &Deadline::start(None))
            .unwrap();
        let outcomes = engine.dimensions(&root, "export const p = 1;");
        let (_, unity) = outcomes
            .iter()
            .find(|(d, _)| *d == Dimension::Unity)
            .unwrap();
        match unity {
            Err(Error::Analyzer { analyzer, message }) => {
                assert_eq!(*analyzer, "unity");
                assert!(message.contains("unity analyzer bug"), "{message}");
            }
            other => panic!("expected analyzer error, got {other:?}"),
        }

        let analysis = engine
            .analyze_source(&ctx, &unit("p.ts", "export const p = 1;"), &AnalysisOptions::new())
            .unwrap();
        assert_eq!(
            analysis.composite_score.status[&Dimension::Unity],
            DimensionStatus::Failed
        );
        assert_eq!(
            analysis.composite_score.status[&Dimension::Movement],
            DimensionStatus::Scored
        );
    }

    #[test]
    fn test_zero_timeout_fails_with_timeout() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let ctx = AnalysisContext::new(&config);
        let options = AnalysisOptions::new().with_timeout(Duration::ZERO);
        let err = engine
            .analyze_source(&ctx, &unit("t.ts", "export const t = 1;"), &options)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_invalid_weight_override_is_rejected() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let ctx = AnalysisContext::new(&config);
        let options = AnalysisOptions::new().with_weights(DimensionWeights {
            movement: -1.0,
            ..DimensionWeights::default()
        });
        let err = engine
            .analyze_source(&ctx, &unit("w.ts", "export const w = 1;"), &options)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_include_metrics() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let ctx = AnalysisContext::new(&config);
        let analysis = engine
            .analyze_source(
                &ctx,
                &unit("m.ts", "export function f() { return 1; }"),
                &AnalysisOptions::new().with_metrics(true),
            )
            .unwrap();
        let metrics = analysis.dimension_metrics.unwrap();
        assert!(metrics[&Dimension::Movement].contains_key("cyclomaticComplexity"));
        assert!(!metrics.contains_key(&Dimension::Contrast));
    }

    #[test]
    fn test_file_advice_for_critical_smell() {
        let config = Config::default();
        let engine = Engine::new(&config).unwrap();
        let ctx = AnalysisContext::new(&config);
        let analysis = engine
            .analyze_source(
                &ctx,
                &unit("r.js", "export function roll() {\n  return Math.random();\n}\n"),
                &AnalysisOptions::new(),
            )
            .unwrap();
        assert_eq!(analysis.recommendations[0], "Fix 1 critical code issues immediately");
        assert!(analysis.recommendations[1].starts_with("  - Line 2: "));
    }
}
