//! Project-level rollups over many files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use super::{Engine, FileAnalysis};
use crate::analyzers::IssueSeverity;
use crate::core::{AnalysisContext, AnalysisOptions, Result, SourceUnit};

/// Files below this score are refactoring candidates.
const PRIORITY_SCORE: u8 = 50;
/// Refactoring candidates listed per project.
const MAX_PRIORITY_FILES: usize = 5;

/// A file left out of a project rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Averages and totals across analyzed files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    /// Rounded mean of file cyclomatic complexity.
    pub complexity: u32,
    /// Rounded mean maintainability index.
    pub maintainability: u32,
    pub technical_debt: u32,
    /// Percentage of analyzed files that look like tests.
    pub test_coverage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityFile {
    pub file_name: String,
    pub file_path: PathBuf,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project_path: PathBuf,
    pub file_count: usize,
    pub total_lines_of_code: usize,
    pub average_quality: f64,
    /// Critical smells plus semantic errors.
    pub critical_issues: usize,
    pub project_metrics: ProjectMetrics,
    pub recommendations: Vec<String>,
    pub priority_files: Vec<PriorityFile>,
    pub files: Vec<FileAnalysis>,
    pub skipped: Vec<SkippedFile>,
    pub analysis_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl Engine {
    /// Analyze `paths` in fixed-size batches, each batch in parallel.
    ///
    /// Files that fail to load, parse or finish in time are skipped with a
    /// warning; other errors abort the run.
    pub fn analyze_project(
        &self,
        ctx: &AnalysisContext<'_>,
        root: &Path,
        paths: &[PathBuf],
        options: &AnalysisOptions,
    ) -> Result<ProjectAnalysis> {
        let span = info_span!(parent: &ctx.span, "analyze_project", root = %root.display());
        let _guard = span.enter();
        let started = Instant::now();

        options
            .weights
            .as_ref()
            .unwrap_or(&ctx.config.weights)
            .validate()?;

        let batch_size = ctx.config.project.batch_size.max(1);
        let batches = paths.len().div_ceil(batch_size);
        let mut files = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        let mut done = 0;

        for (index, batch) in paths.chunks(batch_size).enumerate() {
            let results: Vec<(&PathBuf, Result<FileAnalysis>)> = batch
                .par_iter()
                .map(|path| {
                    let result = SourceUnit::load(path)
                        .and_then(|unit| self.analyze_source(ctx, &unit, options));
                    (path, result)
                })
                .collect();

            for (path, result) in results {
                done += 1;
                ctx.report_progress(done, paths.len());
                match result {
                    Ok(analysis) => files.push(analysis),
                    Err(e) if e.is_file_local() => {
                        warn!(path = %path.display(), error = %e, "Skipping file");
                        skipped.push(SkippedFile {
                            path: path.clone(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }

            info!(batch = index + 1, batches, "Analyzed batch");
        }

        let project_metrics = project_metrics(&files);
        let priority_files = priority_files(&files);
        let recommendations = if files.is_empty() {
            Vec::new()
        } else {
            project_advice(&project_metrics, &priority_files)
        };

        let average_quality = if files.is_empty() {
            0.0
        } else {
            files.iter().map(|f| f64::from(f.overall_score())).sum::<f64>() / files.len() as f64
        };
        let critical_issues = files
            .iter()
            .map(|f| {
                f.code_metrics.critical_smells().count()
                    + f.semantic_issues
                        .iter()
                        .filter(|i| i.severity == IssueSeverity::Error)
                        .count()
            })
            .sum();

        let analysis_time_ms = started.elapsed().as_millis() as u64;
        info!(
            files = files.len(),
            skipped = skipped.len(),
            elapsed_ms = analysis_time_ms,
            "Project analysis complete"
        );

        Ok(ProjectAnalysis {
            project_path: root.to_path_buf(),
            file_count: files.len(),
            total_lines_of_code: files.iter().map(|f| f.code_metrics.lines_of_code).sum(),
            average_quality,
            critical_issues,
            project_metrics,
            recommendations,
            priority_files,
            files,
            skipped,
            analysis_time_ms,
            timestamp: Utc::now(),
        })
    }
}

/// Whether a file looks like a test by name or location.
pub fn is_test_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.contains(".test.") || name.contains(".spec.") {
        return true;
    }
    path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("test" | "tests" | "__tests__")
        )
    })
}

fn project_metrics(files: &[FileAnalysis]) -> ProjectMetrics {
    if files.is_empty() {
        return ProjectMetrics::default();
    }
    let n = files.len() as f64;
    let complexity = files
        .iter()
        .map(|f| f64::from(f.code_metrics.cyclomatic_complexity))
        .sum::<f64>()
        / n;
    let maintainability = files
        .iter()
        .map(|f| f.code_metrics.maintainability_index)
        .sum::<f64>()
        / n;
    let tests = files.iter().filter(|f| is_test_file(&f.file_path)).count();

    ProjectMetrics {
        complexity: complexity.round() as u32,
        maintainability: maintainability.round() as u32,
        technical_debt: files.iter().map(|f| f.code_metrics.technical_debt).sum(),
        test_coverage: (tests as f64 / n * 100.0).round() as u32,
    }
}

fn priority_files(files: &[FileAnalysis]) -> Vec<PriorityFile> {
    let mut worst: Vec<PriorityFile> = files
        .iter()
        .filter(|f| f.overall_score() < PRIORITY_SCORE)
        .map(|f| PriorityFile {
            file_name: f.file_name.clone(),
            file_path: f.file_path.clone(),
            score: f.overall_score(),
        })
        .collect();
    worst.sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.file_path.cmp(&b.file_path)));
    worst.truncate(MAX_PRIORITY_FILES);
    worst
}

fn project_advice(metrics: &ProjectMetrics, priority: &[PriorityFile]) -> Vec<String> {
    let mut advice = Vec::new();
    if metrics.complexity > 10 {
        advice.push("Project complexity is high - consider architectural refactoring".to_string());
    }
    if metrics.maintainability < 60 {
        advice.push("Improve maintainability through better documentation and structure".to_string());
    }
    if metrics.test_coverage < 30 {
        advice.push(
            "Increase test coverage - current coverage is below recommended threshold".to_string(),
        );
    }
    if metrics.technical_debt > 50 {
        advice.push("Address technical debt systematically to prevent future issues".to_string());
    }
    if !priority.is_empty() {
        advice.push("Priority files for refactoring:".to_string());
        for file in priority {
            advice.push(format!("  - {} (Score: {:.1})", file.file_name, f64::from(file.score)));
        }
    }
    advice
}
