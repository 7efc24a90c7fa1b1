//! Balance: how evenly code is distributed across functions and classes.

use std::collections::BTreeMap;

use crate::config::BalanceConfig;
use crate::core::Result;
use crate::parser::queries::{count_lines, find_all_class_like_nodes, find_all_function_like_nodes};
use crate::parser::{AstNode, NodeKind};

use super::{
    coefficient_of_variation, mean, variance, Dimension, DimensionAnalyzer, DimensionOutcome,
    PrincipleAnalysisResult, Recommendation, RecommendationSeverity,
};

/// Samples needed before consistent sizing earns a bonus.
const MIN_SAMPLES_FOR_BONUS: usize = 3;
/// Samples needed before consistent sizing is praised.
const MIN_SAMPLES_FOR_PRAISE: usize = 5;
/// Function CV above which the spread is called out.
const WIDE_FUNCTION_CV: f64 = 1.0;
/// Class CV above which the spread is called out.
const WIDE_CLASS_CV: f64 = 0.8;

/// Size distribution of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceMetrics {
    pub lines_per_function: Vec<f64>,
    pub methods_per_class: Vec<f64>,
    pub function_cv: f64,
    pub class_cv: f64,
}

impl BalanceMetrics {
    fn long_functions(&self, limit: usize) -> Vec<f64> {
        self.lines_per_function
            .iter()
            .copied()
            .filter(|&lines| lines > limit as f64)
            .collect()
    }

    fn tiny_share(&self, limit: usize) -> f64 {
        if self.lines_per_function.is_empty() {
            return 0.0;
        }
        let tiny = self
            .lines_per_function
            .iter()
            .filter(|&&lines| lines < limit as f64)
            .count();
        tiny as f64 / self.lines_per_function.len() as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct BalanceAnalyzer {
    config: BalanceConfig,
}

impl BalanceAnalyzer {
    pub fn new(config: BalanceConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, root: &AstNode) -> BalanceMetrics {
        let lines_per_function: Vec<f64> = find_all_function_like_nodes(root)
            .into_iter()
            .map(|f| count_lines(f) as f64)
            .collect();
        let methods_per_class: Vec<f64> = find_all_class_like_nodes(root)
            .into_iter()
            .map(|c| method_count(c) as f64)
            .collect();

        BalanceMetrics {
            function_cv: coefficient_of_variation(&lines_per_function),
            class_cv: coefficient_of_variation(&methods_per_class),
            lines_per_function,
            methods_per_class,
        }
    }

    pub fn score(&self, m: &BalanceMetrics) -> f64 {
        let cfg = &self.config;
        let mut score = 100.0;

        if m.function_cv > cfg.function_cv_threshold {
            score -= ((m.function_cv - cfg.function_cv_threshold) * 30.0).min(25.0);
        }
        if m.class_cv > cfg.class_cv_threshold {
            score -= ((m.class_cv - cfg.class_cv_threshold) * 25.0).min(20.0);
        }
        if m.function_cv < cfg.consistency_cv && m.lines_per_function.len() > MIN_SAMPLES_FOR_BONUS
        {
            score += 10.0;
        }
        score -= m.long_functions(cfg.long_function_lines).len() as f64 * 5.0;
        if m.tiny_share(cfg.tiny_function_lines) > cfg.tiny_function_share {
            score -= 10.0;
        }

        score
    }

    pub fn recommendations(&self, m: &BalanceMetrics) -> Vec<Recommendation> {
        let cfg = &self.config;
        let mut recs = Vec::new();

        if m.function_cv > WIDE_FUNCTION_CV {
            recs.push(
                Recommendation::new(
                    Dimension::Balance,
                    RecommendationSeverity::Warning,
                    format!(
                        "Function sizes vary widely (CV: {:.2}). Split large functions to match average size.",
                        m.function_cv
                    ),
                    impact((m.function_cv - cfg.function_cv_threshold) * 20.0, 20),
                )
                .with_fix("Refactor large functions into smaller, more focused functions"),
            );
        }

        if m.class_cv > WIDE_CLASS_CV && !m.methods_per_class.is_empty() {
            recs.push(
                Recommendation::new(
                    Dimension::Balance,
                    RecommendationSeverity::Warning,
                    format!(
                        "Class sizes vary widely (CV: {:.2}). Consider splitting large classes.",
                        m.class_cv
                    ),
                    impact((m.class_cv - cfg.class_cv_threshold) * 20.0, 15),
                )
                .with_fix("Extract responsibilities from large classes into separate classes"),
            );
        }

        let long = m.long_functions(cfg.long_function_lines);
        if !long.is_empty() {
            let severity = if long.len() > 2 {
                RecommendationSeverity::Warning
            } else {
                RecommendationSeverity::Info
            };
            recs.push(
                Recommendation::new(
                    Dimension::Balance,
                    severity,
                    format!(
                        "Found {} function(s) with {}+ lines (avg: {} LOC). Consider extracting logic.",
                        long.len(),
                        cfg.long_function_lines,
                        mean(&long).round()
                    ),
                    long.len() as u32 * 5,
                )
                .with_fix("Break down long functions into smaller helper functions"),
            );
        }

        let tiny_share = m.tiny_share(cfg.tiny_function_lines);
        if tiny_share > cfg.tiny_function_share {
            recs.push(
                Recommendation::new(
                    Dimension::Balance,
                    RecommendationSeverity::Info,
                    format!(
                        "{}% of functions are very small (< {} LOC). Consider if they're adding value or just noise.",
                        (tiny_share * 100.0).round(),
                        cfg.tiny_function_lines
                    ),
                    5,
                )
                .with_fix("Review tiny functions - some may be better as inline code"),
            );
        }

        if m.function_cv < cfg.consistency_cv && m.lines_per_function.len() > MIN_SAMPLES_FOR_PRAISE {
            recs.push(Recommendation::new(
                Dimension::Balance,
                RecommendationSeverity::Info,
                "✓ Excellent consistency in function sizes!",
                0,
            ));
        }

        recs
    }
}

impl DimensionAnalyzer for BalanceAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Balance
    }

    fn analyze(&self, ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
        let m = self.measure(ast);
        let metrics = BTreeMap::from([
            ("functionSizeVariance".to_string(), variance(&m.lines_per_function)),
            ("classSizeVariance".to_string(), variance(&m.methods_per_class)),
            ("functionCV".to_string(), m.function_cv),
            ("classCV".to_string(), m.class_cv),
            ("avgFunctionSize".to_string(), mean(&m.lines_per_function)),
            ("avgClassSize".to_string(), mean(&m.methods_per_class)),
        ]);
        Ok(DimensionOutcome::Scored(PrincipleAnalysisResult::new(
            self.score(&m),
            self.recommendations(&m),
            metrics,
        )))
    }
}

fn method_count(class: &AstNode) -> usize {
    class
        .child("body")
        .map(|body| {
            body.children()
                .filter(|member| member.kind == NodeKind::MethodDefinition)
                .count()
        })
        .unwrap_or(0)
}

fn impact(raw: f64, cap: u32) -> u32 {
    (raw.round().max(0.0) as u32).min(cap)
}
