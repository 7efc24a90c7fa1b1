//! Simplicity: how much effort each function takes to read.
//!
//! Driven by per-function cognitive complexity and by conditions that
//! chain too many logical connectives.

use std::collections::BTreeMap;

use crate::analyzers::complexity;
use crate::analyzers::smells::{condition_of, count_connectives};
use crate::config::SimplicityConfig;
use crate::core::Result;
use crate::parser::queries::function_sites;
use crate::parser::{for_each_node, AstNode};

use super::{
    mean, Dimension, DimensionAnalyzer, DimensionOutcome, PrincipleAnalysisResult,
    Recommendation, RecommendationSeverity,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimplicityMetrics {
    /// `(function name, cognitive complexity)` in source order.
    pub cognitive: Vec<(String, u32)>,
    pub complex_conditions: usize,
}

#[derive(Debug, Clone)]
pub struct SimplicityAnalyzer {
    config: SimplicityConfig,
    max_connectives: usize,
}

impl Default for SimplicityAnalyzer {
    fn default() -> Self {
        Self::new(SimplicityConfig::default(), 3)
    }
}

impl SimplicityAnalyzer {
    pub fn new(config: SimplicityConfig, max_connectives: usize) -> Self {
        Self {
            config,
            max_connectives,
        }
    }

    pub fn measure(&self, root: &AstNode) -> SimplicityMetrics {
        let cognitive = function_sites(root)
            .into_iter()
            .map(|site| {
                (
                    site.name.to_string(),
                    complexity::analyze_function(site.node).cognitive,
                )
            })
            .collect();

        let mut complex_conditions = 0;
        for_each_node(root, |node, _| {
            if condition_of(node).is_some_and(|c| count_connectives(c) > self.max_connectives) {
                complex_conditions += 1;
            }
        });

        SimplicityMetrics {
            cognitive,
            complex_conditions,
        }
    }

    fn excess(&self, m: &SimplicityMetrics) -> u32 {
        m.cognitive
            .iter()
            .map(|(_, c)| c.saturating_sub(self.config.cognitive_threshold))
            .sum()
    }

    pub fn score(&self, m: &SimplicityMetrics) -> f64 {
        let mut score = 100.0;
        score -= (f64::from(self.excess(m)) * 2.0).min(40.0);
        score -= (m.complex_conditions as f64 * 5.0).min(20.0);
        score
    }

    pub fn recommendations(&self, m: &SimplicityMetrics) -> Vec<Recommendation> {
        let threshold = self.config.cognitive_threshold;
        let mut recs: Vec<Recommendation> = m
            .cognitive
            .iter()
            .filter(|(_, c)| *c > threshold)
            .map(|(name, c)| {
                let severity = if *c > threshold * 2 {
                    RecommendationSeverity::Critical
                } else {
                    RecommendationSeverity::Warning
                };
                Recommendation::new(
                    Dimension::Simplicity,
                    severity,
                    format!(
                        "Function '{name}' has cognitive complexity {c} (max recommended: {threshold}). Flatten nested logic."
                    ),
                    ((c - threshold) * 2).min(20),
                )
                .with_fix("Replace nested conditionals with guard clauses and helper functions")
            })
            .collect();

        if m.complex_conditions > 0 {
            recs.push(
                Recommendation::new(
                    Dimension::Simplicity,
                    RecommendationSeverity::Warning,
                    format!(
                        "Found {} condition(s) with more than {} logical operators. Extract them into well-named predicates.",
                        m.complex_conditions, self.max_connectives
                    ),
                    (m.complex_conditions as u32 * 5).min(15),
                )
                .with_fix("Move the condition into a function whose name states the intent"),
            );
        }

        recs
    }
}

impl DimensionAnalyzer for SimplicityAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Simplicity
    }

    fn analyze(&self, ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
        let m = self.measure(ast);
        let values: Vec<f64> = m.cognitive.iter().map(|(_, c)| f64::from(*c)).collect();
        let metrics = BTreeMap::from([
            ("avgCognitiveComplexity".to_string(), mean(&values)),
            (
                "maxCognitiveComplexity".to_string(),
                values.iter().copied().fold(0.0, f64::max),
            ),
            ("complexConditions".to_string(), m.complex_conditions as f64),
        ]);
        Ok(DimensionOutcome::Scored(PrincipleAnalysisResult::new(
            self.score(&m),
            self.recommendations(&m),
            metrics,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn run(source: &str) -> PrincipleAnalysisResult {
        let root = parse(source, Path::new("s.ts")).unwrap();
        match SimplicityAnalyzer::default().analyze(&root, source).unwrap() {
            DimensionOutcome::Scored(result) => result,
            DimensionOutcome::NotYetImplemented => panic!("simplicity is implemented"),
        }
    }

    #[test]
    fn test_flat_code_is_simple() {
        let result = run("function add(a, b) { return a + b; }");
        assert_eq!(result.score, 100);
        assert_eq!(result.metrics["maxCognitiveComplexity"], 0.0);
    }

    #[test]
    fn test_deep_nesting_costs_cognitive_budget() {
        // 1 + 2 + 3 + 4 + 5 + 6 = 21
        let source = "function deep(a) {\n  if (a) { if (a) { if (a) { if (a) { if (a) { if (a) { a--; } } } } } }\n}";
        let result = run(source);
        assert_eq!(result.metrics["maxCognitiveComplexity"], 21.0);
        assert_eq!(result.score, 88);
        let rec = &result.recommendations[0];
        assert!(rec.message.starts_with("Function 'deep' has cognitive complexity 21"));
        assert_eq!(rec.severity, RecommendationSeverity::Warning);
        assert_eq!(rec.estimated_impact, 12);
    }

    #[test]
    fn test_complex_condition() {
        let result = run("function ok(a, b, c, d, e) { return (a && b) || (c && d) || e ? 1 : 0; }");
        assert_eq!(result.metrics["complexConditions"], 1.0);
        assert_eq!(result.score, 95);
        assert!(result.recommendations[0]
            .message
            .starts_with("Found 1 condition(s) with more than 3 logical operators"));
    }
}
