//! Proportion: whether functions and the file itself stay a readable size.

use std::collections::BTreeMap;

use crate::config::ProportionConfig;
use crate::core::{count_code_lines, Result};
use crate::parser::queries::{count_lines, function_sites, parameter_count};
use crate::parser::AstNode;

use super::{
    mean, Dimension, DimensionAnalyzer, DimensionOutcome, PrincipleAnalysisResult,
    Recommendation, RecommendationSeverity,
};

#[derive(Debug, Clone, PartialEq)]
struct Unit {
    name: String,
    lines: usize,
    parameters: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProportionMetrics {
    units: Vec<Unit>,
    pub file_lines: usize,
}

impl ProportionMetrics {
    fn longest(&self) -> Option<&Unit> {
        self.units.iter().max_by_key(|u| u.lines)
    }

    fn widest(&self) -> Option<&Unit> {
        self.units.iter().max_by_key(|u| u.parameters)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProportionAnalyzer {
    config: ProportionConfig,
}

impl ProportionAnalyzer {
    pub fn new(config: ProportionConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, root: &AstNode, source: &str) -> ProportionMetrics {
        ProportionMetrics {
            units: function_sites(root)
                .into_iter()
                .map(|site| Unit {
                    name: site.name.to_string(),
                    lines: count_lines(site.node),
                    parameters: parameter_count(site.node),
                })
                .collect(),
            file_lines: count_code_lines(source),
        }
    }

    fn long_units(&self, m: &ProportionMetrics) -> usize {
        m.units
            .iter()
            .filter(|u| u.lines > self.config.max_function_lines)
            .count()
    }

    fn wide_units(&self, m: &ProportionMetrics) -> usize {
        m.units
            .iter()
            .filter(|u| u.parameters > self.config.max_parameters)
            .count()
    }

    fn file_overrun(&self, m: &ProportionMetrics) -> f64 {
        let max = self.config.max_file_lines.max(1);
        if m.file_lines <= max {
            return 0.0;
        }
        (m.file_lines - max) as f64 / max as f64
    }

    pub fn score(&self, m: &ProportionMetrics) -> f64 {
        let mut score = 100.0;
        score -= (self.long_units(m) as f64 * 5.0).min(30.0);
        score -= (self.wide_units(m) as f64 * 4.0).min(20.0);
        score -= (self.file_overrun(m) * 20.0).min(20.0);
        score
    }

    pub fn recommendations(&self, m: &ProportionMetrics) -> Vec<Recommendation> {
        let cfg = &self.config;
        let mut recs = Vec::new();

        let long = self.long_units(m);
        if let Some(longest) = m.longest().filter(|_| long > 0) {
            recs.push(
                Recommendation::new(
                    Dimension::Proportion,
                    RecommendationSeverity::Warning,
                    format!(
                        "{long} function(s) exceed {} lines (longest: '{}' with {} lines)",
                        cfg.max_function_lines, longest.name, longest.lines
                    ),
                    (long as u32 * 5).min(15),
                )
                .with_fix("Split long functions along their logical steps"),
            );
        }

        let wide = self.wide_units(m);
        if let Some(widest) = m.widest().filter(|_| wide > 0) {
            recs.push(
                Recommendation::new(
                    Dimension::Proportion,
                    RecommendationSeverity::Warning,
                    format!(
                        "{wide} function(s) take more than {} parameters ('{}' takes {})",
                        cfg.max_parameters, widest.name, widest.parameters
                    ),
                    (wide as u32 * 4).min(10),
                )
                .with_fix("Group related parameters into an options object"),
            );
        }

        let overrun = self.file_overrun(m);
        if overrun > 0.0 {
            let severity = if overrun >= 1.0 {
                RecommendationSeverity::Warning
            } else {
                RecommendationSeverity::Info
            };
            recs.push(
                Recommendation::new(
                    Dimension::Proportion,
                    severity,
                    format!(
                        "File has {} lines of code (recommended max: {}). Split it into focused modules.",
                        m.file_lines, cfg.max_file_lines
                    ),
                    (overrun * 20.0).round().min(20.0) as u32,
                )
                .with_fix("Move cohesive groups of functions into their own modules"),
            );
        }

        recs
    }
}

impl DimensionAnalyzer for ProportionAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Proportion
    }

    fn analyze(&self, ast: &AstNode, source: &str) -> Result<DimensionOutcome> {
        let m = self.measure(ast, source);
        let lines: Vec<f64> = m.units.iter().map(|u| u.lines as f64).collect();
        let params: Vec<f64> = m.units.iter().map(|u| u.parameters as f64).collect();
        let metrics = BTreeMap::from([
            ("fileLines".to_string(), m.file_lines as f64),
            ("avgFunctionLines".to_string(), mean(&lines)),
            ("maxFunctionLines".to_string(), m.longest().map_or(0.0, |u| u.lines as f64)),
            ("avgParameters".to_string(), mean(&params)),
            ("maxParameters".to_string(), m.widest().map_or(0.0, |u| u.parameters as f64)),
            ("longFunctions".to_string(), self.long_units(&m) as f64),
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

    fn run(analyzer: &ProportionAnalyzer, source: &str) -> PrincipleAnalysisResult {
        let root = parse(source, Path::new("p.ts")).unwrap();
        match analyzer.analyze(&root, source).unwrap() {
            DimensionOutcome::Scored(result) => result,
            DimensionOutcome::NotYetImplemented => panic!("proportion is implemented"),
        }
    }

    #[test]
    fn test_small_file_is_perfect() {
        let result = run(
            &ProportionAnalyzer::default(),
            "function add(a: number, b: number) { return a + b; }",
        );
        assert_eq!(result.score, 100);
        assert_eq!(result.metrics["maxParameters"], 2.0);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_too_many_parameters() {
        let result = run(
            &ProportionAnalyzer::default(),
            "function build(a, b, c, d, e, f) { return a; }",
        );
        assert_eq!(result.score, 96);
        assert_eq!(
            result.recommendations[0].message,
            "1 function(s) take more than 4 parameters ('build' takes 6)"
        );
    }

    #[test]
    fn test_long_function_and_file() {
        let analyzer = ProportionAnalyzer::new(ProportionConfig {
            max_function_lines: 3,
            max_parameters: 4,
            max_file_lines: 5,
        });
        let body = "  x++;\n".repeat(8);
        let source = format!("function grow(x) {{\n{body}  return x;\n}}\n");
        let result = run(&analyzer, &source);
        assert_eq!(result.metrics["longFunctions"], 1.0);
        assert_eq!(result.metrics["fileLines"], 11.0);
        // 5 for the long function, 20 (capped) for the file.
        assert_eq!(result.score, 75);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.recommendations[0].message.contains("'grow' with 11 lines"));
        assert_eq!(
            result.recommendations[1].severity,
            RecommendationSeverity::Warning
        );
    }
}
