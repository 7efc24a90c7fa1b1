//! Unity: whether the file reads as one coherent piece.
//!
//! Looks at class cohesion, a single module system for exports and a
//! single naming convention for functions.

use std::collections::BTreeMap;

use crate::analyzers::metrics::analyze_class;
use crate::analyzers::semantic::symbols::is_commonjs_export;
use crate::config::UnityConfig;
use crate::core::Result;
use crate::parser::queries::{find_all_class_like_nodes, function_sites};
use crate::parser::{for_each_node, AstNode, NodeKind};

use super::{
    mean, Dimension, DimensionAnalyzer, DimensionOutcome, PrincipleAnalysisResult,
    Recommendation, RecommendationSeverity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamingStyle {
    Camel,
    Snake,
}

fn naming_style(name: &str) -> Option<NamingStyle> {
    let first = name.chars().next()?;
    if !first.is_ascii_lowercase() {
        return None;
    }
    if name.contains('_') {
        Some(NamingStyle::Snake)
    } else if name.chars().any(|c| c.is_ascii_uppercase()) {
        Some(NamingStyle::Camel)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnityMetrics {
    /// `(class name, cohesion)` for classes with both methods and fields.
    pub cohesion: Vec<(String, f64)>,
    pub esm_exports: usize,
    pub commonjs_exports: usize,
    pub camel_case_functions: usize,
    pub snake_case_functions: usize,
}

impl UnityMetrics {
    fn mixed_exports(&self) -> bool {
        self.esm_exports > 0 && self.commonjs_exports > 0
    }

    fn naming_minority(&self) -> usize {
        self.camel_case_functions.min(self.snake_case_functions)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnityAnalyzer {
    config: UnityConfig,
}

impl UnityAnalyzer {
    pub fn new(config: UnityConfig) -> Self {
        Self { config }
    }

    pub fn measure(&self, root: &AstNode) -> UnityMetrics {
        let mut m = UnityMetrics {
            cohesion: find_all_class_like_nodes(root)
                .into_iter()
                .map(analyze_class)
                .filter(|c| c.methods > 0 && c.properties > 0)
                .map(|c| (c.name, c.cohesion))
                .collect(),
            ..UnityMetrics::default()
        };

        for_each_node(root, |node, _| match node.kind {
            NodeKind::ExportStatement => m.esm_exports += 1,
            NodeKind::AssignmentExpression
                if node.child("left").is_some_and(is_commonjs_export) =>
            {
                m.commonjs_exports += 1
            }
            _ => {}
        });

        for site in function_sites(root) {
            match naming_style(site.name) {
                Some(NamingStyle::Camel) => m.camel_case_functions += 1,
                Some(NamingStyle::Snake) => m.snake_case_functions += 1,
                None => {}
            }
        }

        m
    }

    fn low_cohesion<'m>(&self, m: &'m UnityMetrics) -> Vec<&'m (String, f64)> {
        m.cohesion
            .iter()
            .filter(|(_, c)| *c < self.config.min_cohesion)
            .collect()
    }

    pub fn score(&self, m: &UnityMetrics) -> f64 {
        let mut score = 100.0;
        score -= (self.low_cohesion(m).len() as f64 * 10.0).min(30.0);
        if m.mixed_exports() {
            score -= 15.0;
        }
        score -= (m.naming_minority() as f64 * 3.0).min(15.0);
        score
    }

    pub fn recommendations(&self, m: &UnityMetrics) -> Vec<Recommendation> {
        let mut recs: Vec<Recommendation> = self
            .low_cohesion(m)
            .into_iter()
            .map(|(name, cohesion)| {
                Recommendation::new(
                    Dimension::Unity,
                    RecommendationSeverity::Warning,
                    format!(
                        "Class '{name}' has low cohesion ({cohesion:.2}). Keep data together with the methods that use it."
                    ),
                    10,
                )
                .with_fix("Move fields that few methods use into a separate class")
            })
            .collect();

        if m.mixed_exports() {
            recs.push(
                Recommendation::new(
                    Dimension::Unity,
                    RecommendationSeverity::Warning,
                    "File mixes ES module exports with CommonJS module.exports. Use one module system.",
                    10,
                )
                .with_fix("Replace module.exports assignments with export declarations"),
            );
        }

        if m.naming_minority() > 0 {
            recs.push(
                Recommendation::new(
                    Dimension::Unity,
                    RecommendationSeverity::Info,
                    format!(
                        "Function names mix camelCase ({}) and snake_case ({}). Pick one convention.",
                        m.camel_case_functions, m.snake_case_functions
                    ),
                    5,
                )
                .with_fix("Rename functions to camelCase"),
            );
        }

        recs
    }
}

impl DimensionAnalyzer for UnityAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Unity
    }

    fn analyze(&self, ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
        let m = self.measure(ast);
        let cohesion: Vec<f64> = m.cohesion.iter().map(|(_, c)| *c).collect();
        let metrics = BTreeMap::from([
            ("avgCohesion".to_string(), mean(&cohesion)),
            ("lowCohesionClasses".to_string(), self.low_cohesion(&m).len() as f64),
            ("esmExports".to_string(), m.esm_exports as f64),
            ("commonjsExports".to_string(), m.commonjs_exports as f64),
            ("camelCaseFunctions".to_string(), m.camel_case_functions as f64),
            ("snakeCaseFunctions".to_string(), m.snake_case_functions as f64),
        ]);
        Ok(DimensionOutcome::Scored(PrincipleAnalysisResult::new(
            self.score(&m),
            self.recommendations(&m),
            metrics,
        )))
    }
}
