//! Quality dimension analyzers.
//!
//! Each dimension scores one aspect of a file from the parsed tree and
//! the raw source. Analyzers are independent of each other and only read
//! the tree, so the engine runs them in parallel.

pub mod balance;
pub mod movement;
pub mod proportion;
pub mod simplicity;
pub mod unity;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::Result;
use crate::parser::AstNode;

pub use balance::BalanceAnalyzer;
pub use movement::MovementAnalyzer;
pub use proportion::ProportionAnalyzer;
pub use simplicity::SimplicityAnalyzer;
pub use unity::UnityAnalyzer;

/// The seven scored quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Movement,
    Balance,
    Proportion,
    Contrast,
    Unity,
    Simplicity,
    Perspective,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Movement,
        Dimension::Balance,
        Dimension::Proportion,
        Dimension::Contrast,
        Dimension::Unity,
        Dimension::Simplicity,
        Dimension::Perspective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movement => "movement",
            Self::Balance => "balance",
            Self::Proportion => "proportion",
            Self::Contrast => "contrast",
            Self::Unity => "unity",
            Self::Simplicity => "simplicity",
            Self::Perspective => "perspective",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| format!("Unknown dimension: {s}"))
    }
}

/// Recommendation severity. Orders `critical` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSeverity {
    Critical,
    Warning,
    Info,
}

/// An actionable suggestion produced by a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub principle: Dimension,
    pub severity: RecommendationSeverity,
    pub message: String,
    /// Score points expected back once addressed.
    pub estimated_impact: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Recommendation {
    pub fn new(
        principle: Dimension,
        severity: RecommendationSeverity,
        message: impl Into<String>,
        estimated_impact: u32,
    ) -> Self {
        Self {
            principle,
            severity,
            message: message.into(),
            estimated_impact,
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

/// Uniform result of a scored dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipleAnalysisResult {
    /// 0..=100.
    pub score: u8,
    pub recommendations: Vec<Recommendation>,
    pub metrics: BTreeMap<String, f64>,
}

impl PrincipleAnalysisResult {
    /// Build a result from a raw score, rounding and clamping to 0..=100.
    pub fn new(
        raw_score: f64,
        recommendations: Vec<Recommendation>,
        metrics: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            score: clamp_score(raw_score),
            recommendations,
            metrics,
        }
    }
}

/// Round and clamp a raw score into 0..=100. NaN maps to 0.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// What a dimension analyzer produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DimensionOutcome {
    Scored(PrincipleAnalysisResult),
    /// The dimension has no real analysis yet.
    NotYetImplemented,
}

/// Scores one quality dimension of a parsed file.
pub trait DimensionAnalyzer: Send + Sync {
    fn dimension(&self) -> Dimension;

    fn analyze(&self, ast: &AstNode, source: &str) -> Result<DimensionOutcome>;
}

/// Placeholder for a dimension without an implementation.
#[derive(Debug, Clone, Copy)]
pub struct PendingAnalyzer(pub Dimension);

impl DimensionAnalyzer for PendingAnalyzer {
    fn dimension(&self) -> Dimension {
        self.0
    }

    fn analyze(&self, _ast: &AstNode, _source: &str) -> Result<DimensionOutcome> {
        Ok(DimensionOutcome::NotYetImplemented)
    }
}

/// One analyzer per dimension, configured from `config`.
pub fn default_analyzers(config: &Config) -> Vec<Box<dyn DimensionAnalyzer>> {
    vec![
        Box::new(MovementAnalyzer::new(config.movement.clone())),
        Box::new(BalanceAnalyzer::new(config.balance.clone())),
        Box::new(ProportionAnalyzer::new(config.proportion.clone())),
        Box::new(PendingAnalyzer(Dimension::Contrast)),
        Box::new(UnityAnalyzer::new(config.unity.clone())),
        Box::new(SimplicityAnalyzer::new(
            config.simplicity.clone(),
            config.metrics.complex_condition_connectives,
        )),
        Box::new(PendingAnalyzer(Dimension::Perspective)),
    ]
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation divided by the mean; 0 when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    variance(values).sqrt() / m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_orders_critical_first() {
        let mut severities = vec![
            RecommendationSeverity::Info,
            RecommendationSeverity::Critical,
            RecommendationSeverity::Warning,
        ];
        severities.sort();
        assert_eq!(
            severities,
            vec![
                RecommendationSeverity::Critical,
                RecommendationSeverity::Warning,
                RecommendationSeverity::Info
            ]
        );
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!("Movement".parse::<Dimension>().unwrap(), Dimension::Movement);
        assert_eq!(" unity".parse::<Dimension>().unwrap(), Dimension::Unity);
        assert!("harmony".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(104.2), 100);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(84.5), 85);
        assert_eq!(clamp_score(f64::NAN), 0);
    }

    #[test]
    fn test_coefficient_of_variation() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        let cv = coefficient_of_variation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((cv - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_default_analyzers_cover_every_dimension() {
        let analyzers = default_analyzers(&Config::default());
        let dims: Vec<Dimension> = analyzers.iter().map(|a| a.dimension()).collect();
        assert_eq!(dims, Dimension::ALL.to_vec());
    }

    #[test]
    fn test_pending_analyzer_is_not_implemented() {
        let root = crate::parser::parse("let a = 1;", std::path::Path::new("p.js")).unwrap();
        let outcome = PendingAnalyzer(Dimension::Contrast)
            .analyze(&root, "let a = 1;")
            .unwrap();
        assert_eq!(outcome, DimensionOutcome::NotYetImplemented);
    }

    #[test]
    fn test_recommendation_serialization() {
        let rec = Recommendation::new(
            Dimension::Movement,
            RecommendationSeverity::Warning,
            "msg",
            4,
        )
        .with_fix("fix");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["principle"], "movement");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["suggested_fix"], "fix");
    }
}
