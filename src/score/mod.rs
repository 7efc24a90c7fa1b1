//! Composite quality score.
//!
//! Combines per-dimension outcomes into a weighted overall score, a letter
//! grade, a confidence value and one prioritized recommendation list.
//! Dimensions that are missing, not yet implemented or failed are scored
//! with [`NEUTRAL_SCORE`] so a partial set never blocks a result.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{Error, Result};
use crate::dimensions::{Dimension, DimensionOutcome, Recommendation};

/// Score given to dimensions without a real result.
pub const NEUTRAL_SCORE: u8 = 85;

/// Recommendations kept on a composite score.
pub const MAX_RECOMMENDATIONS: usize = 10;

/// Per-dimension weights for the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub movement: f64,
    pub balance: f64,
    pub proportion: f64,
    pub contrast: f64,
    pub unity: f64,
    pub simplicity: f64,
    pub perspective: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            movement: 1.2,
            balance: 1.0,
            proportion: 1.0,
            contrast: 1.1,
            unity: 1.15,
            simplicity: 1.25,
            perspective: 0.9,
        }
    }
}

impl DimensionWeights {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Movement => self.movement,
            Dimension::Balance => self.balance,
            Dimension::Proportion => self.proportion,
            Dimension::Contrast => self.contrast,
            Dimension::Unity => self.unity,
            Dimension::Simplicity => self.simplicity,
            Dimension::Perspective => self.perspective,
        }
    }

    pub fn set(&mut self, dimension: Dimension, weight: f64) {
        let slot = match dimension {
            Dimension::Movement => &mut self.movement,
            Dimension::Balance => &mut self.balance,
            Dimension::Proportion => &mut self.proportion,
            Dimension::Contrast => &mut self.contrast,
            Dimension::Unity => &mut self.unity,
            Dimension::Simplicity => &mut self.simplicity,
            Dimension::Perspective => &mut self.perspective,
        };
        *slot = weight;
    }

    pub fn total(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.get(*d)).sum()
    }

    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<()> {
        for dimension in Dimension::ALL {
            let weight = self.get(dimension);
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::config(format!(
                    "weight for {dimension} must be a non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// How a dimension's score was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionStatus {
    Scored,
    NotYetImplemented,
    Failed,
}

/// Letter grade for a 0..=100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    D,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::APlus,
            85..=89 => Self::A,
            80..=84 => Self::AMinus,
            75..=79 => Self::BPlus,
            70..=74 => Self::B,
            65..=69 => Self::BMinus,
            60..=64 => Self::CPlus,
            55..=59 => Self::C,
            50..=54 => Self::CMinus,
            _ => Self::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::D => "D",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::APlus => "Masterpiece",
            Self::A => "Excellent",
            Self::AMinus => "Very Good",
            Self::BPlus => "Good",
            Self::B => "Above Average",
            Self::BMinus => "Average",
            Self::CPlus => "Below Average",
            Self::C => "Needs Improvement",
            Self::CMinus => "Poor",
            Self::D => "Critical Issues",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.description())
    }
}

/// Bookkeeping attached to a composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub lines_of_code: usize,
    pub files_analyzed: usize,
    pub analysis_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ScoreMetadata {
    pub fn for_file(lines_of_code: usize) -> Self {
        Self {
            lines_of_code,
            files_analyzed: 1,
            analysis_time_ms: 0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub overall: u8,
    pub breakdown: BTreeMap<Dimension, u8>,
    pub weights: DimensionWeights,
    pub grade: Grade,
    pub confidence: u8,
    pub recommendations: Vec<Recommendation>,
    pub status: BTreeMap<Dimension, DimensionStatus>,
    pub metadata: ScoreMetadata,
}

/// Combines dimension outcomes into a [`CompositeScore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreEngine;

impl ScoreEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score a set of dimension outcomes.
    ///
    /// Failed analyzers are logged and scored neutrally; they never abort
    /// the composite.
    pub fn score(
        &self,
        outcomes: Vec<(Dimension, Result<DimensionOutcome>)>,
        weights: &DimensionWeights,
        metadata: ScoreMetadata,
    ) -> CompositeScore {
        let mut breakdown: BTreeMap<Dimension, u8> =
            Dimension::ALL.iter().map(|d| (*d, NEUTRAL_SCORE)).collect();
        let mut status: BTreeMap<Dimension, DimensionStatus> = Dimension::ALL
            .iter()
            .map(|d| (*d, DimensionStatus::NotYetImplemented))
            .collect();
        let mut recommendations = Vec::new();

        for (dimension, outcome) in outcomes {
            match outcome {
                Ok(DimensionOutcome::Scored(result)) => {
                    breakdown.insert(dimension, result.score.min(100));
                    status.insert(dimension, DimensionStatus::Scored);
                    recommendations.extend(result.recommendations);
                }
                Ok(DimensionOutcome::NotYetImplemented) => {
                    status.insert(dimension, DimensionStatus::NotYetImplemented);
                }
                Err(e) => {
                    warn!(dimension = %dimension, error = %e, "Dimension analyzer failed, using neutral score");
                    status.insert(dimension, DimensionStatus::Failed);
                }
            }
        }

        let overall = weighted_score(&breakdown, weights);
        let scores: Vec<f64> = breakdown.values().map(|s| f64::from(*s)).collect();

        CompositeScore {
            overall,
            grade: Grade::from_score(overall),
            confidence: confidence(&scores),
            recommendations: prioritize(recommendations),
            breakdown,
            weights: weights.clone(),
            status,
            metadata,
        }
    }
}

/// `round(Σ score·weight / Σ weight)`; the unweighted mean when every
/// weight is zero.
pub fn weighted_score(breakdown: &BTreeMap<Dimension, u8>, weights: &DimensionWeights) -> u8 {
    if breakdown.is_empty() {
        return NEUTRAL_SCORE;
    }
    let total_weight: f64 = breakdown.keys().map(|d| weights.get(*d)).sum();
    let raw = if total_weight > 0.0 {
        breakdown
            .iter()
            .map(|(d, s)| f64::from(*s) * weights.get(*d))
            .sum::<f64>()
            / total_weight
    } else {
        breakdown.values().map(|s| f64::from(*s)).sum::<f64>() / breakdown.len() as f64
    };
    raw.round().clamp(0.0, 100.0) as u8
}

/// `max(0, 100 − 2·stddev)` over the dimension scores.
pub fn confidence(scores: &[f64]) -> u8 {
    let sd = crate::dimensions::variance(scores).sqrt();
    (100.0 - 2.0 * sd).max(0.0).round() as u8
}

/// Deduplicate by `(principle, message)`, order by severity then impact,
/// and keep the top [`MAX_RECOMMENDATIONS`].
pub fn prioritize(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Recommendation> = recommendations
        .into_iter()
        .filter(|r| seen.insert((r.principle, r.message.clone())))
        .collect();
    unique.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| b.estimated_impact.cmp(&a.estimated_impact))
    });
    unique.truncate(MAX_RECOMMENDATIONS);
    unique
}
