//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::dimensions::Dimension;
use crate::output::Format;
use crate::score::DimensionWeights;

/// Vincian - static quality analysis for TypeScript and JavaScript.
#[derive(Parser)]
#[command(name = "vincian")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root (used by `project` and for config discovery)
    #[arg(short, long, default_value = ".", global = true)]
    pub path: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable the code-metrics cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Per-file analysis deadline in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Full analysis of one file: metrics, semantic issues and score
    #[command(alias = "analyze")]
    File(FileArgs),

    /// Code metrics for one file
    #[command(alias = "m")]
    Metrics(TargetArgs),

    /// Semantic issues, symbols and flow for one file
    #[command(alias = "sem")]
    Semantic(TargetArgs),

    /// Composite quality score for one file
    Score(ScoreArgs),

    /// Analyze every supported file under --path
    Project(ProjectArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
pub struct TargetArgs {
    /// File to analyze
    pub file: PathBuf,
}

#[derive(Args, Default)]
pub struct WeightArgs {
    /// Override a dimension weight, e.g. `--weight movement=2`
    #[arg(short, long = "weight", value_name = "DIMENSION=WEIGHT", value_parser = parse_weight)]
    pub weights: Vec<(Dimension, f64)>,
}

impl WeightArgs {
    /// Apply the overrides on top of `base`, or `None` when there are none.
    pub fn apply(&self, base: &DimensionWeights) -> Option<DimensionWeights> {
        if self.weights.is_empty() {
            return None;
        }
        let mut weights = base.clone();
        for (dimension, weight) in &self.weights {
            weights.set(*dimension, *weight);
        }
        Some(weights)
    }
}

#[derive(Args)]
pub struct FileArgs {
    /// File to analyze
    pub file: PathBuf,

    /// Attach each dimension's raw metrics
    #[arg(long)]
    pub include_metrics: bool,

    #[command(flatten)]
    pub weights: WeightArgs,
}

#[derive(Args)]
pub struct ScoreArgs {
    /// File to score
    pub file: PathBuf,

    #[command(flatten)]
    pub weights: WeightArgs,
}

#[derive(Args)]
pub struct ProjectArgs {
    /// Maximum number of files (0 = configured limit)
    #[arg(short = 'n', long, default_value = "0")]
    pub max_files: usize,

    /// Leave per-file results out of the report
    #[arg(long)]
    pub summary_only: bool,

    #[command(flatten)]
    pub weights: WeightArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[value(alias = "md")]
    Markdown,
    Text,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
            OutputFormat::Text => Format::Text,
        }
    }
}

fn parse_weight(s: &str) -> Result<(Dimension, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DIMENSION=WEIGHT, got '{s}'"))?;
    let dimension: Dimension = name.parse()?;
    let weight: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{value}' for {dimension}"))?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(format!("weight for {dimension} must be non-negative"));
    }
    Ok((dimension, weight))
}
