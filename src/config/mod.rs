//! Configuration loading and management.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::score::DimensionWeights;

const ENV_PREFIX: &str = "VINCIAN_";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-file analysis deadline in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Code metrics and smell thresholds.
    pub metrics: MetricsConfig,
    /// Movement dimension thresholds.
    pub movement: MovementConfig,
    /// Balance dimension thresholds.
    pub balance: BalanceConfig,
    /// Proportion dimension thresholds.
    pub proportion: ProportionConfig,
    /// Simplicity dimension thresholds.
    pub simplicity: SimplicityConfig,
    /// Unity dimension thresholds.
    pub unity: UnityConfig,
    /// Composite score weights.
    pub weights: DimensionWeights,
    /// Metrics cache.
    pub cache: CacheConfig,
    /// Project walks and batching.
    pub project: ProjectConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            metrics: MetricsConfig::default(),
            movement: MovementConfig::default(),
            balance: BalanceConfig::default(),
            proportion: ProportionConfig::default(),
            simplicity: SimplicityConfig::default(),
            unity: UnityConfig::default(),
            weights: DimensionWeights::default(),
            cache: CacheConfig::default(),
            project: ProjectConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `VINCIAN_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Self>()
            .map_err(|e| Error::Config(e.to_string()))?
            .validated()
    }

    /// Load configuration from directory, looking for vincian.toml or
    /// .vincian/vincian.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `VINCIAN_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("vincian.toml")))
            .merge(Toml::file(dir.join(".vincian/vincian.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Self>()
            .map_err(|e| Error::Config(e.to_string()))?
            .validated()
    }

    /// Bundled default configuration file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validated(self) -> Result<Self> {
        self.weights.validate()?;
        if self.project.batch_size == 0 {
            return Err(Error::config("project.batch_size must be at least 1"));
        }
        Ok(self)
    }
}

/// Code metrics and smell thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Functions spanning more lines are `long_method` smells.
    pub long_method_lines: usize,
    /// Classes spanning more lines are `large_class` smells.
    pub large_class_lines: usize,
    /// Conditions with more `&&`/`||` are `complex_condition` smells.
    pub complex_condition_connectives: usize,
    /// Case-insensitive whole-word markers of unfinished code.
    pub placeholder_markers: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            long_method_lines: 50,
            large_class_lines: 300,
            complex_condition_connectives: 3,
            placeholder_markers: [
                "todo",
                "fixme",
                "hack",
                "xxx",
                "hardcoded",
                "placeholder",
                "fake",
                "dummy",
                "mock",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Movement (control-flow quality) thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub complexity_threshold: u32,
    pub nesting_threshold: u32,
    pub callback_chain_threshold: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 10,
            nesting_threshold: 3,
            callback_chain_threshold: 2,
        }
    }
}

/// Balance (size distribution) thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Function line-count CV above which the score is reduced.
    pub function_cv_threshold: f64,
    /// Class method-count CV above which the score is reduced.
    pub class_cv_threshold: f64,
    /// Function CV below which sizing counts as consistent.
    pub consistency_cv: f64,
    /// Functions longer than this are outliers.
    pub long_function_lines: usize,
    /// Functions shorter than this are tiny.
    pub tiny_function_lines: usize,
    /// Share of tiny functions above which the score is reduced.
    pub tiny_function_share: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            function_cv_threshold: 0.5,
            class_cv_threshold: 0.6,
            consistency_cv: 0.3,
            long_function_lines: 100,
            tiny_function_lines: 3,
            tiny_function_share: 0.5,
        }
    }
}

/// Proportion (unit size) thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProportionConfig {
    pub max_function_lines: usize,
    pub max_parameters: usize,
    pub max_file_lines: usize,
}

impl Default for ProportionConfig {
    fn default() -> Self {
        Self {
            max_function_lines: 40,
            max_parameters: 4,
            max_file_lines: 400,
        }
    }
}

/// Simplicity (readability) thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplicityConfig {
    /// Per-function cognitive complexity above which the score drops.
    pub cognitive_threshold: u32,
}

impl Default for SimplicityConfig {
    fn default() -> Self {
        Self {
            cognitive_threshold: 15,
        }
    }
}

/// Unity (cohesion and consistency) thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnityConfig {
    /// Classes with both members and lower cohesion are flagged.
    pub min_cohesion: f64,
}

impl Default for UnityConfig {
    fn default() -> Self {
        Self { min_cohesion: 0.5 }
    }
}

/// Metrics cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Entries kept before the oldest is evicted.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 100,
        }
    }
}

/// Project walk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Files analyzed in parallel per batch.
    pub batch_size: usize,
    /// Cap on files analyzed; 0 means unlimited.
    pub max_files: usize,
    /// Exclude patterns (glob), matched against paths relative to the root.
    pub exclude: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_files: 0,
            exclude: [
                "**/node_modules/**",
                "**/dist/**",
                "**/build/**",
                "**/*.min.*",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    Markdown,
}
