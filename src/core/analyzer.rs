//! Analysis context, options and deadlines shared by the engine.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{Error, Result};
use crate::cache::AnalysisCache;
use crate::config::Config;
use crate::score::DimensionWeights;

/// Per-call options for file and project analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Override the configured dimension weights.
    pub weights: Option<DimensionWeights>,
    /// Deadline for a single file's analysis.
    #[serde(default, with = "duration_millis")]
    pub timeout: Option<Duration>,
    /// Attach each dimension's raw metrics to the result.
    pub include_metrics: bool,
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: DimensionWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metrics(mut self, include: bool) -> Self {
        self.include_metrics = include;
        self
    }

    /// Options seeded from configuration (`timeout_ms`).
    pub fn from_config(config: &Config) -> Self {
        Self {
            weights: None,
            timeout: config.timeout_ms.map(Duration::from_millis),
            include_metrics: false,
        }
    }
}

/// Context threaded through the engine for one analysis call.
///
/// Holds the configuration, an optional shared cache and the span every
/// per-file span is parented to.
pub struct AnalysisContext<'a> {
    /// Configuration.
    pub config: &'a Config,
    /// Shared metrics cache.
    pub cache: Option<&'a AnalysisCache>,
    /// Parent span for log records emitted during analysis.
    pub span: tracing::Span,
    /// Progress callback.
    pub on_progress: Option<Box<dyn Fn(usize, usize) + Send + Sync + 'a>>,
}

impl<'a> AnalysisContext<'a> {
    /// Create a new analysis context without a cache.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            cache: None,
            span: tracing::Span::current(),
            on_progress: None,
        }
    }

    /// Attach a cache handle.
    pub fn with_cache(mut self, cache: &'a AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Parent all analysis spans to `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Add progress callback.
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'a,
    {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Report progress if callback is set.
    pub fn report_progress(&self, current: usize, total: usize) {
        if let Some(ref f) = self.on_progress {
            f(current, total);
        }
    }
}

/// Wall-clock budget for one file, checked between analysis phases.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Budget left, if there is a limit.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    /// Fail with [`Error::Timeout`] once the budget is spent.
    pub fn check(&self, path: &std::path::Path) -> Result<()> {
        if self.is_expired() {
            return Err(Error::Timeout {
                path: path.to_path_buf(),
                elapsed_ms: self.elapsed().as_millis() as u64,
            });
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
