//! Error types for the vincian library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using vincian's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during code analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Unsupported language for the given file.
    #[error("Unsupported language for file: {path}")]
    UnsupportedLanguage { path: PathBuf },

    /// Malformed source. Fatal for the file it was raised for.
    #[error("Parse error in {path} at {line}:{column}: {message}")]
    Parse {
        path: PathBuf,
        message: String,
        line: usize,
        column: usize,
    },

    /// A single analyzer failed. Callers recover with a neutral score.
    #[error("Analyzer '{analyzer}' failed: {message}")]
    Analyzer {
        analyzer: &'static str,
        message: String,
    },

    /// Cache bookkeeping failure. Never surfaced by the public cache API.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML rendering error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// The per-file analysis deadline elapsed.
    #[error("Analysis of {path} timed out after {elapsed_ms}ms")]
    Timeout { path: PathBuf, elapsed_ms: u64 },
}

impl Error {
    /// Create a parse error at a 1-based line and 0-based column.
    pub fn parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line,
            column,
        }
    }

    /// Create a new analyzer error.
    pub fn analyzer(analyzer: &'static str, message: impl Into<String>) -> Self {
        Self::Analyzer {
            analyzer,
            message: message.into(),
        }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Whether this error should skip a file rather than abort a project run.
    pub fn is_file_local(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::Timeout { .. }
                | Self::Io(_)
                | Self::FileNotFound { .. }
                | Self::UnsupportedLanguage { .. }
        )
    }
}
