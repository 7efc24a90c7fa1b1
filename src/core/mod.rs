//! Core types shared across the analysis pipeline.

mod analyzer;
mod error;
mod file_set;
mod language;
pub mod progress;
mod source_file;

pub use analyzer::{AnalysisContext, AnalysisOptions, Deadline};
pub use error::{Error, Result};
pub use file_set::FileSet;
pub use language::{Language, LanguageFamily};
pub use source_file::{count_code_lines, SourceUnit};
