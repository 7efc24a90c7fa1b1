//! Vincian - static quality analysis for TypeScript and JavaScript.
//!
//! Vincian parses a source file into a language-neutral tree, measures
//! classic code metrics (cyclomatic and cognitive complexity, Halstead
//! volume, maintainability index, smells), runs a semantic pass for
//! unused or undefined names and unreachable code, and scores the file on
//! seven quality dimensions that combine into a weighted composite score
//! and letter grade.
//!
//! # Supported Languages
//!
//! TypeScript, TSX, JavaScript, JSX (including `.mjs` and `.cjs`)
//!
//! # Example
//!
//! ```no_run
//! use vincian::config::Config;
//! use vincian::core::{AnalysisContext, AnalysisOptions};
//! use vincian::Engine;
//!
//! let config = Config::default();
//! let engine = Engine::new(&config).unwrap();
//! let ctx = AnalysisContext::new(&config);
//! let analysis = engine
//!     .analyze_path(&ctx, "src/index.ts".as_ref(), &AnalysisOptions::new())
//!     .unwrap();
//! println!("{} scored {}", analysis.file_name, analysis.composite_score.grade);
//! ```

pub mod analyzers;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod dimensions;
pub mod engine;
pub mod output;
pub mod parser;
pub mod score;

pub use cache::AnalysisCache;
pub use core::{AnalysisContext, AnalysisOptions, Error, Result};
pub use engine::{Engine, FileAnalysis, ProjectAnalysis};
pub use score::{CompositeScore, Grade};
