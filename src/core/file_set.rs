//! File set for collecting files to analyze.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use super::{Error, Language, Result};
use crate::config::Config;

/// A set of TypeScript/JavaScript files to analyze, respecting .gitignore.
#[derive(Debug, Clone)]
pub struct FileSet {
    /// Root directory.
    root: PathBuf,
    /// All files in the set.
    files: Vec<PathBuf>,
}

impl FileSet {
    /// Create a file set from a directory path using the project config.
    pub fn from_path(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Self::from_path_with_patterns(path, &config.project.exclude, config.project.max_files)
    }

    /// Create a file set from a directory path without exclusions.
    pub fn from_path_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_patterns(path, &[], 0)
    }

    /// Create a file set with custom exclude patterns.
    ///
    /// Patterns are matched against the path relative to the root.
    /// A `max_files` of zero means unlimited.
    pub fn from_path_with_patterns(
        path: impl AsRef<Path>,
        exclude_patterns: &[String],
        max_files: usize,
    ) -> Result<Self> {
        let root = path.as_ref().canonicalize()?;
        let exclude = build_glob_set(exclude_patterns)?;
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            if Language::detect(path).is_none() {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if exclude.is_match(relative) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        // Sort for deterministic ordering
        files.sort();
        if max_files > 0 {
            files.truncate(max_files);
        }

        Ok(Self { root, files })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get all files in the set.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the file set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::config(format!("invalid exclude pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("invalid exclude patterns: {e}")))
}
