//! Source unit representation.

use std::path::{Path, PathBuf};

use super::{Error, Language, Result};

/// A source file with its content loaded.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path to the file.
    pub path: PathBuf,
    /// Detected language.
    pub language: Language,
    /// File content.
    pub content: String,
}

impl SourceUnit {
    /// Load a source file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let language = Language::detect(path).ok_or_else(|| Error::UnsupportedLanguage {
            path: path.to_path_buf(),
        })?;
        let bytes = std::fs::read(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            language,
            content: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Create from existing content, detecting the language from the path.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let language = Language::detect(&path)
            .ok_or_else(|| Error::UnsupportedLanguage { path: path.clone() })?;
        Ok(Self::from_content(path, language, content))
    }

    /// Create from existing content with an explicit language.
    pub fn from_content(
        path: impl Into<PathBuf>,
        language: Language,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            language,
            content: content.into(),
        }
    }

    /// The final path component, or the whole path when there is none.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Count lines of code (non-blank lines that are not only comments).
    pub fn lines_of_code(&self) -> usize {
        count_code_lines(&self.content)
    }

    /// Count total lines.
    pub fn total_lines(&self) -> usize {
        self.content.lines().count()
    }
}

/// Count lines carrying at least one code character outside comments.
///
/// Tracks `/* */` blocks across lines and skips quoted strings so that
/// comment markers inside literals are not mistaken for comments.
pub fn count_code_lines(content: &str) -> usize {
    let mut in_block = false;
    let mut count = 0;

    for line in content.lines() {
        let bytes = line.as_bytes();
        let mut has_code = false;
        let mut i = 0;

        while i < bytes.len() {
            if in_block {
                if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    in_block = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'/') => break,
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    in_block = true;
                    i += 2;
                }
                quote @ (b'"' | b'\'' | b'`') => {
                    has_code = true;
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                }
                b if b.is_ascii_whitespace() => i += 1,
                _ => {
                    has_code = true;
                    i += 1;
                }
            }
        }

        if has_code {
            count += 1;
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unit_from_content() {
        let file = SourceUnit::from_content(
            "add.ts",
            Language::TypeScript,
            "function add(a: number, b: number) {\n  return a + b;\n}\n",
        );

        assert_eq!(file.language, Language::TypeScript);
        assert_eq!(file.total_lines(), 3);
        assert_eq!(file.lines_of_code(), 3);
        assert_eq!(file.file_name(), "add.ts");
    }

    #[test]
    fn test_new_detects_language() {
        let unit = SourceUnit::new("lib/util.js", "module.exports = {};").unwrap();
        assert_eq!(unit.language, Language::JavaScript);
        assert!(SourceUnit::new("README.md", "# hi").is_err());
    }

    #[test]
    fn test_lines_of_code_excludes_comments() {
        let content = "// leading comment\nconst a = 1;\n\n// trailing comment\n";
        assert_eq!(count_code_lines(content), 1);
    }

    #[test]
    fn test_lines_of_code_block_comments() {
        let content = "/*\n * Docs\n */\nconst a = 1; /* inline */\n/* one */ const b = 2;\n";
        assert_eq!(count_code_lines(content), 2);
    }

    #[test]
    fn test_comment_markers_inside_strings() {
        let content = "const url = \"http://example.com\";\nconst s = '/* not a comment';\nlet x = 1;\n";
        assert_eq!(count_code_lines(content), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SourceUnit::load("/nonexistent/file.ts").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("x.ts");
        std::fs::write(&path, "let x = 1;\n").unwrap();
        let unit = SourceUnit::load(&path).unwrap();
        assert_eq!(unit.content, "let x = 1;\n");
        assert_eq!(unit.language, Language::TypeScript);
    }
}
