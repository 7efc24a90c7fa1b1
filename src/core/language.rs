//! Language detection and enumeration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source dialects the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
}

/// The language family reported on result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFamily {
    TypeScript,
    JavaScript,
}

impl Language {
    /// Detect language from file path based on extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::from_extension(extension)
    }

    /// Get language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            _ => None,
        }
    }

    /// Get the display name for the language.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript",
            Self::Tsx => "TSX",
            Self::JavaScript => "JavaScript",
            Self::Jsx => "JSX",
        }
    }

    pub fn family(&self) -> LanguageFamily {
        match self {
            Self::TypeScript | Self::Tsx => LanguageFamily::TypeScript,
            Self::JavaScript | Self::Jsx => LanguageFamily::JavaScript,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_path() {
        assert_eq!(
            Language::detect(Path::new("src/app.ts")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            Language::detect(Path::new("src/App.tsx")),
            Some(Language::Tsx)
        );
        assert_eq!(
            Language::detect(Path::new("index.mjs")),
            Some(Language::JavaScript)
        );
        assert_eq!(Language::detect(Path::new("view.jsx")), Some(Language::Jsx));
        assert_eq!(Language::detect(Path::new("main.rs")), None);
        assert_eq!(Language::detect(Path::new("Makefile")), None);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(Language::from_extension("TS"), Some(Language::TypeScript));
    }

    #[test]
    fn test_family() {
        assert_eq!(Language::Tsx.family(), LanguageFamily::TypeScript);
        assert_eq!(Language::Jsx.family(), LanguageFamily::JavaScript);
        assert_eq!(Language::JavaScript.family(), LanguageFamily::JavaScript);
    }

    #[test]
    fn test_family_serializes_lowercase() {
        let json = serde_json::to_string(&LanguageFamily::TypeScript).unwrap();
        assert_eq!(json, "\"typescript\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(Language::Tsx.to_string(), "TSX");
    }
}
