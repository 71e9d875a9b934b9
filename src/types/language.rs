use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// Source languages the builder knows how to compile to Wasm.
///
/// Declaration order is the order containerized builds run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Swift,
    AssemblyScript,
    #[serde(alias = "go")]
    TinyGo,
    Grain,
    TypeScript,
    JavaScript,
}

impl Language {
    /// Canonical tag as written in `.runnable.yaml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Swift => "swift",
            Language::AssemblyScript => "assemblyscript",
            Language::TinyGo => "tinygo",
            Language::Grain => "grain",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
        }
    }

    /// Short name used in builder image references.
    pub fn image_name(&self) -> &'static str {
        match self {
            Language::Rust => "builder-rs",
            Language::Swift => "builder-swift",
            Language::AssemblyScript => "builder-as",
            Language::TinyGo => "builder-tinygo",
            Language::Grain => "builder-gr",
            Language::TypeScript | Language::JavaScript => "builder-js",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = BuildError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "rust" => Ok(Language::Rust),
            "swift" => Ok(Language::Swift),
            "assemblyscript" => Ok(Language::AssemblyScript),
            "tinygo" | "go" => Ok(Language::TinyGo),
            "grain" => Ok(Language::Grain),
            "typescript" => Ok(Language::TypeScript),
            "javascript" => Ok(Language::JavaScript),
            _ => Err(BuildError::UnsupportedLanguage {
                language: tag.to_string(),
            }),
        }
    }
}

/// Language allow-list for a pass. An empty filter admits every language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageFilter {
    tags: Vec<String>,
}

impl LanguageFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.into().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Whether a module tagged `tag` takes part in the pass. Aliases match
    /// their canonical language, so `go` admits `tinygo` modules.
    pub fn admits(&self, tag: &str) -> bool {
        if self.tags.is_empty() {
            return true;
        }

        let wanted = tag.trim().to_ascii_lowercase();
        let canonical = wanted.parse::<Language>().ok();

        self.tags.iter().any(|t| {
            *t == wanted
                || (canonical.is_some() && t.parse::<Language>().ok() == canonical)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_and_aliases() {
        assert_eq!("rust".parse::<Language>().unwrap(), Language::Rust);
        assert_eq!("Go".parse::<Language>().unwrap(), Language::TinyGo);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(BuildError::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn test_empty_filter_admits_everything() {
        let filter = LanguageFilter::all();
        assert!(filter.admits("rust"));
        assert!(filter.admits("cobol"));
    }

    #[test]
    fn test_filter_matches_aliases() {
        let filter = LanguageFilter::only(["go", "rust"]);
        assert!(filter.admits("tinygo"));
        assert!(filter.admits("rust"));
        assert!(!filter.admits("swift"));
    }

    #[test]
    fn test_serde_uses_lowercase_tags() {
        let lang: Language = serde_yaml::from_str("assemblyscript").unwrap();
        assert_eq!(lang, Language::AssemblyScript);
        assert_eq!(serde_yaml::to_string(&Language::TinyGo).unwrap().trim(), "tinygo");
    }
}
