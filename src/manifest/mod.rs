//! The bundle manifest: identity, versions, and the functions a bundle
//! exposes.

pub mod error;
pub mod version;

pub use error::ManifestError;
pub use version::{next_major, parse_version};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::types::{Language, ModuleDescriptor, DEFAULT_NAMESPACE};

pub const MANIFEST_FILE: &str = "Manifest.yaml";
pub const DEFAULT_IDENTIFIER: &str = "com.rustle.app";
pub const INITIAL_APP_VERSION: &str = "v0.0.1";

/// Host runtime version bundles built by this tool are compatible with.
pub const HOST_RUNTIME_VERSION: &str = "0.4.2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub identifier: String,
    pub app_version: String,
    pub host_version: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    /// Keys this tool does not interpret, carried through unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lang: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Manifest {
    /// Manifest used when a project does not provide one.
    pub fn synthesized() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            app_version: INITIAL_APP_VERSION.to_string(),
            host_version: format!("v{HOST_RUNTIME_VERSION}"),
            headless: false,
            functions: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(source).map_err(ManifestError::Parse)
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        serde_yaml::to_string(self).map_err(ManifestError::Serialize)
    }

    /// Load `Manifest.yaml` from `dir`, or `None` when the project has none.
    pub async fn load(dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = dir.join(MANIFEST_FILE);

        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Self::from_yaml(&source).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ManifestError::Read { path, source }),
        }
    }

    pub async fn write(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = dir.join(MANIFEST_FILE);
        let yaml = self.to_yaml()?;

        tokio::fs::write(&path, yaml)
            .await
            .map_err(|source| ManifestError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Move to the next major application version and return it.
    pub fn bump_major(&mut self) -> Result<&str, ManifestError> {
        self.app_version = next_major(&self.app_version)?;
        Ok(&self.app_version)
    }

    /// Record build-derived metadata for each built module: add missing
    /// function entries and fill in language and version on existing ones.
    pub fn augment(&mut self, modules: &[ModuleDescriptor]) -> Result<(), ManifestError> {
        for module in modules {
            let built_lang = module
                .language()
                .map(|l| l.as_str().to_string())
                .unwrap_or_else(|_| module.lang.clone());

            let existing = self
                .functions
                .iter_mut()
                .find(|f| f.name == module.name && f.namespace == module.namespace);

            match existing {
                Some(entry) => {
                    if entry.lang.is_empty() {
                        entry.lang = built_lang;
                    } else if !same_language(&entry.lang, &built_lang) {
                        return Err(ManifestError::LanguageMismatch {
                            function: module.name.clone(),
                            declared: entry.lang.clone(),
                            built: built_lang,
                        });
                    }

                    if entry.version.is_empty() {
                        entry.version = self.app_version.clone();
                    }
                }
                None => self.functions.push(FunctionEntry {
                    name: module.name.clone(),
                    namespace: module.namespace.clone(),
                    lang: built_lang,
                    version: self.app_version.clone(),
                }),
            }
        }

        Ok(())
    }

    /// Check the whole manifest, reporting every problem found.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut problems = Vec::new();

        if !is_valid_identifier(&self.identifier) {
            problems.push(format!(
                "identifier {:?} must be a dotted name such as com.example.app",
                self.identifier
            ));
        }

        if let Err(e) = parse_version(&self.app_version) {
            problems.push(format!("appVersion: {e}"));
        }

        if let Err(e) = parse_version(&self.host_version) {
            problems.push(format!("hostVersion: {e}"));
        }

        let mut seen = HashSet::new();
        for function in &self.functions {
            if function.name.trim().is_empty() {
                problems.push("function with empty name".to_string());
                continue;
            }

            if function.lang.parse::<Language>().is_err() {
                problems.push(format!(
                    "function {} has unsupported language {:?}",
                    function.name, function.lang
                ));
            }

            if !seen.insert((function.namespace.as_str(), function.name.as_str())) {
                problems.push(format!(
                    "duplicate function {}::{}",
                    function.namespace, function.name
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid { problems })
        }
    }
}

fn same_language(a: &str, b: &str) -> bool {
    match (a.parse::<Language>(), b.parse::<Language>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

fn is_valid_identifier(identifier: &str) -> bool {
    let segments: Vec<&str> = identifier.split('.').collect();
    segments.len() >= 2
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADLESS: &str = r#"
identifier: com.example.edge
appVersion: v2.3.1
hostVersion: v0.4.2
headless: true
functions:
  - name: fetch
    namespace: default
    lang: tinygo
queries:
  - name: latest
"#;

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let manifest = Manifest::from_yaml(HEADLESS).unwrap();
        assert!(manifest.headless);
        assert!(manifest.extra.contains_key("queries"));

        let again = Manifest::from_yaml(&manifest.to_yaml().unwrap()).unwrap();
        assert_eq!(again, manifest);
    }

    #[test]
    fn test_synthesized_manifest_is_valid() {
        let manifest = Manifest::synthesized();
        assert_eq!(manifest.identifier, "com.rustle.app");
        assert_eq!(manifest.app_version, "v0.0.1");
        manifest.validate().unwrap();
    }

    #[test]
    fn test_augment_adds_and_completes_entries() {
        let mut manifest = Manifest::from_yaml(HEADLESS).unwrap();
        let modules = vec![
            ModuleDescriptor::new("fetch", "go", "/work/fetch"),
            ModuleDescriptor::new("render", "rust", "/work/render"),
        ];

        manifest.augment(&modules).unwrap();

        assert_eq!(manifest.functions.len(), 2);
        assert_eq!(manifest.functions[0].version, "v2.3.1");
        assert_eq!(manifest.functions[1].name, "render");
        assert_eq!(manifest.functions[1].lang, "rust");
        manifest.validate().unwrap();
    }

    #[test]
    fn test_augment_rejects_language_mismatch() {
        let mut manifest = Manifest::from_yaml(HEADLESS).unwrap();
        let modules = vec![ModuleDescriptor::new("fetch", "rust", "/work/fetch")];

        assert!(matches!(
            manifest.augment(&modules),
            Err(ManifestError::LanguageMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut manifest = Manifest::synthesized();
        manifest.identifier = "app".to_string();
        manifest.app_version = "1.0".to_string();
        manifest.functions = vec![
            FunctionEntry {
                name: "a".to_string(),
                namespace: "default".to_string(),
                lang: "rust".to_string(),
                version: String::new(),
            },
            FunctionEntry {
                name: "a".to_string(),
                namespace: "default".to_string(),
                lang: "cobol".to_string(),
                version: String::new(),
            },
        ];

        match manifest.validate() {
            Err(ManifestError::Invalid { problems }) => assert_eq!(problems.len(), 4),
            other => panic!("expected invalid manifest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_missing_manifest_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Manifest::load(dir.path()).await.unwrap().is_none());
    }
}
