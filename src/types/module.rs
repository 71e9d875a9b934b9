use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::types::Language;

/// File extension of every compiled module.
pub const MODULE_EXTENSION: &str = "wasm";

/// Name of the per-module config file that marks a directory as a module.
pub const MODULE_CONFIG_FILE: &str = ".runnable.yaml";

pub const DEFAULT_NAMESPACE: &str = "default";

/// Contents of a module's `.runnable.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub lang: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// A single source module taking part in a build pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Language tag exactly as configured; parsed lazily so that modules in
    /// unknown languages can still be filtered out before they fail.
    pub lang: String,
    pub namespace: String,
    /// Absolute source directory.
    pub path: PathBuf,
    /// Extra compiler flags, filled in by the flag advisor during a native pass.
    pub compiler_flags: String,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, lang: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            path: path.into(),
            compiler_flags: String::new(),
        }
    }

    pub fn from_config(config: ModuleConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            name: config.name,
            lang: config.lang,
            namespace: config.namespace,
            path: path.into(),
            compiler_flags: String::new(),
        }
    }

    pub fn language(&self) -> Result<Language> {
        self.lang.parse()
    }

    /// Name with dashes replaced, matching the file name cargo gives a
    /// library artifact.
    pub fn underscore_name(&self) -> String {
        self.name.replace('-', "_")
    }

    pub fn artifact_file_name(&self) -> String {
        format!("{}.{}", self.name, MODULE_EXTENSION)
    }

    /// Where a successful native build leaves the compiled module.
    pub fn artifact_path(&self) -> PathBuf {
        self.path.join(self.artifact_file_name())
    }
}
