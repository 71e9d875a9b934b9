//! Project discovery: the modules under a directory, its manifest, and the
//! compiled artifacts a build leaves behind.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::bundle::{BundleError, ModuleFile};
use crate::error::{BuildError, Result};
use crate::manifest::Manifest;
use crate::types::{LanguageFilter, ModuleConfig, ModuleDescriptor, MODULE_CONFIG_FILE};

pub const DEFAULT_BUNDLE_FILE: &str = "bundle.tar.gz";

#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Absolute project root.
    pub root: PathBuf,
    /// Modules in build order.
    pub modules: Vec<ModuleDescriptor>,
    pub manifest: Option<Manifest>,
    pub bundle_path: PathBuf,
}

impl BuildContext {
    /// Discover the project rooted at `dir`. If `dir` itself holds a
    /// `.runnable.yaml` it is the only module; otherwise each immediate
    /// sub-directory holding one is a module, ordered by directory name.
    pub async fn for_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let root = tokio::fs::canonicalize(dir.as_ref())
            .await
            .map_err(|e| BuildError::ModuleConfig {
                path: dir.as_ref().to_path_buf(),
                reason: e.to_string(),
            })?;

        let modules = match load_module(&root).await? {
            Some(module) => vec![module],
            None => discover_modules(&root).await?,
        };

        let manifest = Manifest::load(&root)
            .await
            .map_err(|e| BuildError::from(e).during("load manifest"))?;

        debug!(
            "Discovered {} module(s) in {} (manifest: {})",
            modules.len(),
            root.display(),
            manifest.is_some()
        );

        Ok(Self {
            bundle_path: root.join(DEFAULT_BUNDLE_FILE),
            root,
            modules,
            manifest,
        })
    }

    /// Build a context from modules supplied by the caller.
    pub fn new(root: impl Into<PathBuf>, modules: Vec<ModuleDescriptor>, manifest: Option<Manifest>) -> Self {
        let root = root.into();
        Self {
            bundle_path: root.join(DEFAULT_BUNDLE_FILE),
            root,
            modules,
            manifest,
        }
    }

    pub fn with_bundle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundle_path = path.into();
        self
    }

    pub fn admitted_modules(&self, languages: &LanguageFilter) -> Vec<ModuleDescriptor> {
        self.modules
            .iter()
            .filter(|m| languages.admits(&m.lang))
            .cloned()
            .collect()
    }

    /// Compiled artifact of each module in `modules`, which must exist.
    pub async fn compiled_modules(
        &self,
        modules: &[ModuleDescriptor],
    ) -> std::result::Result<Vec<ModuleFile>, BundleError> {
        let mut files = Vec::with_capacity(modules.len());

        for module in modules {
            let path = module.artifact_path();
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(ModuleFile {
                    name: module.artifact_file_name(),
                    path,
                }),
                _ => return Err(BundleError::MissingModule { path }),
            }
        }

        Ok(files)
    }
}

async fn load_module(dir: &Path) -> Result<Option<ModuleDescriptor>> {
    let config_path = dir.join(MODULE_CONFIG_FILE);

    let source = match tokio::fs::read_to_string(&config_path).await {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BuildError::ModuleConfig {
                path: config_path,
                reason: e.to_string(),
            })
        }
    };

    let config: ModuleConfig =
        serde_yaml::from_str(&source).map_err(|e| BuildError::ModuleConfig {
            path: config_path.clone(),
            reason: e.to_string(),
        })?;

    Ok(Some(ModuleDescriptor::from_config(config, dir)))
}

async fn discover_modules(root: &Path) -> Result<Vec<ModuleDescriptor>> {
    let read_err = |e: std::io::Error| BuildError::ModuleConfig {
        path: root.to_path_buf(),
        reason: e.to_string(),
    };

    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(root).await.map_err(read_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        if entry.file_type().await.map_err(read_err)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let mut modules = Vec::new();
    for dir in dirs {
        if let Some(module) = load_module(&dir).await? {
            modules.push(module);
        }
    }

    Ok(modules)
}
