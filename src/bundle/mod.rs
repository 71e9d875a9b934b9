//! Final bundle assembly: manifest versioning and validation, static asset
//! collection, and handing everything to a [`BundleWriter`].

pub mod tar_writer;

pub use tar_writer::{read_bundle, BundleContents, TarBundleWriter};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::build::{BuildReporter, ResultAggregator, TracingReporter};
use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::manifest::Manifest;
use crate::types::LanguageFilter;

pub const STATIC_DIR: &str = "static";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("compiled module {path} not found, was it built?")]
    MissingModule { path: PathBuf },

    #[error("failed to collect static files from {path}: {reason}")]
    StaticAssets { path: PathBuf, reason: String },

    #[error("failed to write bundle {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("failed to read bundle {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// A compiled module to include in a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    /// File name inside the bundle, e.g. `fetch.wasm`.
    pub name: String,
    pub path: PathBuf,
}

/// Files under a project's `static/` directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAssets {
    pub root: PathBuf,
    /// `/`-separated paths relative to `root`, sorted.
    pub files: Vec<String>,
}

impl StaticAssets {
    pub fn full_path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

/// Serializes a bundle to `output`. Implementations must not leave a partial
/// file behind on failure.
#[async_trait]
pub trait BundleWriter: Send + Sync {
    async fn write(
        &self,
        manifest: &[u8],
        modules: &[ModuleFile],
        static_assets: Option<&StaticAssets>,
        output: &Path,
    ) -> std::result::Result<(), BundleError>;
}

/// Collect `<project root>/static`. A missing directory yields `None`.
pub async fn collect_static_files(project_root: &Path) -> std::result::Result<Option<StaticAssets>, BundleError> {
    let root = project_root.join(STATIC_DIR);

    match tokio::fs::metadata(&root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BundleError::StaticAssets {
                path: root,
                reason: e.to_string(),
            })
        }
    }

    let walk_root = root.clone();
    let files = tokio::task::spawn_blocking(move || walk_static(&walk_root))
        .await
        .map_err(|e| BundleError::StaticAssets {
            path: root.clone(),
            reason: format!("task join error: {e}"),
        })??;

    Ok(Some(StaticAssets { root, files }))
}

fn walk_static(root: &Path) -> std::result::Result<Vec<String>, BundleError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| BundleError::StaticAssets {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| BundleError::StaticAssets {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;

        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(key);
    }

    Ok(files)
}

/// Turns the results of a build pass into a bundle file.
pub struct Bundler {
    writer: Arc<dyn BundleWriter>,
    reporter: Arc<dyn BuildReporter>,
}

impl Default for Bundler {
    fn default() -> Self {
        Self::new(Arc::new(TarBundleWriter::new()))
    }
}

impl Bundler {
    pub fn new(writer: Arc<dyn BundleWriter>) -> Self {
        Self {
            writer,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Finalize the manifest and write the bundle to `context.bundle_path`.
    ///
    /// A headless manifest gets its major version bumped and is persisted back
    /// to the project, but only once the augmented manifest validates.
    pub async fn finalize(
        &self,
        context: &mut BuildContext,
        results: &ResultAggregator,
        languages: &LanguageFilter,
    ) -> Result<PathBuf> {
        results.snapshot()?;

        let built = context.admitted_modules(languages);
        let headless = context.manifest.as_ref().is_some_and(|m| m.headless);

        let mut base = context
            .manifest
            .clone()
            .unwrap_or_else(Manifest::synthesized);

        if headless {
            self.reporter.info("updating Manifest");
            base.bump_major()
                .map_err(|e| BuildError::from(e).during("bump manifest version"))?;
        }

        let mut manifest = base.clone();
        manifest
            .augment(&built)
            .map_err(|e| BuildError::from(e).during("augment manifest functions"))?;
        manifest
            .validate()
            .map_err(|e| BuildError::from(e).during("validate manifest"))?;

        let static_assets = collect_static_files(&context.root)
            .await
            .map_err(|e| BuildError::from(e).during("collect static files"))?;
        if static_assets.is_some() {
            self.reporter.info("adding static files to bundle");
        }

        let manifest_bytes = manifest
            .to_yaml()
            .map_err(|e| BuildError::from(e).during("serialize manifest"))?;

        let modules = context
            .compiled_modules(&built)
            .await
            .map_err(|e| BuildError::from(e).during("gather compiled modules"))?;

        if headless {
            let path = base
                .write(&context.root)
                .await
                .map_err(|e| BuildError::from(e).during("write manifest"))?;
            debug!("Wrote updated manifest to {}", path.display());
        }
        context.manifest = Some(base);

        self.writer
            .write(
                manifest_bytes.as_bytes(),
                &modules,
                static_assets.as_ref(),
                &context.bundle_path,
            )
            .await
            .map_err(|e| BuildError::from(e).during("write bundle"))?;

        self.reporter.done(&format!(
            "bundle was created -> {}",
            context.bundle_path.display()
        ));

        Ok(context.bundle_path.clone())
    }
}
