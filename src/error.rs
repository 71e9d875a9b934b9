use std::path::PathBuf;
use thiserror::Error;

use crate::bundle::BundleError;
use crate::manifest::ManifestError;

/// Coarse classification of a [`BuildError`], used by callers that only care
/// about which stage of a pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Prerequisite,
    Compile,
    Bundling,
    State,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unsupported OS: {os}")]
    UnsupportedOs { os: String },

    #[error("unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    #[error("container engine {engine} not found on PATH")]
    ContainerEngineMissing { engine: String },

    #[error("failed to load module config {path}: {reason}")]
    ModuleConfig { path: PathBuf, reason: String },

    #[error("prerequisite `{command}` failed in {dir}: {reason}")]
    PrerequisiteFailed {
        command: String,
        dir: PathBuf,
        reason: String,
    },

    #[error("failed to read project file {path}: {source}")]
    ProjectFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render build command for {module}: {reason}")]
    CommandRender { module: String, reason: String },

    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("must build before bundling")]
    NothingBuilt,

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("failed to {operation}: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Wrap this error with the name of the operation that produced it.
    pub fn during(self, operation: impl Into<String>) -> Self {
        BuildError::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::UnsupportedOs { .. }
            | BuildError::UnsupportedLanguage { .. }
            | BuildError::ContainerEngineMissing { .. }
            | BuildError::ModuleConfig { .. } => ErrorKind::Configuration,
            BuildError::PrerequisiteFailed { .. } => ErrorKind::Prerequisite,
            BuildError::ProjectFileRead { .. }
            | BuildError::CommandRender { .. }
            | BuildError::CommandFailed { .. } => ErrorKind::Compile,
            BuildError::Manifest(_) | BuildError::Bundle(_) => ErrorKind::Bundling,
            BuildError::NothingBuilt => ErrorKind::State,
            BuildError::Operation { source, .. } => source.kind(),
        }
    }

    /// The innermost error once every operation wrapper is peeled off.
    pub fn root(&self) -> &BuildError {
        match self {
            BuildError::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
