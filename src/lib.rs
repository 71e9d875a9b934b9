//! Rustle Build - multi-language Wasm module builder and bundler
//!
//! This crate compiles the runnables of a project, each possibly written in a
//! different language, either directly on the host or inside per-language
//! builder containers, and packages the results together with a manifest and
//! static assets into a single deployable bundle.

pub mod build;
pub mod bundle;
pub mod cli;
pub mod context;
pub mod error;
pub mod manifest;
pub mod process;
pub mod types;

pub use build::{BuildConfig, Toolchain, ToolchainDispatcher};
pub use bundle::Bundler;
pub use context::BuildContext;
pub use error::{BuildError, ErrorKind, Result};
pub use manifest::Manifest;
pub use types::*;
