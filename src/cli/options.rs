use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::build::{BuildConfig, Toolchain};
use crate::types::LanguageFilter;

/// Builds multi-language runnables to Wasm and packages them into bundles
#[derive(Parser)]
#[command(name = "rustle-build")]
#[command(about = "Build Wasm runnables and package them into deployable bundles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct RustleBuildCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every runnable in a project directory
    Build(BuildArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolchainMode {
    Native,
    Docker,
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Project directory containing runnables
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Toolchain to build with
    #[arg(long, value_enum, default_value = "docker")]
    pub toolchain: ToolchainMode,

    /// Shorthand for --toolchain native
    #[arg(long)]
    pub native: bool,

    /// Only build runnables in these languages (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub langs: Vec<String>,

    /// Tag of the builder images used for docker builds
    #[arg(long)]
    pub builder_tag: Option<String>,

    /// Package the built runnables into a bundle
    #[arg(long)]
    pub bundle: bool,

    /// Bundle output path (defaults to <dir>/bundle.tar.gz)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Kill any single build command running longer than this (seconds)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print build results as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildArgs {
    pub fn toolchain(&self) -> Toolchain {
        if self.native {
            return Toolchain::Native;
        }

        match self.toolchain {
            ToolchainMode::Native => Toolchain::Native,
            ToolchainMode::Docker => Toolchain::Docker,
        }
    }

    pub fn build_config(&self) -> BuildConfig {
        let mut config = BuildConfig::default()
            .with_languages(LanguageFilter::only(self.langs.iter().cloned()))
            .with_command_timeout(self.timeout.map(Duration::from_secs));

        if let Some(tag) = &self.builder_tag {
            config = config.with_builder_tag(tag.clone());
        }

        config
    }
}
