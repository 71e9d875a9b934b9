use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::types::{LanguageFilter, Platform};

/// Where builds run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// Directly on the host with locally installed compilers.
    Native,
    /// Inside a per-language builder image.
    Docker,
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toolchain::Native => write!(f, "native"),
            Toolchain::Docker => write!(f, "docker"),
        }
    }
}

/// Settings threaded through every stage of a build pass.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub languages: LanguageFilter,
    pub builder_tag: String,
    pub platform: Platform,
    /// Program used to launch builder containers.
    pub container_engine: String,
    /// Mount point of the project root inside builder containers.
    pub container_mount: String,
    /// Program invoked inside builder containers.
    pub container_tool: String,
    /// Per-command limit; `None` waits indefinitely.
    pub command_timeout: Option<Duration>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            languages: LanguageFilter::all(),
            builder_tag: format!("v{}", env!("CARGO_PKG_VERSION")),
            platform: Platform::current(),
            container_engine: "docker".to_string(),
            container_mount: "/root/runnable".to_string(),
            container_tool: "rustle-build".to_string(),
            command_timeout: None,
        }
    }
}

impl BuildConfig {
    pub fn with_languages(mut self, languages: LanguageFilter) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_builder_tag(mut self, tag: impl Into<String>) -> Self {
        self.builder_tag = tag.into();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }
}
