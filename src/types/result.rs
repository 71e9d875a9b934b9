use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Language;

/// What a single [`BuildResult`] covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum BuildUnit {
    /// One module built on the host.
    Module(String),
    /// Every module of one language, built inside a container.
    Language(Language),
}

impl fmt::Display for BuildUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildUnit::Module(name) => write!(f, "{name}"),
            BuildUnit::Language(lang) => write!(f, "{lang} (container)"),
        }
    }
}

/// Outcome and captured output of one build unit. Recorded whether or not the
/// unit succeeded so the log survives a failed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub unit: BuildUnit,
    pub succeeded: bool,
    pub output_log: String,
    pub started_at: DateTime<Utc>,
}

impl BuildResult {
    pub fn start(unit: BuildUnit) -> Self {
        Self {
            unit,
            succeeded: false,
            output_log: String::new(),
            started_at: Utc::now(),
        }
    }

    pub fn append_log(&mut self, output: &str) {
        self.output_log.push_str(output);
        self.output_log.push('\n');
    }
}
