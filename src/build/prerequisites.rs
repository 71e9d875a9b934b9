use std::io::ErrorKind;
use std::sync::Arc;
use tracing::debug;

use crate::build::BuildReporter;
use crate::error::{BuildError, Result};
use crate::process::{CommandLine, CommandRunner};
use crate::types::{BuildResult, Language, ModuleDescriptor, Platform};

/// A file a module needs before it can compile, and the command that
/// generates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteRule {
    /// Path relative to the module directory.
    pub file: &'static str,
    pub fix: CommandLine,
}

impl PrerequisiteRule {
    fn new(file: &'static str, fix: CommandLine) -> Self {
        Self { file, fix }
    }
}

/// Prerequisite rules for `language` on `platform`, in the order they must be
/// checked.
pub fn prerequisite_rules(platform: &Platform, language: Language) -> Result<Vec<PrerequisiteRule>> {
    match platform {
        Platform::Linux | Platform::MacOS => {}
        other => {
            return Err(BuildError::UnsupportedOs {
                os: other.to_string(),
            })
        }
    }

    let npm_install = || CommandLine::new("npm").args(["install", "--no-audit"]);

    let rules = match language {
        Language::Rust | Language::Swift | Language::Grain => Vec::new(),
        Language::AssemblyScript | Language::TypeScript | Language::JavaScript => {
            vec![PrerequisiteRule::new("node_modules", npm_install())]
        }
        Language::TinyGo => vec![PrerequisiteRule::new(
            "go.sum",
            CommandLine::new("go").args(["mod", "tidy"]),
        )],
    };

    Ok(rules)
}

/// Makes sure generated prerequisite files exist in a module directory,
/// running each rule's fix command when its file is missing.
pub struct PrerequisiteResolver {
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<dyn BuildReporter>,
}

impl PrerequisiteResolver {
    pub fn new(
        platform: Platform,
        runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn BuildReporter>,
    ) -> Self {
        Self {
            platform,
            runner,
            reporter,
        }
    }

    /// Fix command output is appended to `result`.
    pub async fn ensure(&self, module: &ModuleDescriptor, result: &mut BuildResult) -> Result<()> {
        let rules = prerequisite_rules(&self.platform, module.language()?)?;

        for rule in rules {
            let required = module.path.join(rule.file);

            // Only a definite "not found" triggers a fix; any other stat error
            // counts as the file being present.
            match tokio::fs::metadata(&required).await {
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    debug!("Treating {} as present: {}", required.display(), e);
                    continue;
                }
            }

            self.reporter
                .start(&format!("missing {}, fixing...", rule.file));

            let output = self
                .runner
                .run(&rule.fix, Some(&module.path))
                .await
                .map_err(|e| BuildError::PrerequisiteFailed {
                    command: rule.fix.to_string(),
                    dir: module.path.clone(),
                    reason: e.to_string(),
                })?;

            result.append_log(&output.output);

            if !output.success {
                return Err(BuildError::PrerequisiteFailed {
                    command: rule.fix.to_string(),
                    dir: module.path.clone(),
                    reason: output.failure_reason(),
                });
            }

            self.reporter.done("fixed!");
        }

        Ok(())
    }
}
