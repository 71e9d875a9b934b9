use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::build::BuildConfig;
use crate::error::{BuildError, Result};
use crate::process::{CommandLine, CommandRunner};
use crate::types::{BuildResult, Language};

/// Builder image for `language` at `tag`, e.g. `rustle/builder-rs:v0.1.0`.
pub fn image_for_language(language: Language, tag: &str) -> String {
    format!("rustle/{}:{}", language.image_name(), tag)
}

/// Fails when the configured container engine is not installed.
pub fn ensure_container_engine(config: &BuildConfig) -> Result<PathBuf> {
    which::which(&config.container_engine).map_err(|_| BuildError::ContainerEngineMissing {
        engine: config.container_engine.clone(),
    })
}

/// Builds every module of one language by running this tool in native mode
/// inside that language's builder image.
pub struct ContainerBuildDispatcher {
    config: BuildConfig,
    project_root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ContainerBuildDispatcher {
    pub fn new(config: BuildConfig, project_root: impl AsRef<Path>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            project_root: project_root.as_ref().to_path_buf(),
            runner,
        }
    }

    /// Name given to the container building `language`, unique per process
    /// so a timed out build can be stopped by name.
    pub fn container_name(&self, language: Language) -> String {
        format!("rustle-build-{}-{}", language.as_str(), std::process::id())
    }

    pub fn command_for(&self, language: Language) -> CommandLine {
        CommandLine::new(&self.config.container_engine)
            .args(["run", "--rm", "--name"])
            .arg(self.container_name(language))
            .arg("--mount")
            .arg(format!(
                "type=bind,source={},target={}",
                self.project_root.display(),
                self.config.container_mount
            ))
            .arg(image_for_language(language, &self.config.builder_tag))
            .arg(&self.config.container_tool)
            .arg("build")
            .arg(&self.config.container_mount)
            .args(["--native", "--langs", language.as_str()])
    }

    /// The container's combined output becomes the result log; its exit
    /// status alone decides success.
    pub async fn build_language(&self, language: Language, result: &mut BuildResult) -> Result<()> {
        let command = self.command_for(language);
        debug!("Running containerized {} build: {}", language, command);

        let output = self.runner.run(&command, None).await.map_err(|e| {
            BuildError::CommandFailed {
                command: command.to_string(),
                reason: e.to_string(),
            }
        })?;

        result.output_log = output.output.clone();
        result.succeeded = output.success;

        if output.timed_out {
            self.stop_container(language, result).await;
        }

        if !output.success {
            return Err(BuildError::CommandFailed {
                command: command.to_string(),
                reason: output.failure_reason(),
            });
        }

        Ok(())
    }

    /// Killing the engine client leaves the container running against the
    /// mounted project, so stop it through the engine.
    async fn stop_container(&self, language: Language, result: &mut BuildResult) {
        let kill = CommandLine::new(&self.config.container_engine)
            .arg("kill")
            .arg(self.container_name(language));

        match self.runner.run(&kill, None).await {
            Ok(output) if output.success => debug!("Stopped container for {}", language),
            Ok(output) => result.append_log(&output.output),
            Err(e) => warn!("Failed to run `{}`: {}", kill, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use crate::types::BuildUnit;
    use async_trait::async_trait;

    use std::sync::Mutex;

    /// Answers `docker run` with a fixed output and records every command.
    struct FixedRunner {
        output: CommandOutput,
        seen: Mutex<Vec<CommandLine>>,
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, command: &CommandLine, _: Option<&Path>) -> std::io::Result<CommandOutput> {
            self.seen.lock().unwrap().push(command.clone());
            if command.args.first().map(String::as_str) == Some("kill") {
                return Ok(CommandOutput::success(""));
            }
            Ok(self.output.clone())
        }
    }

    fn runner(output: CommandOutput) -> Arc<FixedRunner> {
        Arc::new(FixedRunner {
            output,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn dispatcher_with(runner: Arc<FixedRunner>) -> ContainerBuildDispatcher {
        let config = BuildConfig::default().with_builder_tag("v0.4.0");
        ContainerBuildDispatcher::new(config, "/home/dev/app", runner)
    }

    fn dispatcher(output: CommandOutput) -> ContainerBuildDispatcher {
        dispatcher_with(runner(output))
    }

    #[test]
    fn test_image_reference() {
        assert_eq!(
            image_for_language(Language::AssemblyScript, "v0.4.0"),
            "rustle/builder-as:v0.4.0"
        );
        assert_eq!(
            image_for_language(Language::TypeScript, "latest"),
            image_for_language(Language::JavaScript, "latest")
        );
    }

    #[test]
    fn test_command_restricts_inner_build_to_one_language() {
        let builder = dispatcher(CommandOutput::success(""));
        let cmd = builder.command_for(Language::Rust);
        let name = builder.container_name(Language::Rust);

        assert_eq!(cmd.program, "docker");
        assert_eq!(
            cmd.args,
            vec![
                "run",
                "--rm",
                "--name",
                name.as_str(),
                "--mount",
                "type=bind,source=/home/dev/app,target=/root/runnable",
                "rustle/builder-rs:v0.4.0",
                "rustle-build",
                "build",
                "/root/runnable",
                "--native",
                "--langs",
                "rust",
            ]
        );
    }

    #[tokio::test]
    async fn test_timed_out_container_is_killed_by_name() {
        let runner = runner(CommandOutput::timed_out("compiling echo"));
        let builder = dispatcher_with(runner.clone());

        let mut result = BuildResult::start(BuildUnit::Language(Language::Swift));
        let err = builder
            .build_language(Language::Swift, &mut result)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(!result.succeeded);
        assert_eq!(result.output_log, "compiling echo");

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1].to_string(),
            format!("docker kill {}", builder.container_name(Language::Swift))
        );
    }

    #[tokio::test]
    async fn test_finished_container_is_not_killed() {
        let runner = runner(CommandOutput::failure("error[E0425]", Some(101)));
        let builder = dispatcher_with(runner.clone());

        let mut result = BuildResult::start(BuildUnit::Language(Language::Rust));
        assert!(builder.build_language(Language::Rust, &mut result).await.is_err());
        assert_eq!(runner.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exit_status_decides_success() {
        let mut result = BuildResult::start(BuildUnit::Language(Language::Rust));
        dispatcher(CommandOutput::success("built 2 modules"))
            .build_language(Language::Rust, &mut result)
            .await
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.output_log, "built 2 modules");

        let mut result = BuildResult::start(BuildUnit::Language(Language::Rust));
        let err = dispatcher(CommandOutput::failure("error[E0425]", Some(101)))
            .build_language(Language::Rust, &mut result)
            .await
            .unwrap_err();
        assert!(!result.succeeded);
        assert_eq!(result.output_log, "error[E0425]");
        assert!(err.to_string().contains("exit status 101"));
    }
}
