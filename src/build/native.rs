use std::sync::Arc;
use tracing::debug;

use crate::error::{BuildError, Result};
use crate::process::{CommandLine, CommandRunner};
use crate::types::{BuildResult, Language, ModuleDescriptor};

/// Ordered host commands that compile `module` into
/// `<module dir>/<name>.wasm`. Module fields are bound into each argument
/// directly; extra compiler flags are split with shell quoting rules.
pub fn native_build_steps(module: &ModuleDescriptor) -> Result<Vec<CommandLine>> {
    let artifact = module.artifact_file_name();
    let extra_flags = shell_words::split(&module.compiler_flags).map_err(|e| {
        BuildError::CommandRender {
            module: module.name.clone(),
            reason: format!("invalid compiler flags {:?}: {e}", module.compiler_flags),
        }
    })?;

    let steps = match module.language()? {
        Language::Rust => vec![
            CommandLine::new("cargo")
                .args(["build", "--target", "wasm32-wasi", "--lib", "--release"])
                .args(extra_flags),
            CommandLine::new("cp")
                .arg(format!(
                    "target/wasm32-wasi/release/{}.wasm",
                    module.underscore_name()
                ))
                .arg(format!("./{artifact}")),
        ],
        Language::Swift => vec![
            CommandLine::new("swift")
                .args([
                    "build",
                    "-c",
                    "release",
                    "--triple",
                    "wasm32-unknown-wasi",
                    "-Xlinker",
                    "--allow-undefined",
                    "-Xlinker",
                    "--export=allocate",
                    "-Xlinker",
                    "--export=deallocate",
                    "-Xlinker",
                    "--export=run_e",
                    "-Xlinker",
                    "--export=init",
                ])
                .args(extra_flags),
            CommandLine::new("cp")
                .arg(format!(".build/release/{}.wasm", module.name))
                .arg(format!("./{artifact}")),
        ],
        Language::AssemblyScript => vec![CommandLine::new("npx")
            .args([
                "asc",
                "src/index.ts",
                "--target",
                "release",
                "--use",
                "abort=src/index/abort",
            ])
            .args(extra_flags)
            .arg("--outFile")
            .arg(format!("./{artifact}"))],
        Language::TinyGo => vec![CommandLine::new("tinygo")
            .arg("build")
            .args(extra_flags)
            .args(["-o", artifact.as_str(), "-target", "wasi", "."])],
        Language::Grain => vec![CommandLine::new("grain")
            .arg("compile")
            .args(extra_flags)
            .args(["index.gr", "-o", artifact.as_str()])],
        Language::TypeScript | Language::JavaScript => vec![
            CommandLine::new("npm").args(["run", "build"]),
            CommandLine::new("javy")
                .args(["compile", "build/index.js"])
                .args(extra_flags)
                .args(["-o", artifact.as_str()]),
        ],
    };

    Ok(steps)
}

/// Runs a module's build steps on the host.
pub struct NativeBuildExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl NativeBuildExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Steps run in order inside the module directory and stop at the first
    /// failure. Every step's output is appended to `result`, and
    /// `result.succeeded` reflects the last step that ran.
    pub async fn build(&self, module: &ModuleDescriptor, result: &mut BuildResult) -> Result<()> {
        let steps = native_build_steps(module)?;

        for step in steps {
            let command = step.to_string();
            debug!("[{}] {}", module.name, command.trim());

            let output = match self.runner.run(&step, Some(&module.path)).await {
                Ok(output) => output,
                Err(e) => {
                    result.append_log(&e.to_string());
                    result.succeeded = false;
                    return Err(BuildError::CommandFailed {
                        command,
                        reason: e.to_string(),
                    });
                }
            };

            result.append_log(&output.output);

            if !output.success {
                result.succeeded = false;
                return Err(BuildError::CommandFailed {
                    command,
                    reason: output.failure_reason(),
                });
            }

            result.succeeded = true;
        }

        Ok(())
    }
}
