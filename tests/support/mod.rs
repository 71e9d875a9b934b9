//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rustle_build::process::{CommandLine, CommandOutput, CommandRunner};
use rustle_build::types::{ModuleDescriptor, MODULE_CONFIG_FILE};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub dir: Option<PathBuf>,
}

type Script = Box<dyn Fn(&CommandLine, Option<&Path>) -> CommandOutput + Send + Sync>;

/// Records every command and simulates the side effects build tools have on
/// a module directory: `npm install` creates `node_modules`, `go mod tidy`
/// creates `go.sum`, and the last step of a recipe writes the artifact.
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCall>>,
    script: Script,
}

impl RecordingRunner {
    pub fn succeeding() -> Self {
        Self::scripted(|cmd, _| CommandOutput::success(format!("ran {cmd}")))
    }

    /// Fail every command run inside a directory named `failing_dir`.
    pub fn failing_in(failing_dir: &str) -> Self {
        let failing_dir = failing_dir.to_string();
        Self::scripted(move |cmd, dir| {
            let in_failing_dir = dir
                .and_then(|d| d.file_name())
                .is_some_and(|name| name == failing_dir.as_str());
            if in_failing_dir {
                CommandOutput::failure(format!("error: {cmd} exploded"), Some(1))
            } else {
                CommandOutput::success(format!("ran {cmd}"))
            }
        })
    }

    pub fn scripted<F>(script: F) -> Self
    where
        F: Fn(&CommandLine, Option<&Path>) -> CommandOutput + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Box::new(script),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn calls_in(&self, dir: &Path) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.dir.as_deref() == Some(dir))
            .count()
    }

    fn simulate_side_effects(command: &CommandLine, dir: &Path) {
        let rendered = command.to_string();
        if rendered.starts_with("npm install") {
            std::fs::create_dir_all(dir.join("node_modules")).unwrap();
        } else if rendered.starts_with("go mod tidy") {
            std::fs::write(dir.join("go.sum"), "").unwrap();
        }

        let artifact = match command.program.as_str() {
            "cp" | "npx" => command.args.last().cloned(),
            "tinygo" | "grain" | "javy" => command
                .args
                .iter()
                .skip_while(|a| a.as_str() != "-o")
                .nth(1)
                .cloned(),
            _ => None,
        };
        if let Some(artifact) = artifact {
            std::fs::write(dir.join(artifact.trim_start_matches("./")), b"\0asm\x01\0\0\0").unwrap();
        }
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
    ) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(RecordedCall {
            command: command.to_string(),
            dir: working_dir.map(Path::to_path_buf),
        });

        let output = (self.script)(command, working_dir);
        if output.success {
            if let Some(dir) = working_dir {
                Self::simulate_side_effects(command, dir);
            }
        }

        Ok(output)
    }
}

/// Create `<root>/<dir>` with a `.runnable.yaml` and return its descriptor.
pub fn module_in(root: &Path, dir: &str, name: &str, lang: &str) -> ModuleDescriptor {
    let path = root.join(dir);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(
        path.join(MODULE_CONFIG_FILE),
        format!("name: {name}\nlang: {lang}\n"),
    )
    .unwrap();
    ModuleDescriptor::new(name, lang, path)
}
