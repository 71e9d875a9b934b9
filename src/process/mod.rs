//! Process execution used for prerequisite fixes, native build steps and
//! containerized builds.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A program and its argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        f.write_str(&shell_words::join(words))
    }
}

/// Combined output and exit state of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
    pub success: bool,
    pub code: Option<i32>,
    /// The command was killed for exceeding the runner's timeout.
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            code: Some(0),
            timed_out: false,
        }
    }

    pub fn failure(output: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            output: output.into(),
            success: false,
            code,
            timed_out: false,
        }
    }

    /// A command killed after `limit`. `output` is whatever it printed first.
    pub fn timed_out(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
            code: None,
            timed_out: true,
        }
    }

    /// Short description of why the command failed, for error messages.
    pub fn failure_reason(&self) -> String {
        if self.timed_out {
            return "timed out".to_string();
        }

        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated without exit status".to_string(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion, in `working_dir` when given.
    ///
    /// An `Err` means the process could not be started at all; a process that
    /// ran and failed is reported through [`CommandOutput::success`].
    async fn run(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
    ) -> std::io::Result<CommandOutput>;
}

/// How long output readers may keep draining after a timed out command was
/// killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Runs commands on the host with `tokio::process`.
///
/// On unix every command leads its own process group, so a timeout kills
/// everything the command started, not only the direct child.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any command still running after `timeout` and report it as failed.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
    ) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        debug!("Running `{}` in {:?}", command, working_dir);

        let mut child = cmd.spawn()?;
        let stdout = CapturedStream::spawn(child.stdout.take());
        let stderr = CapturedStream::spawn(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    warn!("`{}` timed out after {:?}, killing it", command, limit);
                    kill_process_tree(&mut child).await;
                    None
                }
            },
            None => Some(child.wait().await?),
        };

        let mut combined = stdout.finish().await;
        combined.push_str(&stderr.finish().await);

        match status {
            Some(status) => Ok(CommandOutput {
                output: combined,
                success: status.success(),
                code: status.code(),
                timed_out: false,
            }),
            None => {
                if !combined.is_empty() && !combined.ends_with('\n') {
                    combined.push('\n');
                }
                let limit = self.timeout.unwrap_or_default();
                combined.push_str(&format!("`{command}` timed out after {}s", limit.as_secs_f32()));
                Ok(CommandOutput::timed_out(combined))
            }
        }
    }
}

async fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }

    if let Err(e) = child.kill().await {
        debug!("kill of timed out command failed: {}", e);
    }
}

/// Drains one output pipe in the background. Bytes read so far are kept even
/// when the reader is cut off.
struct CapturedStream {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl CapturedStream {
    fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = reader.map(|mut reader| {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let mut captured =
                                buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                            captured.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            })
        });

        Self { buffer, task }
    }

    async fn finish(self) -> String {
        if let Some(mut task) = self.task {
            if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }

        let bytes = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_arguments() {
        let cmd = CommandLine::new("cp")
            .arg("build/release.wasm")
            .arg("my module.wasm");
        assert_eq!(cmd.to_string(), "cp build/release.wasm 'my module.wasm'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output_and_status() {
        let runner = SystemRunner::new();

        let ok = runner
            .run(&CommandLine::new("sh").args(["-c", "echo hello"]), None)
            .await
            .unwrap();
        assert!(ok.success);
        assert_eq!(ok.output.trim(), "hello");

        let failed = runner
            .run(&CommandLine::new("sh").args(["-c", "echo oops >&2; exit 3"]), None)
            .await
            .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.code, Some(3));
        assert!(failed.output.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_uses_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = SystemRunner::new();

        let out = runner
            .run(&CommandLine::new("pwd"), Some(dir.path()))
            .await
            .unwrap();

        let reported = std::fs::canonicalize(out.output.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_times_out() {
        let runner = SystemRunner::with_timeout(Some(Duration::from_millis(100)));
        let out = runner
            .run(&CommandLine::new("sleep").arg("5"), None)
            .await
            .unwrap();
        assert!(!out.success);
        assert!(out.timed_out);
        assert_eq!(out.failure_reason(), "timed out");
        assert!(out.output.contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_background_children_and_keeps_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = SystemRunner::with_timeout(Some(Duration::from_millis(200)));

        let out = runner
            .run(
                &CommandLine::new("sh").args(["-c", "echo started; (sleep 1; touch marker) & wait"]),
                Some(dir.path()),
            )
            .await
            .unwrap();

        assert!(out.timed_out);
        assert!(out.output.starts_with("started\n"));
        assert!(out.output.contains("timed out"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let runner = SystemRunner::new();
        let result = runner
            .run(&CommandLine::new("definitely-not-a-real-program-xyz"), None)
            .await;
        assert!(result.is_err());
    }
}
