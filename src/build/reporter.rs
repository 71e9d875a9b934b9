use tracing::info;

/// Presentation-only progress notifications. Nothing in the build pipeline
/// depends on what a reporter does with them.
pub trait BuildReporter: Send + Sync {
    fn start(&self, msg: &str);
    fn done(&self, msg: &str);
    fn info(&self, msg: &str);
}

/// Forwards progress to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl BuildReporter for TracingReporter {
    fn start(&self, msg: &str) {
        info!(stage = "start", "{msg}");
    }

    fn done(&self, msg: &str) {
        info!(stage = "done", "{msg}");
    }

    fn info(&self, msg: &str) {
        info!("{msg}");
    }
}

/// Prints progress lines for an interactive terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl BuildReporter for ConsoleReporter {
    fn start(&self, msg: &str) {
        println!("⏩ START: {msg}");
    }

    fn done(&self, msg: &str) {
        println!("✅ DONE: {msg}");
    }

    fn info(&self, msg: &str) {
        println!("ℹ️  {msg}");
    }
}
