use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::build::{
    ensure_container_engine, BuildConfig, ConsoleReporter, Toolchain, ToolchainDispatcher,
};
use crate::bundle::Bundler;
use crate::cli::options::BuildArgs;
use crate::cli::output::{print_build_summary, print_failed_results, print_results_json};
use crate::context::BuildContext;

/// `rustle-build build`
pub async fn run_build(args: &BuildArgs) -> Result<()> {
    let mut context = BuildContext::for_directory(&args.dir)
        .await
        .with_context(|| format!("failed to load project {}", args.dir.display()))?;

    if let Some(output) = &args.output {
        context = context.with_bundle_path(output.clone());
    }

    let config = args.build_config();
    let toolchain = args.toolchain();

    if needs_container_engine(toolchain, &context, &config) {
        let engine = ensure_container_engine(&config)?;
        info!("Using container engine {}", engine.display());
    }

    let languages = config.languages.clone();
    let reporter = Arc::new(ConsoleReporter);
    let mut dispatcher =
        ToolchainDispatcher::new(config, &context.root).with_reporter(reporter.clone());

    let outcome = dispatcher.run(toolchain, &mut context.modules).await;
    let results = dispatcher.results().unwrap_or_default();

    if args.json {
        print_results_json(&results)?;
    }

    if let Err(e) = outcome {
        print_failed_results(&results);
        return Err(e).context("🚫 build failed");
    }

    if results.is_empty() {
        println!("ℹ️  no runnables to build in {}", context.root.display());
    } else if !args.json {
        print_build_summary(&results);
    }

    if args.bundle {
        let bundle = Bundler::default()
            .with_reporter(reporter)
            .finalize(&mut context, dispatcher.aggregator(), &languages)
            .await
            .context("🚫 failed to bundle")?;
        info!("Bundle written to {}", bundle.display());
    }

    Ok(())
}

/// A containerized pass only touches the engine when some module is admitted.
fn needs_container_engine(toolchain: Toolchain, context: &BuildContext, config: &BuildConfig) -> bool {
    toolchain == Toolchain::Docker && !context.admitted_modules(&config.languages).is_empty()
}
