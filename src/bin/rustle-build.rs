use clap::Parser;
use rustle_build::cli::{run_build, Commands, RustleBuildCli};

#[tokio::main]
async fn main() {
    let cli = RustleBuildCli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let outcome = match &cli.command {
        Commands::Build(args) => run_build(args).await,
    };

    if let Err(e) = outcome {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
