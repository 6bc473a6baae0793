// Pagesmith application builder
// Main entry point for the pagesmith binary

use clap::Parser;
use pagesmith_engine::cli::{Cli, Command};
use pagesmith_engine::config::Config;
use pagesmith_engine::handlers::{
    handle_build, handle_preview, handle_serve, handle_show, hinted, OutputFormat,
};
use pagesmith_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Credentials may come from a .env file in the working directory
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    // Load configuration (or use custom path if provided)
    let config = Config::load_or_default(cli.config.as_deref()).map_err(hinted)?;

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Pagesmith v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Serve { bind } => {
            tracing::info!("Starting server...");
            handle_serve(&config, bind).await
        }

        Command::Build { request } => {
            tracing::info!("Running build from {}", request.display());
            handle_build(&request, &config, format).await
        }

        Command::Show { task } => handle_show(&task, &config, format).await,

        Command::Preview { brief, checks, out } => {
            handle_preview(&brief, &checks, out, format).await
        }
    }
}
