//! agri-server: Agri Agent Main Binary
//!
//! Usage:
//!   agri-server                    - Start the HTTP API server
//!   agri-server --config <path>    - Start with an explicit TOML config file
//!   agri-server --help             - Show help

use agri_core::{ChatOptions, ChatSession, Config, HistoryStore, OpenAiClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Server mode, optionally with an explicit config file
    Server { config_path: Option<String> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("agri-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config_path } => config_path,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = match &config_path {
        Some(path) => Config::from_toml_file(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting agri-server...");
    tracing::info!("Model: {} at {}", config.llm.model, config.llm.base_url);

    run_server(config).await
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<RunMode> {
    let mut args = args.into_iter();
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(path);
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Server { config_path })
}

/// Print help message
fn print_help() {
    println!("agri-server - streaming agriculture advisor");
    println!();
    println!("Usage:");
    println!("  agri-server                  Start the HTTP API server");
    println!("  agri-server --config <path>  Load settings from a TOML file");
    println!("  agri-server --help           Show this help message");
    println!("  agri-server --version        Show version");
    println!();
    println!("Without --config, ./agri-agent.toml is used when present.");
    println!();
    println!("Environment Variables:");
    println!("  LM_MODEL              Model name (default: qwen2.5-7b-instruct)");
    println!("  LM_STUDIO_BASE_URL    Chat-completion endpoint (default: http://localhost:1234/v1)");
    println!("  LLM_API_KEY           API key (default: lm-studio)");
    println!("  LLM_TEMPERATURE       Sampling temperature (default: 0.4)");
    println!("  LLM_TIMEOUT_SECS      Provider request timeout (default: none)");
    println!("  API_PORT              HTTP API port (default: 5000)");
    println!("  API_ALLOWED_ORIGINS   Comma-separated CORS origins (default: any)");
    println!("  HISTORY_DATA_DIR      Session history directory (default: data)");
    println!("  HISTORY_MAX_MESSAGES  Messages kept per session (default: 20)");
    println!("  HISTORY_WINDOW        Messages sent with each question (default: 10)");
    println!("  DEFAULT_LOCATION      Location when a request has none (default: India)");
    println!("  RUST_LOG              Log filter (default: info)");
}

/// Run server mode
async fn run_server(config: Config) -> anyhow::Result<()> {
    // Create the history store (creates the data directory)
    let store = HistoryStore::new(&config.history.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create history store: {}", e))?;
    tracing::info!("Session history stored in {}", store.data_dir().display());

    // Create the LLM client once and hand it to the chat session
    let client = OpenAiClient::new(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?;

    let chat = ChatSession::new(Arc::new(client), Arc::new(store), ChatOptions::from(&config));

    // Start HTTP API server
    let api_port = config.api.port;
    let handle = tokio::spawn(async move {
        if let Err(e) = agri_api::start_server(config, chat).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    tracing::info!("HTTP API server started on port {}", api_port);
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    handle.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
