//! Recollect daemon - HTTP API over the memory engine

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use recollect::api::ApiServer;
use recollect::config::Config;
use recollect::error::Result;
use recollect::memory::MemoryCoordinator;
use recollect::providers::{build_embedder, build_generator};
use recollect::storage::open_store;

/// Recollect - chat with an LLM that remembers
#[derive(Parser)]
#[command(name = "recollect")]
#[command(about = "A conversational memory engine with short-term, episodic and summary tiers")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recollect=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting Recollect daemon");

    let config = Config::load(config_path.as_deref())?;
    tracing::debug!("Config loaded: {:?}", config);

    let retry_budget = config.generation.retry_budget_secs();
    if config.server.request_timeout_secs <= retry_budget {
        tracing::warn!(
            "server.request_timeout_secs ({}) is below the generation retry budget ({}s); \
             slow replies will time out before retries finish",
            config.server.request_timeout_secs,
            retry_budget
        );
    }

    let store = open_store(&config.storage).await?;

    let generator = build_generator(&config.generation).map_err(|e| e.into_generation_error())?;

    tracing::info!("Initializing embedding provider (a local model may download on first run)...");
    let embedder = build_embedder(&config.embedding).map_err(|e| e.into_embedding_error())?;

    let coordinator = Arc::new(MemoryCoordinator::new(
        store,
        generator,
        embedder,
        config.memory.clone(),
    ));

    let server = ApiServer::new(config.server.clone(), coordinator);
    tracing::info!("Starting API server on {}", config.server.listen_addr);

    server.serve().await?;

    tracing::info!("Recollect daemon stopped");
    Ok(())
}
