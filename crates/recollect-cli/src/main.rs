use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use recollect::config::Config;
use recollect::storage::{LanceStore, MemoryStore};
use recollect_cli::commands::{ActivityCommand, DigestsCommand, EpisodesCommand, HistoryCommand};
use recollect_cli::error::{CliError, CliResult};
use recollect_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "recollect-cli")]
#[command(about = "Recollect CLI - Inspect stored conversational memory")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to data directory")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Show the turn log of a session")]
    History(HistoryCommand),

    #[clap(about = "List extracted episodic facts")]
    Episodes(EpisodesCommand),

    #[clap(about = "List session and lifetime digests")]
    Digests(DigestsCommand),

    #[clap(about = "Show turns per day")]
    Activity(ActivityCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let data_dir = match cli.data_dir.clone() {
        Some(dir) => dir,
        None => Config::load(cli.config.as_deref())?.storage.data_dir,
    };

    if !data_dir.exists() {
        return Err(CliError(format!(
            "No data directory at {}. Start the recollect daemon first or pass --data-dir.",
            data_dir.display()
        )));
    }

    let store: Arc<dyn MemoryStore> = Arc::new(LanceStore::open(&data_dir).await?);

    match &cli.command {
        Command::History(cmd) => cmd.execute(&store, format).await,
        Command::Episodes(cmd) => cmd.execute(&store, format).await,
        Command::Digests(cmd) => cmd.execute(&store, format).await,
        Command::Activity(cmd) => cmd.execute(&store, format).await,
    }
}
