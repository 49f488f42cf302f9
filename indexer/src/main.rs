use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry_core::{spawn_schedule, EngineConfig, SearchEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "quarry-indexer")]
#[command(about = "Add documents and build the TF-IDF index", long_about = None)]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,
    /// Index directory
    #[arg(long, env = "QUARRY_STORE")]
    store: Option<PathBuf>,
    /// Drop stop words while normalizing
    #[arg(long, default_value_t = false)]
    remove_stop_words: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register one document for the next pass
    Add {
        locator: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Register every parseable file under a directory
    AddDir { path: PathBuf },
    /// Index all pending documents once
    Run,
    /// Index pending documents now and then every interval until interrupted
    Schedule {
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    if cli.remove_stop_words {
        config.remove_stop_words = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let engine = Arc::new(SearchEngine::open(config).context("opening store")?);

    match cli.command {
        Commands::Add { locator, title, description } => {
            if !is_parseable(&engine, &locator) {
                tracing::warn!(locator, "no parser for this extension; it will be skipped at index time");
            }
            let doc = engine.add_document(&locator, title.as_deref(), description.as_deref()).await?;
            engine.store().flush().await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::AddDir { path } => {
            let docs = engine.add_directory(&path).await?;
            engine.store().flush().await?;
            tracing::info!(path = %path.display(), added = docs.len(), "directory registered");
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }
        Commands::Run => {
            let summary = engine.index_pending().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Schedule { interval_secs } => {
            let secs = interval_secs.unwrap_or(engine.config().index_interval_secs).max(1);
            tracing::info!(interval_secs = secs, "scheduling indexing passes");
            let handle = spawn_schedule(engine.clone(), Duration::from_secs(secs));
            tokio::signal::ctrl_c().await?;
            handle.abort();
            engine.store().flush().await?;
            tracing::info!("scheduler stopped");
        }
    }
    Ok(())
}

fn is_parseable(engine: &SearchEngine, locator: &str) -> bool {
    std::path::Path::new(locator)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| engine.can_parse(e))
        .unwrap_or(false)
}
