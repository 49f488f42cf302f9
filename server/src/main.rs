use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use quarry_core::{spawn_schedule, EngineConfig, SearchEngine};
use quarry_server::{build_app, shutdown_on};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// JSON config file
    #[arg(long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,
    /// Index directory path
    #[arg(long, env = "QUARRY_STORE")]
    store: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Seconds between background indexing passes; overrides the config file
    #[arg(long)]
    index_interval_secs: Option<u64>,
    /// Only index through POST /index/run
    #[arg(long, default_value_t = false)]
    no_schedule: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = EngineConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(store) = args.store {
        config.store_path = store;
    }
    if let Some(secs) = args.index_interval_secs {
        config.index_interval_secs = secs;
    }
    let interval = Duration::from_secs(config.index_interval_secs.max(1));
    let engine = Arc::new(SearchEngine::open(config).context("opening store")?);

    let scheduler = (!args.no_schedule).then(|| spawn_schedule(engine.clone(), interval));
    let app: Router = build_app(engine.clone(), std::env::var("ADMIN_TOKEN").ok());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    engine.store().flush().await?;
    tracing::info!("server stopped");
    Ok(())
}
