//! Spread Bot - Telegram server
//!
//! Notifies chat users about cross-exchange spread deals reported by the
//! market-data service.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::AppConfig;
use spread_alerts::{BotService, SessionManager, TelegramTransport};
use spread_core::{ChainFact, Market};
use spread_feeds::SpotClient;
use spread_warehouse::{
    ConnectionSupervisor, ReconciliationEngine, RetryPolicy, SqliteWarehouse, Warehouse,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teloxide::Bot;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Spread Bot CLI
#[derive(Parser, Debug)]
#[command(name = "spread-bot")]
#[command(about = "Telegram notifier for cross-exchange spread deals", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a JSON array of chain facts, promote corroborated chains and
    /// rebuild order-book slots.
    ImportChains {
        /// Path to the chain batch
        file: PathBuf,
    },
}

enum Mode {
    ImportChains(PathBuf),
    Bot(String),
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let level = match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "spread-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Warehouse>> {
    let settings = &config.store;
    let supervisor = ConnectionSupervisor::new(RetryPolicy::from(settings));
    let max_connections = settings.max_connections;

    let store = supervisor
        .connect(
            &settings.primary_url,
            settings.fallback_url.as_deref(),
            |url| async move { SqliteWarehouse::connect(&url, max_connections).await },
        )
        .await
        .context("storage is unavailable")?;

    let store: Arc<dyn Warehouse> = Arc::new(store);
    Ok(store)
}

async fn import_chains(engine: &ReconciliationEngine, file: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let batch: Vec<ChainFact> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed chain batch in {}", file.display()))?;

    engine.ingest_chains(&batch).await?;
    engine.ingest_order_books().await?;

    let chains = engine.curated_chains().await?;
    let books = engine.order_books().await?;
    info!(
        raw = batch.len(),
        curated = chains.len(),
        order_slots = books.len(),
        "Chain import finished"
    );

    for market in Market::all() {
        let symbols = engine.symbols_for(*market).await?;
        if !symbols.is_empty() {
            info!("  {}: {} symbols", market, symbols.len());
        }
    }

    Ok(())
}

async fn run_bot(config: &AppConfig, engine: ReconciliationEngine, token: String) -> anyhow::Result<()> {
    let market_data = &config.market_data;
    let source = SpotClient::discover(
        &market_data.local_endpoint,
        &market_data.remote_endpoint,
        market_data.request_timeout(),
    )
    .await
    .context("failed to build market-data client")?;
    info!("  Market data: {}", source.endpoint());

    let bot = Bot::new(token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let sessions = Arc::new(SessionManager::new(
        engine.clone(),
        Arc::new(source),
        transport.clone(),
        (&config.sessions).into(),
    ));
    // No polling task survives a restart.
    sessions
        .discard_previous_run()
        .await
        .context("failed to clear the previous run")?;
    info!(
        "  Sessions: max {}, poll every {}s",
        config.sessions.max_sessions, config.sessions.poll_interval_secs
    );

    let service = Arc::new(BotService::new(Arc::clone(&sessions), transport));
    info!("Bot is listening for updates");
    service.run(bot).await;

    info!("Shutting down...");
    sessions.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let loaded = AppConfig::load(&args.config)?;
    let config_found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_env();

    let _log_guard = init_logging(&args.log_level, config.log_dir.as_deref())?;

    info!("🚀 Spread Bot starting...");
    if !config_found {
        warn!("Config file {} not found, using defaults", args.config.display());
    }

    let mode = match args.command {
        Some(Commands::ImportChains { file }) => Mode::ImportChains(file),
        None => Mode::Bot(std::env::var("TELEGRAM_APITOKEN").context("TELEGRAM_APITOKEN is not set")?),
    };

    let store = connect_store(&config).await?;
    let engine = ReconciliationEngine::new(Arc::clone(&store));

    let result = match mode {
        Mode::ImportChains(file) => import_chains(&engine, &file).await,
        Mode::Bot(token) => run_bot(&config, engine, token).await,
    };

    store.close().await;
    info!("Stopped");
    result
}
