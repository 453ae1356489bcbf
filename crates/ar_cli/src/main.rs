use anyhow::Context;
use ar_sync::{ArticleCoordinator, CoordinatorConfig};
use ar_web::{create_app, AppState};
use clap::Parser;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

fn add_component(total: u64, number: &str, unit: u64) -> std::result::Result<u64, String> {
    number
        .parse::<u64>()
        .ok()
        .and_then(|num| num.checked_mul(unit))
        .and_then(|secs| total.checked_add(secs))
        .ok_or_else(|| "Duration is too large".to_string())
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_value = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = add_component(total_seconds, &current_number, unit)?;
                current_number.clear();
                has_value = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A bare number is seconds
        if !current_number.is_empty() {
            total_seconds = add_component(total_seconds, &current_number, 1)?;
            has_value = true;
        }

        if !has_value {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Article service keeping a record store and a search index in step", long_about = None)]
pub struct Cli {
    /// Record store backend: memory or sqlite
    #[arg(long, default_value = "memory")]
    record_store: String,
    /// Index store backend: memory or elasticsearch
    #[arg(long, default_value = "memory")]
    index_store: String,
    /// Lock store backend: memory or redis
    #[arg(long, default_value = "memory")]
    lock_store: String,
    #[arg(long, env = "DB_PATH")]
    database_path: Option<String>,
    #[arg(long, env = "ES_HOST")]
    es_url: Option<String>,
    #[arg(long, env = "ES_INDEX")]
    es_index: Option<String>,
    /// Full redis url; without it the url is built from REDIS_ADDR, REDIS_PASSWORD and REDIS_DB
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
    /// How long an update may hold an article lock (e.g. 180, 3m, 1m30s)
    #[arg(long, env = "LOCK_LEASE_SECS", default_value = "3m")]
    lock_lease: HumanDuration,
    #[arg(long, env = "SERVER_PORT", default_value_t = 5001)]
    port: u16,
    #[arg(short, long)]
    verbose: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("👋 Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    info!("💾 Connecting stores...");
    let records = ar_storage::create_record_store(&cli.record_store, cli.database_path.as_deref())
        .await
        .with_context(|| format!("failed to open {} record store", cli.record_store))?;
    let index = ar_storage::create_index_store(&cli.index_store, cli.es_url.as_deref(), cli.es_index.as_deref())
        .await
        .with_context(|| format!("failed to open {} index store", cli.index_store))?;
    let locks = ar_storage::create_lock_store(&cli.lock_store, cli.redis_url.as_deref())
        .await
        .with_context(|| format!("failed to open {} lock store", cli.lock_store))?;
    info!(
        "✨ Stores initialized (records: {}, index: {}, locks: {})",
        cli.record_store, cli.index_store, cli.lock_store
    );

    let config = CoordinatorConfig::new().with_lock_lease(cli.lock_lease.0);
    let coordinator = ArticleCoordinator::new(records, index, locks, config);
    let app = create_app(AppState::new(Arc::new(coordinator)));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🚀 Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}
