mod routes;
mod state;
mod telemetry;
mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use mailwatch::config::apply_env_overrides;
use mailwatch::db::Database;
use mailwatch::{
    load_config, AccountRegistry, DedupGate, Fetchers, Hub, HubOptions, ImapFetcher,
    Pop3Fetcher, PollScheduler, SqliteStore, TlsOptions, WatchConfig,
};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "mailwatch-server", version, about = "Watch mailboxes and stream new-mail notifications")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the database path from the configuration.
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init()?;
    let cli = Cli::parse();

    info!("Starting mailwatch-server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            info!("No config file given, using defaults");
            WatchConfig::default()
        }
    };
    apply_env_overrides(&mut config)?;
    if let Some(path) = cli.database {
        config.database_path = Some(path);
    }

    let db_path = config
        .database_path()
        .context("cannot determine a database path; set databasePath in the config")?;
    let store = Arc::new(SqliteStore::new(Database::open(&db_path)?));

    let hub = Arc::new(Hub::new(
        store.clone(),
        store.clone(),
        HubOptions {
            replay_limit: config.replay_limit,
            buffer: config.subscriber_buffer,
        },
    ));
    let registry = Arc::new(AccountRegistry::new(store.clone(), hub.clone()));
    registry.sync_from_config(&config.accounts).await?;

    let tls = TlsOptions {
        accept_invalid_certs: config.accept_invalid_certs,
    };
    if tls.accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
    }
    let fetchers = Fetchers::new()
        .with_imap(Arc::new(ImapFetcher::new(config.window_size, tls)))
        .with_pop3(Arc::new(Pop3Fetcher::new(config.window_size, tls)));

    let gate = Arc::new(DedupGate::new(store.clone(), hub.clone()));
    let scheduler = PollScheduler::new(store.clone(), fetchers, gate, config.poll_interval());
    let poller = scheduler.start();
    info!(
        "Polling every {}s, inspecting the newest {} messages",
        config.poll_interval_secs, config.window_size
    );

    let state = Arc::new(AppState {
        hub,
        events: store,
        registry,
        scheduler: scheduler.clone(),
        replay_limit: config.replay_limit,
    });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    if let Err(e) = poller.await {
        warn!("Poll scheduler task ended abnormally: {}", e);
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
