//! livequiz-server entry point.
//!
//! Prepares directories, connects and migrates the database, builds the
//! channel layer, and serves REST and WebSocket endpoints on one listener.

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use livequiz_server::app_state::AppState;
use livequiz_server::channels::ChannelLayer;
use livequiz_server::config::{AppConfig, DatabaseBackend, LogFormat};
use livequiz_server::persistence::{Database, QuizStore};
use livequiz_server::server::{build_app, prepare_directories};
use livequiz_server::service::QuizService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting livequiz-server");

    let dirs = prepare_directories(&config).context("failed to create data directories")?;
    tracing::info!(?dirs, "data directories ready");

    let database_hint = match &config.database {
        DatabaseBackend::Sqlite(url) => format!("cannot open SQLite database {url}"),
        DatabaseBackend::Postgres(_) => {
            "cannot connect to PostgreSQL; create database `livequiz` or set USE_SQLITE=True"
                .to_string()
        }
    };
    let db = Database::connect(
        &config.database,
        config.database_max_connections,
        Duration::from_secs(config.database_connect_timeout_secs),
    )
    .await
    .context(database_hint)?;
    db.migrate().await.context("database migration failed")?;
    tracing::info!(backend = db.backend_name(), "database ready");

    let (channels, listener_task) =
        ChannelLayer::from_backend(&config.channel_backend, config.channel_capacity)
            .await
            .context("failed to build channel layer")?;
    tracing::info!(backend = channels.backend_name(), "channel layer ready");

    let service = QuizService::new(QuizStore::new(db), channels);
    let app = build_app(AppState::new(service), &config);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(task) = listener_task {
        task.abort();
    }
    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
