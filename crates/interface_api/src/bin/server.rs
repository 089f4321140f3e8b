//! Timesheet Ledger - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! LEDGER_DATABASE_URL=postgres://localhost/ledger LEDGER_JWT_SECRET=... cargo run --bin ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_HOST` / `LEDGER_PORT` - bind address (default: 0.0.0.0:8080)
//! * `LEDGER_JWT_SECRET` - JWT signing secret (required in production)
//! * `LEDGER_JWT_EXPIRATION_SECS` - token lifetime (default: 3600)
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string
//! * `LEDGER_DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! * `LEDGER_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `LEDGER_LOG_FORMAT` - `text` or `json` (default: text)
//! * `LEDGER_TIMEZONE` - firm timezone (default: Africa/Johannesburg)
//! * `LEDGER_CURRENCY` - ledger currency (default: ZAR)
//! * `LEDGER_CLOSE_OFF_MARKER` - linked id for Close-off entries (default: C/O)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::{LedgerPorts, LedgerService};
use infra_db::{create_pool, migrate_legacy_dates, run_migrations, DatabaseConfig, PostgresLedgerStore};
use interface_api::config::{ApiConfig, LogFormat};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;
    config.validate()?;

    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.timezone.0,
        "Starting Timesheet Ledger API Server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone()).max_connections(config.database_max_connections),
    )
    .await?;

    run_migrations(&pool).await?;
    let migrated = migrate_legacy_dates(&pool).await?;
    if migrated.skipped > 0 {
        tracing::warn!(skipped = migrated.skipped, "Some legacy dates could not be migrated");
    }

    let store = Arc::new(PostgresLedgerStore::new(pool));
    let service = LedgerService::new(LedgerPorts::from_store(store), config.ledger_config());
    let app = create_router(AppState::new(service, config.clone()));

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Installs the global subscriber; `RUST_LOG` overrides `log_level`
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
