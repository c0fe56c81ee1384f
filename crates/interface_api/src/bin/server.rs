//! Distributor Ledger - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin ledger-api
//!
//! API_PORT=8080 API_DATABASE__URL=postgres://... API_DATABASE__RUN_MIGRATIONS=true cargo run --bin ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `API_DATABASE__URL` - PostgreSQL connection string
//! * `API_DATABASE__RUN_MIGRATIONS` - Apply migrations at startup (default: false)
//! * `API_LEDGER__VAT_RATE`, `API_LEDGER__DISTRIBUTOR_DISCOUNT`, ... - ledger tuning

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::{FixedIdentity, LedgerService};
use infra_db::{
    create_pool, PostgresCatalogAdapter, PostgresInventoryAdapter, PostgresLedgerAdapter,
    StreamConfig,
};
use interface_api::{config::ApiConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid API_* configuration ({e}), using defaults");
            ApiConfig::default()
        }
    };

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        currency = %config.ledger.currency,
        "starting distributor ledger API"
    );

    let pool = create_pool(config.database.clone())
        .await
        .context("failed to connect to the ledger database")?;

    let ledger = Arc::new(PostgresLedgerAdapter::new(
        pool.clone(),
        StreamConfig::from_ledger_config(&config.ledger),
    ));
    let catalog = Arc::new(PostgresCatalogAdapter::new(pool.clone()));
    let inventory = Arc::new(PostgresInventoryAdapter::new(pool));

    // Requests act as their token subject via `for_identity`
    let service = LedgerService::new(
        ledger,
        catalog,
        inventory,
        Arc::new(FixedIdentity::anonymous()),
        config.ledger.clone(),
    )
    .context("invalid ledger configuration")?;

    let app = create_router(service, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
