//! `interview-api` — interview platform API entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from the environment (and `.env`, if any).
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Build the job bus client.
//! 4. Connect the store, assemble the router, bind the listener.
//! 5. Serve until SIGINT/SIGTERM, then drain and exit.
//!
//! Any failure before step 5 exits with status 1 without accepting a
//! connection.

mod auth;
mod config;
mod jobs;
mod lifecycle;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use config::Config;
use jobs::InngestClient;
use lifecycle::Readiness;
use store::MongoConnector;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let _ = dotenvy::dotenv();
    let readiness = Readiness::new();
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        readiness.terminate();
        e
    })?;
    let cfg = Arc::new(cfg);

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        env = cfg.environment.as_str(),
        "interview-api starting"
    );

    // -----------------------------------------------------------------------
    // 3. Job bus
    // -----------------------------------------------------------------------
    let bus = Arc::new(InngestClient::from_config(&cfg.inngest)?);

    // -----------------------------------------------------------------------
    // 4. Store, router, listener
    // -----------------------------------------------------------------------
    let connector = MongoConnector::new(cfg.store_connect_timeout);
    let server = lifecycle::start(cfg.clone(), &connector, bus, readiness).await?;

    // -----------------------------------------------------------------------
    // 5. Serve
    // -----------------------------------------------------------------------
    server.serve(shutdown_signal()).await?;
    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
