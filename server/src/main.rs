//! hwgate entitlement server
//!
//! Grants and checks time-bounded entitlements for hardware ids and tracks
//! which client instances are alive.
//!
//! Usage:
//!   hwgate-server --admin-key <SECRET> --port 5000
//!
//! The ledger lives in the configured store; liveness is in memory only and
//! starts empty on every launch.

use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::Parser;
use hwgate_license::{ActivityRegistry, AuthorizationLedger};
use hwgate_server::{build_router, config::Args, Gateway};
use hwgate_types::{ClockSource, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("hwgate server starting...");
    if args.admin_key.is_empty() {
        bail!("--admin-key must not be empty");
    }

    let store = args.build_store().context("Failed to set up ledger store")?;
    info!("Ledger store: {} (key {})", store.provider_name(), args.ledger_key);

    let clock: Arc<dyn ClockSource> = Arc::new(SystemClock);
    let ledger = Arc::new(AuthorizationLedger::new(
        store,
        Arc::clone(&clock),
        args.ledger_config(),
    ));
    let registry = Arc::new(ActivityRegistry::new(clock, args.inactivity_threshold()));
    let sink = args.build_sink().context("Failed to set up notification sink")?;
    info!("Notifications via {}", sink.name());

    let gateway = Arc::new(Gateway::new(ledger, registry, sink, args.gateway_config()));
    let app = build_router(gateway);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.port))?;

    println!("\n========================================");
    println!("  hwgate Server Running");
    println!("========================================");
    println!("  HTTP Port:  {}", args.port);
    println!("  Store:      {:?}", args.store);
    println!("  Threshold:  {}s", args.inactivity_threshold_secs);
    println!("========================================\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("hwgate server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
