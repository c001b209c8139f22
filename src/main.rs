// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prayermap API Server
//!
//! Serves the living map: memorial connections, viewport queries, and
//! nearby-prayer notification fanout.

use prayermap::{config::Config, db::MapStore, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the in-process scheduler runs a drain + maintenance pass.
const WORKER_TICK: Duration = Duration::from_secs(30);
const WORKER_BATCH: usize = 25;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Prayermap API");

    // Initialize the embedded store and services
    let store = MapStore::new();
    let state = Arc::new(AppState::new(config.clone(), store));

    // In-process scheduler: drain the job queue and run maintenance
    // periodically. External schedulers can also hit /worker/* directly.
    let worker_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(WORKER_TICK);
        loop {
            tick.tick().await;
            if let Err(err) = worker_state.queue.drain(WORKER_BATCH).await {
                tracing::error!(error = %err, "Queue drain pass failed");
            }
            if let Err(err) = worker_state.queue.run_maintenance() {
                tracing::error!(error = %err, "Maintenance sweep failed");
            }
        }
    });

    // Build router
    let app = prayermap::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prayermap=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
