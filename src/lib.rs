// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Prayermap: backend API for the living map.
//!
//! This crate provides the memorial-connection ledger, the viewport query
//! engine, and the nearby-prayer notification fanout behind the map.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::MapStore;
use services::{FanoutService, LedgerService, QueueService, ViewportService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: MapStore,
    pub ledger: LedgerService,
    pub viewport: ViewportService,
    pub fanout: FanoutService,
    pub queue: QueueService,
}

impl AppState {
    /// Wire up all services over one store.
    pub fn new(config: Config, store: MapStore) -> Self {
        let ledger = LedgerService::new(store.clone());
        let viewport = ViewportService::new(store.clone(), config.viewport_padding_fraction);
        let fanout = FanoutService::new(
            store.clone(),
            Arc::new(store.clone()),
            config.notification_cooldown_minutes,
            config.default_notification_radius_km,
            config.fanout_batch_cap,
        );
        let queue = QueueService::new(
            store.clone(),
            fanout.clone(),
            config.queue_max_retries,
            config.queue_stale_timeout_minutes,
            config.prayer_archive_ttl_days,
            config.read_notification_retention_days,
        );
        Self {
            config,
            store,
            ledger,
            viewport,
            fanout,
            queue,
        }
    }
}
