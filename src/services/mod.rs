// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod fanout;
pub mod geo;
pub mod ledger;
pub mod queue;
pub mod rate_limit;
pub mod viewport;

pub use fanout::{FanoutRequest, FanoutService, FanoutSummary, LocationProvider};
pub use ledger::LedgerService;
pub use queue::{DrainSummary, MaintenanceSummary, QueueService};
pub use rate_limit::RateLimiter;
pub use viewport::ViewportService;
