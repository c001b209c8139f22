// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Job queue service: claims work from the retry queue, executes it, and
//! routes failures through retry or dead-letter handling.

use crate::db::MapStore;
use crate::error::AppError;
use crate::models::queue::{FailOutcome, JobPayload, QueueItem};
use crate::services::fanout::{FanoutRequest, FanoutService};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MAX_CONCURRENT_JOBS: usize = 8;

/// Result of one drain pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DrainSummary {
    pub claimed: usize,
    pub completed: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

/// Result of one maintenance sweep.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MaintenanceSummary {
    pub stale_claims_reset: usize,
    pub prayers_archived: usize,
    pub read_notifications_purged: usize,
}

/// Worker-side service over the retry queue.
#[derive(Clone)]
pub struct QueueService {
    store: MapStore,
    fanout: FanoutService,
    max_retries: u32,
    stale_timeout_minutes: i64,
    archive_ttl_days: i64,
    read_retention_days: i64,
}

impl QueueService {
    pub fn new(
        store: MapStore,
        fanout: FanoutService,
        max_retries: u32,
        stale_timeout_minutes: i64,
        archive_ttl_days: i64,
        read_retention_days: i64,
    ) -> Self {
        Self {
            store,
            fanout,
            max_retries,
            stale_timeout_minutes,
            archive_ttl_days,
            read_retention_days,
        }
    }

    /// Enqueue a fanout job for later execution.
    pub fn enqueue_fanout(&self, request: FanoutRequest, priority: i32) -> Result<QueueItem, AppError> {
        self.store.enqueue(
            JobPayload::FanoutEvent {
                prayer_id: request.prayer_id,
                origin: request.origin,
                actor_id: request.actor_id,
                kind: request.kind,
                preview: request.preview,
            },
            priority,
            Utc::now(),
        )
    }

    /// Claim up to `batch` pending items and execute them with bounded
    /// concurrency. Failures are recorded per item; one bad job never stops
    /// the batch.
    pub async fn drain(&self, batch: usize) -> Result<DrainSummary, AppError> {
        let claimed = self.store.claim_batch(batch, Utc::now())?;
        let total = claimed.len();

        let completed = Arc::new(AtomicUsize::new(0));
        let retried = Arc::new(AtomicUsize::new(0));
        let dead_lettered = Arc::new(AtomicUsize::new(0));

        stream::iter(claimed)
            .for_each_concurrent(MAX_CONCURRENT_JOBS, |item| {
                let completed = Arc::clone(&completed);
                let retried = Arc::clone(&retried);
                let dead_lettered = Arc::clone(&dead_lettered);
                async move {
                    match self.run_job(&item) {
                        Ok(()) => {
                            // No-op if the claim was stale-reset meanwhile
                            if self.store.complete(item.id).unwrap_or(false) {
                                completed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(item_id = item.id, error = %err, "Job failed");
                            match self
                                .store
                                .fail(item.id, &err.to_string(), self.max_retries, Utc::now())
                            {
                                Ok(FailOutcome::Retrying) => {
                                    retried.fetch_add(1, Ordering::Relaxed);
                                }
                                Ok(FailOutcome::DeadLettered) => {
                                    dead_lettered.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(fail_err) => {
                                    tracing::error!(
                                        item_id = item.id,
                                        error = %fail_err,
                                        "Could not record job failure"
                                    );
                                }
                            }
                        }
                    }
                }
            })
            .await;

        let summary = DrainSummary {
            claimed: total,
            completed: completed.load(Ordering::Relaxed),
            retried: retried.load(Ordering::Relaxed),
            dead_lettered: dead_lettered.load(Ordering::Relaxed),
        };
        tracing::info!(
            claimed = summary.claimed,
            completed = summary.completed,
            retried = summary.retried,
            dead_lettered = summary.dead_lettered,
            "Queue drain pass finished"
        );
        Ok(summary)
    }

    fn run_job(&self, item: &QueueItem) -> Result<(), AppError> {
        match &item.payload {
            JobPayload::FanoutEvent {
                prayer_id,
                origin,
                actor_id,
                kind,
                preview,
            } => {
                self.fanout.fanout_for_event(&FanoutRequest {
                    prayer_id: *prayer_id,
                    origin: *origin,
                    actor_id: *actor_id,
                    kind: *kind,
                    preview: preview.clone(),
                })?;
                Ok(())
            }
            JobPayload::MaintenanceSweep => {
                self.run_maintenance()?;
                Ok(())
            }
        }
    }

    /// Stale-claim recovery plus the two retention sweeps. Connections are
    /// untouched by design; only prayers archive and *read* notifications
    /// purge.
    pub fn run_maintenance(&self) -> Result<MaintenanceSummary, AppError> {
        let now = Utc::now();
        let summary = MaintenanceSummary {
            stale_claims_reset: self.store.reset_stale(self.stale_timeout_minutes, now)?,
            prayers_archived: self.store.archive_expired_prayers(self.archive_ttl_days, now),
            read_notifications_purged: self
                .store
                .purge_read_notifications(self.read_retention_days, now),
        };
        tracing::info!(
            stale_claims_reset = summary.stale_claims_reset,
            prayers_archived = summary.prayers_archived,
            read_notifications_purged = summary.read_notifications_purged,
            "Maintenance sweep finished"
        );
        Ok(summary)
    }
}
