// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retry-queue and dead-letter models.

use crate::models::point::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Typed job payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobPayload {
    /// Fan out notifications for a new prayer or response
    FanoutEvent {
        prayer_id: u64,
        origin: GeoPoint,
        actor_id: u64,
        kind: crate::models::notification::NotificationKind,
        preview: String,
    },
    /// Periodic housekeeping: stale-claim reset, prayer archival, read purge
    MaintenanceSweep,
}

/// One recorded processing failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// A unit of async work in the live queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: u64,
    pub payload: JobPayload,
    pub status: QueueItemStatus,
    /// Higher runs first; ties broken by creation order
    pub priority: i32,
    pub retry_count: u32,
    pub error_history: Vec<JobError>,
    pub created_at: DateTime<Utc>,
    /// Stamped on claim; used for stale-claim detection
    pub processing_started_at: Option<DateTime<Utc>>,
}

/// A job removed from the live queue after exhausting retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterItem {
    pub id: u64,
    /// Id the item had in the live queue
    pub original_item_id: u64,
    pub payload: JobPayload,
    /// Full error history carried over for audit
    pub error_history: Vec<JobError>,
    pub dead_lettered_at: DateTime<Utc>,
    /// How many times this entry has been manually re-queued
    pub requeue_count: u32,
}

/// Outcome of `fail()` on a claimed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailOutcome {
    Retrying,
    DeadLettered,
}
