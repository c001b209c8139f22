// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification and rate-limit models.

use crate::models::point::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of notification, used for preferences and rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NearbyPrayer,
    PrayerResponse,
    PrayerSupport,
}

/// Typed notification payload. A closed enum rather than an open JSON map,
/// so every consumer can match exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationPayload {
    NearbyPrayer {
        prayer_id: u64,
        origin: GeoPoint,
        distance_km: f64,
        preview: String,
    },
    PrayerResponse {
        prayer_id: u64,
        responder_name: String,
    },
    PrayerSupport {
        prayer_id: u64,
        supporter_count: u32,
    },
}

/// A stored notification record.
///
/// Created exactly once per (recipient, triggering event); mutated only by
/// the recipient marking it read. Unlike memorial connections these are not
/// eternal: a maintenance sweep purges old *read* records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: u64,
    pub recipient: u64,
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-(user, kind) rate-limit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub last_sent_at: DateTime<Utc>,
    pub sent_count: u64,
}
