// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prayer model for storage and API.

use crate::models::point::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visibility status, driven by moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerStatus {
    Active,
    Hidden,
    Removed,
    PendingReview,
}

impl PrayerStatus {
    /// Hidden and removed prayers drop out of default read paths.
    pub fn is_visible(&self) -> bool {
        matches!(self, PrayerStatus::Active | PrayerStatus::PendingReview)
    }
}

/// A stored prayer request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prayer {
    pub id: u64,
    /// Author user id; `None` for anonymous prayers
    pub author_id: Option<u64>,
    /// Free-text request body
    pub body: String,
    /// Geographic origin of the prayer
    pub origin: GeoPoint,
    pub status: PrayerStatus,
    pub created_at: DateTime<Utc>,
    /// Set by the TTL sweep; archived prayers leave discovery but are never deleted
    pub archived_at: Option<DateTime<Utc>>,
}

impl Prayer {
    /// Whether the prayer appears in discovery queries (feeds, nearby lists).
    ///
    /// Note this governs *discovery* only. Memorial connections hanging off
    /// an archived prayer stay on the map; connection visibility consults
    /// `status`, never `archived_at`.
    pub fn is_discoverable(&self) -> bool {
        self.status.is_visible() && self.archived_at.is_none()
    }
}
