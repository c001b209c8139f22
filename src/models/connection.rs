// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Memorial connection model and map view types.
//!
//! A memorial connection is the core entity of the living map: a directed
//! geodesic link from a prayer's origin to the responder's location,
//! recorded forever. The schema deliberately carries no expiry field of any
//! kind; visibility is derived solely from the parent prayer's moderation
//! status.

use crate::models::point::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a connection at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    PrayerResponse,
    OngoingPrayer,
    AnsweredPrayer,
}

/// Immutable stored connection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorialConnection {
    pub id: u64,
    pub prayer_id: u64,
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub from_user: u64,
    pub to_user: u64,
    pub kind: ConnectionKind,
    pub created_at: DateTime<Utc>,
}

/// Rendering emphasis for a connection line, derived from kind + recency.
/// A closed enum keeps the map renderer exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    /// Bright, animated line for connections a day or so old
    Radiant,
    /// Standard golden line
    Golden,
    /// Soft line for answered prayers
    Luminous,
    /// Faded historical line (display hint only, never a filter)
    Ember,
}

impl VisualStyle {
    pub fn derive(kind: ConnectionKind, strength: f64) -> Self {
        match kind {
            ConnectionKind::AnsweredPrayer => VisualStyle::Luminous,
            _ if strength >= 0.97 => VisualStyle::Radiant,
            _ if strength >= 0.5 => VisualStyle::Golden,
            _ => VisualStyle::Ember,
        }
    }
}

/// A connection as returned to map clients.
///
/// `connection_strength` and `age_days` are computed at query time so they
/// are always consistent with "now"; they are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionView {
    pub id: u64,
    pub prayer_id: u64,
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub kind: ConnectionKind,
    pub created_at: DateTime<Utc>,
    pub age_days: f64,
    /// 1.0 for a fresh connection, decaying toward a floor with age
    pub connection_strength: f64,
    pub style: VisualStyle,
    /// Geodesic length of the line (km)
    pub distance_km: f64,
}

/// One aggregate cell from a clustered viewport query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCluster {
    pub center: GeoPoint,
    pub member_count: usize,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub avg_age_days: f64,
    /// Most recent member, for "tap to expand" affordances
    pub representative_id: u64,
}

/// Result of a clustered query: raw lines under the density threshold,
/// aggregates above it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClusteredViewport {
    Individual { connections: Vec<ConnectionView> },
    Clustered { clusters: Vec<ConnectionCluster> },
}

/// One cell of the density heatmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityCell {
    pub center: GeoPoint,
    pub count: usize,
    pub avg_age_days: f64,
}
