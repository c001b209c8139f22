//! Living-map aggregate statistics for the dashboard endpoint.

use crate::models::connection::{ConnectionKind, MemorialConnection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate counts over the whole map.
///
/// Computed on demand from the ledger; the connection log is append-only so
/// every count here is monotonically non-decreasing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapStats {
    /// Total memorial connections ever created
    pub total_connections: u64,
    /// Connection count per classification
    #[serde(default)]
    pub connections_by_kind: HashMap<String, u64>,
    /// Total prayers (all statuses)
    pub total_prayers: u64,
    /// Total geodesic length of all lines (km)
    pub total_distance_km: f64,
}

impl MapStats {
    /// Fold one connection into the aggregate.
    pub fn record(&mut self, connection: &MemorialConnection, distance_km: f64) {
        self.total_connections += 1;
        self.total_distance_km += distance_km;
        *self
            .connections_by_kind
            .entry(kind_key(connection.kind).to_string())
            .or_insert(0) += 1;
    }
}

fn kind_key(kind: ConnectionKind) -> &'static str {
    match kind {
        ConnectionKind::PrayerResponse => "prayer_response",
        ConnectionKind::OngoingPrayer => "ongoing_prayer",
        ConnectionKind::AnsweredPrayer => "answered_prayer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::point::GeoPoint;
    use chrono::Utc;

    #[test]
    fn record_accumulates_by_kind() {
        let mut stats = MapStats::default();
        let conn = MemorialConnection {
            id: 1,
            prayer_id: 1,
            from: GeoPoint::new(0.0, 0.0),
            to: GeoPoint::new(1.0, 1.0),
            from_user: 1,
            to_user: 2,
            kind: ConnectionKind::PrayerResponse,
            created_at: Utc::now(),
        };

        stats.record(&conn, 157.2);
        stats.record(&conn, 100.0);

        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.connections_by_kind["prayer_response"], 2);
        assert!((stats.total_distance_km - 257.2).abs() < 1e-9);
    }
}
