// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pure geometry helpers: distance, bbox/segment intersection, grid math,
//! and the recency-derived connection strength.

use crate::models::connection::MemorialConnection;
use crate::models::point::{BoundingBox, GeoPoint};
use geo::{coord, Distance, Haversine, Intersects, Line};

/// Strength decay time constant (days). At ~30 days a line has faded most
/// of the way to the floor.
const STRENGTH_DECAY_DAYS: f64 = 30.0;

/// Minimum rendering strength. Old lines fade but never disappear.
const STRENGTH_FLOOR: f64 = 0.2;

/// Geodesic (haversine) distance between two points in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    Haversine.distance(a.to_geo(), b.to_geo()) / 1000.0
}

/// Whether a connection touches the bbox: either endpoint inside, or the
/// connecting segment crossing it.
pub fn connection_touches(conn: &MemorialConnection, bbox: &BoundingBox) -> bool {
    if bbox.contains(&conn.from) || bbox.contains(&conn.to) {
        return true;
    }
    let segment = Line::new(
        coord! { x: conn.from.lng, y: conn.from.lat },
        coord! { x: conn.to.lng, y: conn.to.lat },
    );
    bbox.to_rect().to_polygon().intersects(&segment)
}

/// Display strength for a connection of the given age.
///
/// 1.0 when fresh, exponentially decaying to a floor. This is a rendering
/// hint only; no read path may use it (or the age behind it) as a filter.
pub fn connection_strength(age_days: f64) -> f64 {
    STRENGTH_FLOOR + (1.0 - STRENGTH_FLOOR) * (-age_days / STRENGTH_DECAY_DAYS).exp()
}
