// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Geographic point and bounding-box types shared across the engine.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};

/// A WGS84 point (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject NaN/out-of-range coordinates.
    pub fn validate(&self) -> Result<(), String> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude out of range: {}", self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("longitude out of range: {}", self.lng));
        }
        Ok(())
    }

    pub fn to_geo(&self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }
}

/// A map viewport bounding box (degrees, south < north, west < east).
///
/// Boxes crossing the antimeridian are rejected by `validate` rather than
/// handled; plain min/max comparisons are used everywhere downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for v in [self.south, self.west, self.north, self.east] {
            if !v.is_finite() {
                return Err("bounding box coordinates must be finite".to_string());
            }
        }
        if !(-90.0..=90.0).contains(&self.south) || !(-90.0..=90.0).contains(&self.north) {
            return Err("latitude out of range".to_string());
        }
        if !(-180.0..=180.0).contains(&self.west) || !(-180.0..=180.0).contains(&self.east) {
            return Err("longitude out of range".to_string());
        }
        if self.south >= self.north {
            return Err("south must be less than north".to_string());
        }
        if self.west >= self.east {
            return Err("west must be less than east (antimeridian boxes unsupported)".to_string());
        }
        Ok(())
    }

    /// Expand each axis by `fraction` of its extent, clamped to valid ranges.
    pub fn expanded(&self, fraction: f64) -> Self {
        let lat_pad = (self.north - self.south) * fraction;
        let lng_pad = (self.east - self.west) * fraction;
        Self {
            south: (self.south - lat_pad).max(-90.0),
            west: (self.west - lng_pad).max(-180.0),
            north: (self.north + lat_pad).min(90.0),
            east: (self.east + lng_pad).min(180.0),
        }
    }

    /// Convert to a `geo` rectangle (x = lng, y = lat).
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }
}

/// Discrete grid cell key used for clustering and density maps.
///
/// Cells are indexed by flooring coordinates to multiples of the cell size,
/// so a given (cell_size, point) pair always lands in the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub lat_idx: i32,
    pub lng_idx: i32,
}

impl GridCell {
    pub fn snap(point: &GeoPoint, cell_size: f64) -> Self {
        Self {
            lat_idx: (point.lat / cell_size).floor() as i32,
            lng_idx: (point.lng / cell_size).floor() as i32,
        }
    }

    /// Center coordinate of the cell.
    pub fn center(&self, cell_size: f64) -> GeoPoint {
        GeoPoint {
            lat: (self.lat_idx as f64 + 0.5) * cell_size,
            lng: (self.lng_idx as f64 + 0.5) * cell_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_rejects_antimeridian_crossing() {
        let bbox = BoundingBox::new(10.0, 170.0, 20.0, -170.0);
        assert!(bbox.validate().is_err());
    }

    #[test]
    fn bbox_rejects_inverted_latitudes() {
        let bbox = BoundingBox::new(20.0, -10.0, 10.0, 10.0);
        assert!(bbox.validate().is_err());
    }

    #[test]
    fn expanded_bbox_pads_both_axes() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 20.0);
        let padded = bbox.expanded(0.2);
        assert_eq!(padded.south, -2.0);
        assert_eq!(padded.north, 12.0);
        assert_eq!(padded.west, -4.0);
        assert_eq!(padded.east, 24.0);
    }

    #[test]
    fn expanded_bbox_clamps_at_poles() {
        let bbox = BoundingBox::new(80.0, -10.0, 89.0, 10.0);
        let padded = bbox.expanded(0.5);
        assert_eq!(padded.north, 90.0);
    }

    #[test]
    fn grid_snap_is_stable_for_negative_coords() {
        let cell = GridCell::snap(&GeoPoint::new(-0.1, -0.1), 1.0);
        assert_eq!(cell.lat_idx, -1);
        assert_eq!(cell.lng_idx, -1);
        let center = cell.center(1.0);
        assert_eq!(center.lat, -0.5);
        assert_eq!(center.lng, -0.5);
    }
}
