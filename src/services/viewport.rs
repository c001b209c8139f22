// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Viewport query engine: density-aware retrieval of memorial connections
//! for map clients.
//!
//! The ledger grows without bound (nothing is ever deleted), so the scaling
//! strategy is aggregation, not exclusion: above a density threshold the
//! clustered query returns per-cell aggregates instead of raw lines, and
//! every underlying connection is accounted for in exactly one cell.

use crate::db::MapStore;
use crate::error::AppError;
use crate::models::connection::{
    ClusteredViewport, ConnectionCluster, ConnectionView, DensityCell, MemorialConnection,
    VisualStyle,
};
use crate::models::point::{BoundingBox, GridCell};
use crate::services::geo;
use crate::time_utils::age_days;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Hard cap on individual rows per response, whatever the caller asks for.
const MAX_VIEWPORT_RESULTS: usize = 500;

/// Read-side service over the connection ledger.
#[derive(Clone)]
pub struct ViewportService {
    store: MapStore,
    /// Fraction of each bbox axis added as padding before querying, so
    /// lines do not pop in at the edges while panning
    padding_fraction: f64,
}

impl ViewportService {
    pub fn new(store: MapStore, padding_fraction: f64) -> Self {
        Self {
            store,
            padding_fraction,
        }
    }

    /// Individual connections touching the (expanded) viewport, newest
    /// first. An empty result is a normal answer, never an error.
    pub fn query_viewport(
        &self,
        bbox: &BoundingBox,
        limit: usize,
    ) -> Result<Vec<ConnectionView>, AppError> {
        bbox.validate().map_err(AppError::Validation)?;
        if limit == 0 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }

        let mut rows = self
            .store
            .connections_touching(&bbox.expanded(self.padding_fraction))?;
        sort_newest_first(&mut rows);
        rows.truncate(limit.min(MAX_VIEWPORT_RESULTS));

        let now = Utc::now();
        Ok(rows.iter().map(|c| to_view(c, now)).collect())
    }

    /// Density-adaptive query: raw connections at or below
    /// `max_individual`, one aggregate per non-empty grid cell above it.
    pub fn query_clustered(
        &self,
        bbox: &BoundingBox,
        cluster_cell_size: f64,
        max_individual: usize,
    ) -> Result<ClusteredViewport, AppError> {
        bbox.validate().map_err(AppError::Validation)?;
        if !(cluster_cell_size.is_finite() && cluster_cell_size > 0.0) {
            return Err(AppError::Validation(
                "cluster cell size must be positive".to_string(),
            ));
        }

        let mut rows = self
            .store
            .connections_touching(&bbox.expanded(self.padding_fraction))?;
        let density = rows.len();
        let now = Utc::now();

        if density <= max_individual {
            sort_newest_first(&mut rows);
            return Ok(ClusteredViewport::Individual {
                connections: rows.iter().map(|c| to_view(c, now)).collect(),
            });
        }

        // Snap each origin point to the grid and aggregate per cell.
        let mut cells: HashMap<GridCell, Vec<&MemorialConnection>> = HashMap::new();
        for conn in &rows {
            cells
                .entry(GridCell::snap(&conn.from, cluster_cell_size))
                .or_default()
                .push(conn);
        }

        let mut clusters: Vec<ConnectionCluster> = cells
            .into_iter()
            .map(|(cell, members)| {
                let earliest = members.iter().map(|c| c.created_at).min().expect("non-empty cell");
                let latest = members.iter().map(|c| c.created_at).max().expect("non-empty cell");
                let representative_id = members
                    .iter()
                    .max_by_key(|c| (c.created_at, c.id))
                    .expect("non-empty cell")
                    .id;
                let avg_age_days = members
                    .iter()
                    .map(|c| age_days(c.created_at, now))
                    .sum::<f64>()
                    / members.len() as f64;
                ConnectionCluster {
                    center: cell.center(cluster_cell_size),
                    member_count: members.len(),
                    earliest,
                    latest,
                    avg_age_days,
                    representative_id,
                }
            })
            .collect();
        clusters.sort_by(|a, b| b.member_count.cmp(&a.member_count));

        tracing::debug!(
            density,
            clusters = clusters.len(),
            cell_size = cluster_cell_size,
            "Viewport aggregated"
        );
        Ok(ClusteredViewport::Clustered { clusters })
    }

    /// Connections created strictly after `since` that touch the viewport,
    /// for animating new lines without a full refetch.
    pub fn query_delta_since(
        &self,
        bbox: &BoundingBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<ConnectionView>, AppError> {
        bbox.validate().map_err(AppError::Validation)?;

        let mut rows = self
            .store
            .connections_touching_since(&bbox.expanded(self.padding_fraction), since)?;
        sort_newest_first(&mut rows);
        rows.truncate(MAX_VIEWPORT_RESULTS);

        let now = Utc::now();
        Ok(rows.iter().map(|c| to_view(c, now)).collect())
    }

    /// Heatmap support: per-cell counts over connection origins. Cells with
    /// fewer than two members are omitted.
    pub fn query_density_grid(
        &self,
        bbox: &BoundingBox,
        grid_size: f64,
    ) -> Result<Vec<DensityCell>, AppError> {
        bbox.validate().map_err(AppError::Validation)?;
        if !(grid_size.is_finite() && grid_size > 0.0) {
            return Err(AppError::Validation("grid size must be positive".to_string()));
        }

        let rows = self.store.connections_touching(bbox)?;
        let now = Utc::now();

        let mut cells: HashMap<GridCell, (usize, f64)> = HashMap::new();
        for conn in &rows {
            let entry = cells
                .entry(GridCell::snap(&conn.from, grid_size))
                .or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += age_days(conn.created_at, now);
        }

        let mut out: Vec<DensityCell> = cells
            .into_iter()
            .filter(|(_, (count, _))| *count >= 2)
            .map(|(cell, (count, age_sum))| DensityCell {
                center: cell.center(grid_size),
                count,
                avg_age_days: age_sum / count as f64,
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(out)
    }

    /// Viewport results as a GeoJSON FeatureCollection of LineStrings, for
    /// map renderers that consume GeoJSON directly.
    pub fn to_feature_collection(views: &[ConnectionView]) -> geojson::FeatureCollection {
        let features = views
            .iter()
            .map(|view| {
                let geometry = geojson::Geometry::new(geojson::Value::LineString(vec![
                    vec![view.from.lng, view.from.lat],
                    vec![view.to.lng, view.to.lat],
                ]));
                let mut properties = geojson::JsonObject::new();
                properties.insert("id".to_string(), view.id.into());
                properties.insert(
                    "kind".to_string(),
                    serde_json::to_value(view.kind).expect("kind serializes"),
                );
                properties.insert(
                    "style".to_string(),
                    serde_json::to_value(view.style).expect("style serializes"),
                );
                properties.insert(
                    "connection_strength".to_string(),
                    serde_json::Value::from(view.connection_strength),
                );
                properties.insert(
                    "created_at".to_string(),
                    crate::time_utils::format_utc_rfc3339(view.created_at).into(),
                );
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Total creation order, newest first: `(created_at desc, id desc)`.
fn sort_newest_first(rows: &mut [MemorialConnection]) {
    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

/// Age, strength, and style are computed here at query time so they are
/// always consistent with "now"; nothing recency-derived is persisted.
fn to_view(conn: &MemorialConnection, now: DateTime<Utc>) -> ConnectionView {
    let age = age_days(conn.created_at, now);
    let strength = geo::connection_strength(age);
    ConnectionView {
        id: conn.id,
        prayer_id: conn.prayer_id,
        from: conn.from,
        to: conn.to,
        kind: conn.kind,
        created_at: conn.created_at,
        age_days: age,
        connection_strength: strength,
        style: VisualStyle::derive(conn.kind, strength),
        distance_km: geo::haversine_km(&conn.from, &conn.to),
    }
}
