// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public map query routes.
//!
//! These power the living map itself: raw viewport queries, density-aware
//! clustering, delta polling for live line animation, and the heatmap grid.
//! All of them are read-only and unauthenticated.

use crate::error::{AppError, Result};
use crate::models::connection::{ClusteredViewport, ConnectionView, DensityCell};
use crate::models::point::BoundingBox;
use crate::AppState;
use axum::response::IntoResponse;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/map/viewport", get(get_viewport))
        .route("/api/map/clustered", get(get_clustered))
        .route("/api/map/delta", get(get_delta))
        .route("/api/map/density", get(get_density))
}

// ─── Viewport ────────────────────────────────────────────────

#[derive(Deserialize)]
struct ViewportQuery {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    #[serde(default = "default_limit")]
    limit: usize,
    /// `json` (default) or `geojson`
    format: Option<String>,
}

fn default_limit() -> usize {
    200
}

#[derive(Serialize)]
struct ViewportResponse {
    connections: Vec<ConnectionView>,
    count: usize,
}

/// Individual connections visible in the viewport, newest first.
async fn get_viewport(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewportQuery>,
) -> Result<axum::response::Response> {
    let bbox = BoundingBox::new(params.south, params.west, params.north, params.east);
    let views = state.viewport.query_viewport(&bbox, params.limit)?;

    match params.format.as_deref() {
        Some("geojson") => {
            let fc = crate::services::ViewportService::to_feature_collection(&views);
            Ok(Json(fc).into_response())
        }
        None | Some("json") => Ok(Json(ViewportResponse {
            count: views.len(),
            connections: views,
        })
        .into_response()),
        Some(other) => Err(AppError::Validation(format!("unknown format '{}'", other))),
    }
}

// ─── Clustered ───────────────────────────────────────────────

#[derive(Deserialize)]
struct ClusteredQuery {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    /// Cell size in degrees
    #[serde(default = "default_cell_size")]
    cell_size: f64,
    /// Density above which results aggregate; defaults from config
    max_individual: Option<usize>,
}

fn default_cell_size() -> f64 {
    0.5
}

/// Density-adaptive viewport query.
async fn get_clustered(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClusteredQuery>,
) -> Result<Json<ClusteredViewport>> {
    let bbox = BoundingBox::new(params.south, params.west, params.north, params.east);
    let max_individual = params
        .max_individual
        .unwrap_or(state.config.cluster_max_individual);
    let result = state
        .viewport
        .query_clustered(&bbox, params.cell_size, max_individual)?;
    Ok(Json(result))
}

// ─── Delta ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct DeltaQuery {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    /// RFC3339; only connections created strictly after this are returned
    since: String,
}

#[derive(Serialize)]
struct DeltaResponse {
    connections: Vec<ConnectionView>,
    count: usize,
}

/// New connections since a client-held timestamp, for live line animation.
async fn get_delta(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeltaQuery>,
) -> Result<Json<DeltaResponse>> {
    let since = chrono::DateTime::parse_from_rfc3339(&params.since)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|_| {
            AppError::Validation("Invalid 'since' parameter: must be RFC3339 datetime".to_string())
        })?;

    let bbox = BoundingBox::new(params.south, params.west, params.north, params.east);
    let views = state.viewport.query_delta_since(&bbox, since)?;
    Ok(Json(DeltaResponse {
        count: views.len(),
        connections: views,
    }))
}

// ─── Density ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct DensityQuery {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
    #[serde(default = "default_grid_size")]
    grid_size: f64,
}

fn default_grid_size() -> f64 {
    1.0
}

#[derive(Serialize)]
struct DensityResponse {
    cells: Vec<DensityCell>,
}

/// Heatmap cells (count >= 2) over connection origins.
async fn get_density(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DensityQuery>,
) -> Result<Json<DensityResponse>> {
    let bbox = BoundingBox::new(params.south, params.west, params.north, params.east);
    let cells = state.viewport.query_density_grid(&bbox, params.grid_size)?;
    Ok(Json(DensityResponse { cells }))
}
