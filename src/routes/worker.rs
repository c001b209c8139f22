// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Worker routes: queue drain, maintenance, dead-letter management, and the
//! direct fanout endpoint.
//!
//! These endpoints are called by the scheduler and ops tooling, not by end
//! users. They are guarded by the worker-token middleware in routes/mod.rs.

use crate::error::Result;
use crate::models::point::GeoPoint;
use crate::models::queue::DeadLetterItem;
use crate::models::NotificationKind;
use crate::services::{DrainSummary, FanoutRequest, MaintenanceSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/worker/fanout", post(fanout_for_event))
        .route("/worker/drain", post(drain))
        .route("/worker/reset-stale", post(reset_stale))
        .route("/worker/maintenance", post(run_maintenance))
        .route("/worker/dead-letters", get(list_dead_letters))
        .route("/worker/dead-letters/{id}/retry", post(retry_dead_letter))
}

// ─── Fanout ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct FanoutBody {
    prayer_id: u64,
    lat: f64,
    lng: f64,
    actor_id: u64,
    #[serde(default = "default_kind")]
    kind: NotificationKind,
    #[serde(default)]
    preview: String,
}

fn default_kind() -> NotificationKind {
    NotificationKind::NearbyPrayer
}

#[derive(Serialize)]
struct FanoutResponse {
    created: usize,
    excluded: usize,
    rate_limited: usize,
    duplicates: usize,
}

/// Run fanout synchronously for one event and report what happened.
async fn fanout_for_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FanoutBody>,
) -> Result<Json<FanoutResponse>> {
    let summary = state.fanout.fanout_for_event(&FanoutRequest {
        prayer_id: body.prayer_id,
        origin: GeoPoint::new(body.lat, body.lng),
        actor_id: body.actor_id,
        kind: body.kind,
        preview: body.preview,
    })?;
    Ok(Json(FanoutResponse {
        created: summary.created,
        excluded: summary.excluded,
        rate_limited: summary.rate_limited,
        duplicates: summary.duplicates,
    }))
}

// ─── Queue ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct DrainQuery {
    #[serde(default = "default_batch")]
    batch: usize,
}

fn default_batch() -> usize {
    25
}

/// Claim and execute a batch of pending jobs.
async fn drain(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DrainQuery>,
) -> Result<Json<DrainSummary>> {
    Ok(Json(state.queue.drain(params.batch).await?))
}

#[derive(Serialize)]
struct ResetStaleResponse {
    reset: usize,
}

/// Return stuck `processing` claims to `pending`.
async fn reset_stale(State(state): State<Arc<AppState>>) -> Result<Json<ResetStaleResponse>> {
    let reset = state.store.reset_stale(
        state.config.queue_stale_timeout_minutes,
        chrono::Utc::now(),
    )?;
    Ok(Json(ResetStaleResponse { reset }))
}

/// Run the maintenance sweep now.
async fn run_maintenance(State(state): State<Arc<AppState>>) -> Result<Json<MaintenanceSummary>> {
    Ok(Json(state.queue.run_maintenance()?))
}

// ─── Dead Letters ────────────────────────────────────────────

#[derive(Serialize)]
struct DeadLettersResponse {
    dead_letters: Vec<DeadLetterItem>,
}

async fn list_dead_letters(State(state): State<Arc<AppState>>) -> Result<Json<DeadLettersResponse>> {
    Ok(Json(DeadLettersResponse {
        dead_letters: state.store.dead_letters()?,
    }))
}

#[derive(Serialize)]
struct RetryResponse {
    item_id: u64,
}

/// Re-queue a dead-lettered job with a fresh retry budget.
async fn retry_dead_letter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<RetryResponse>> {
    let item = state.store.retry_from_dead_letter(id, chrono::Utc::now())?;
    tracing::info!(dead_letter_id = id, item_id = item.id, "Dead letter re-queued");
    Ok(Json(RetryResponse { item_id: item.id }))
}
