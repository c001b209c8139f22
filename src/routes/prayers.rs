// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prayer routes: creation, reading, responding, and the moderation status
//! transition.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::notification::NotificationKind;
use crate::models::point::GeoPoint;
use crate::models::{ConnectionKind, Prayer, PrayerStatus};
use crate::services::FanoutRequest;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Authenticated prayer routes. The moderation route gets its own guard in
/// routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/prayers", post(create_prayer))
        .route("/api/prayers/{id}", get(get_prayer))
        .route("/api/prayers/{id}/respond", post(respond_to_prayer))
}

pub fn moderation_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/prayers/{id}/status", patch(set_prayer_status))
}

// ─── Creation ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreatePrayerRequest {
    #[validate(length(min = 1, max = 2000))]
    body: String,
    lat: f64,
    lng: f64,
    /// Omit the author from the stored prayer
    #[serde(default)]
    anonymous: bool,
}

#[derive(Serialize)]
struct PrayerResponse {
    prayer: Prayer,
}

/// Create a prayer and fan out nearby-prayer notifications.
///
/// Fanout is published as a queue job after the write commits; a fanout
/// problem can never fail this request.
async fn create_prayer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePrayerRequest>,
) -> Result<Json<PrayerResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let origin = GeoPoint::new(request.lat, request.lng);
    origin.validate().map_err(AppError::Validation)?;

    let author = (!request.anonymous).then_some(user.user_id);
    let prayer = state
        .store
        .create_prayer(author, request.body, origin, chrono::Utc::now());
    tracing::info!(prayer_id = prayer.id, anonymous = request.anonymous, "Prayer created");

    let preview: String = prayer.body.chars().take(80).collect();
    if let Err(err) = state.queue.enqueue_fanout(
        FanoutRequest {
            prayer_id: prayer.id,
            origin,
            actor_id: user.user_id,
            kind: NotificationKind::NearbyPrayer,
            preview,
        },
        0,
    ) {
        tracing::error!(prayer_id = prayer.id, error = %err, "Failed to enqueue nearby fanout");
    }

    Ok(Json(PrayerResponse { prayer }))
}

// ─── Reading ─────────────────────────────────────────────────

/// Fetch a single prayer. Hidden/removed prayers 404 for regular users.
async fn get_prayer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<PrayerResponse>> {
    let prayer = state
        .store
        .get_prayer(id)
        .filter(|p| p.status.is_visible())
        .ok_or_else(|| AppError::NotFound(format!("prayer {}", id)))?;
    Ok(Json(PrayerResponse { prayer }))
}

// ─── Responding ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RespondRequest {
    lat: f64,
    lng: f64,
    /// prayer_response | ongoing_prayer | answered_prayer
    kind: ConnectionKind,
}

#[derive(Serialize)]
struct RespondResponse {
    connection_id: u64,
}

/// Respond to a prayer: appends the memorial connection and publishes the
/// response-notification job.
async fn respond_to_prayer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<RespondResponse>> {
    let location = GeoPoint::new(request.lat, request.lng);
    location.validate().map_err(AppError::Validation)?;

    let conn = state
        .ledger
        .respond_to_prayer(id, user.user_id, location, request.kind)?;
    Ok(Json(RespondResponse {
        connection_id: conn.id,
    }))
}

// ─── Moderation ──────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusRequest {
    status: PrayerStatus,
}

#[derive(Serialize)]
struct StatusResponse {
    prayer_id: u64,
    status: PrayerStatus,
}

/// Moderator-only status transition. Hiding or removing a prayer filters
/// its connections from default rendering; nothing is deleted.
async fn set_prayer_status(
    State(state): State<Arc<AppState>>,
    Extension(moderator): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<StatusResponse>> {
    state.store.set_prayer_status(id, request.status)?;
    tracing::info!(
        prayer_id = id,
        moderator_id = moderator.user_id,
        status = ?request.status,
        "Prayer status changed"
    );
    Ok(Json(StatusResponse {
        prayer_id: id,
        status: request.status,
    }))
}
