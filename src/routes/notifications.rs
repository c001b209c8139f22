// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification routes for authenticated users, plus the map stats
//! endpoint.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{MapStats, NotificationRecord};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_PER_PAGE: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(get_notifications))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/stats/map", get(get_map_stats))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct NotificationsQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: usize,
}

fn default_per_page() -> usize {
    50
}

#[derive(Serialize)]
struct NotificationsResponse {
    notifications: Vec<NotificationRecord>,
    next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<u64>> {
    cursor
        .map(|raw| {
            let invalid =
                || AppError::Validation("Invalid 'cursor' parameter".to_string());
            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid())?;
            decoded_str.parse::<u64>().map_err(|_| invalid())
        })
        .transpose()
}

fn encode_cursor(before_id: u64) -> String {
    URL_SAFE_NO_PAD.encode(before_id.to_string())
}

/// The user's notifications, newest first, cursor-paginated.
async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<NotificationsQuery>,
) -> Result<Json<NotificationsResponse>> {
    let limit = params.per_page.clamp(1, MAX_PER_PAGE);
    let before_id = parse_cursor(params.cursor.as_deref())?;

    let notifications = state
        .store
        .notifications_for_user(user.user_id, limit, before_id);
    let next_cursor = (notifications.len() == limit)
        .then(|| notifications.last().map(|n| encode_cursor(n.id)))
        .flatten();

    Ok(Json(NotificationsResponse {
        notifications,
        next_cursor,
    }))
}

// ─── Read State ──────────────────────────────────────────────

#[derive(Serialize)]
struct MarkReadResponse {
    success: bool,
}

/// Mark one of the caller's notifications as read.
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<MarkReadResponse>> {
    state
        .store
        .mark_notification_read(id, user.user_id, chrono::Utc::now())?;
    Ok(Json(MarkReadResponse { success: true }))
}

// ─── Stats ───────────────────────────────────────────────────

/// Aggregate living-map statistics.
async fn get_map_stats(State(state): State<Arc<AppState>>) -> Result<Json<MapStats>> {
    Ok(Json(state.store.map_stats()?))
}
