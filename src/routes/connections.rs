// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Memorial connection routes.
//!
//! The DELETE route exists on purpose: it always fails. Clients (and
//! administrators) get an explicit `protected_record` answer instead of a
//! 404 that might invite workarounds.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::point::GeoPoint;
use crate::models::{ConnectionKind, MemorialConnection};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/connections", post(create_connection))
        .route("/api/connections/{id}", get(get_connection))
        .route("/api/connections/{id}", delete(delete_connection))
}

#[derive(Deserialize)]
struct CreateConnectionRequest {
    prayer_id: u64,
    from_lat: f64,
    from_lng: f64,
    to_lat: f64,
    to_lng: f64,
    to_user: u64,
    kind: ConnectionKind,
}

#[derive(Serialize)]
struct ConnectionResponse {
    connection: MemorialConnection,
}

/// Direct connection creation for API-layer collaborators.
async fn create_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateConnectionRequest>,
) -> Result<Json<ConnectionResponse>> {
    let connection = state.ledger.create_connection(
        request.prayer_id,
        GeoPoint::new(request.from_lat, request.from_lng),
        GeoPoint::new(request.to_lat, request.to_lng),
        user.user_id,
        request.to_user,
        request.kind,
    )?;
    Ok(Json(ConnectionResponse { connection }))
}

async fn get_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ConnectionResponse>> {
    let connection = state
        .store
        .get_connection(id)?
        .ok_or_else(|| AppError::NotFound(format!("connection {}", id)))?;
    Ok(Json(ConnectionResponse { connection }))
}

/// Always refused with `protected_record`; memorial lines are eternal.
async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<()>> {
    tracing::info!(connection_id = id, user_id = user.user_id, "Delete attempt");
    state.ledger.delete_connection(id)?;
    Ok(Json(()))
}
