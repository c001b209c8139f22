// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Worker authentication middleware.
//!
//! `/worker/*` endpoints are called by the queue-drain scheduler and ops
//! tooling, never by end users. They are guarded by a shared secret carried
//! in a dedicated header, compared against the configured token.

use crate::config::FANOUT_QUEUE_NAME;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the shared worker secret.
pub const WORKER_TOKEN_HEADER: &str = "x-worker-token";

/// Header naming the queue on whose behalf the worker acts.
pub const WORKER_QUEUE_HEADER: &str = "x-worker-queue";

/// Require queue header + valid shared token for `/worker/*` routes.
pub async fn require_worker_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let queue_header = request.headers().get(WORKER_QUEUE_HEADER);
    let is_valid_queue = queue_header
        .and_then(|h| h.to_str().ok())
        .map(|name| name == FANOUT_QUEUE_NAME)
        .unwrap_or(false);

    if !is_valid_queue {
        tracing::warn!(
            header = ?queue_header,
            "Blocked worker request with invalid queue header"
        );
        return Err(StatusCode::FORBIDDEN);
    }

    let token_ok = request
        .headers()
        .get(WORKER_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|token| token == state.config.worker_token)
        .unwrap_or(false);

    if !token_ok {
        tracing::warn!("Blocked worker request with missing or invalid token");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
