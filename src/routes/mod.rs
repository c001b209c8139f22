// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod connections;
pub mod map;
pub mod notifications;
pub mod prayers;
pub mod worker;

use crate::middleware::auth::{require_auth, require_moderator};
use crate::middleware::worker_auth::require_worker_auth;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required): health + the living map itself
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(map::routes());

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .merge(prayers::routes())
        .merge(connections::routes())
        .merge(notifications::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Moderator routes (capability check on top of auth)
    let moderation_routes = prayers::moderation_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), require_moderator),
    );

    // Worker routes (shared-token guard)
    let worker_routes = worker::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_worker_auth,
    ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(moderation_routes)
        .merge(worker_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
