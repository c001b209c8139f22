// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Worker endpoint guard tests: queue header + shared token.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use prayermap::config::FANOUT_QUEUE_NAME;
use prayermap::middleware::worker_auth::{WORKER_QUEUE_HEADER, WORKER_TOKEN_HEADER};
use tower::ServiceExt;

mod common;

fn drain_request(queue: Option<&str>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/worker/drain");
    if let Some(queue) = queue {
        builder = builder.header(WORKER_QUEUE_HEADER, queue);
    }
    if let Some(token) = token {
        builder = builder.header(WORKER_TOKEN_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_missing_queue_header_is_forbidden() {
    let (app, state) = common::create_test_app();
    let response = app
        .oneshot(drain_request(None, Some(&state.config.worker_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wrong_queue_name_is_forbidden() {
    let (app, state) = common::create_test_app();
    let response = app
        .oneshot(drain_request(
            Some("some-other-queue"),
            Some(&state.config.worker_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_token_is_forbidden() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(drain_request(Some(FANOUT_QUEUE_NAME), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wrong_token_is_forbidden() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(drain_request(Some(FANOUT_QUEUE_NAME), Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_valid_worker_request_drains() {
    let (app, state) = common::create_test_app();
    let response = app
        .oneshot(drain_request(
            Some(FANOUT_QUEUE_NAME),
            Some(&state.config.worker_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["claimed"], 0);
}

#[tokio::test]
async fn test_fanout_endpoint_reports_counts() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state.store, 2, 40.72, -74.01);
    let prayer = state.store.create_prayer(
        Some(1),
        "p".into(),
        prayermap::models::point::GeoPoint::new(40.71, -74.0),
        chrono::Utc::now(),
    );

    let body = serde_json::json!({
        "prayer_id": prayer.id,
        "lat": 40.71,
        "lng": -74.0,
        "actor_id": 1,
        "kind": "nearby_prayer",
        "preview": "a neighbor asked for prayer",
    });
    let request = Request::builder()
        .method("POST")
        .uri("/worker/fanout")
        .header(WORKER_QUEUE_HEADER, FANOUT_QUEUE_NAME)
        .header(WORKER_TOKEN_HEADER, &state.config.worker_token)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["created"], 1);
}
