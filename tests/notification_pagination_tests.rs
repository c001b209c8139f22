// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification listing: cursor pagination, read state, and retention.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use prayermap::models::notification::NotificationKind;
use prayermap::services::FanoutRequest;
use tower::ServiceExt;

mod common;

/// Seed `count` notifications for user 2 by fanning out distinct events
/// with rate limiting effectively disabled.
fn seed_notifications(state: &prayermap::AppState, count: usize) {
    common::seed_user(&state.store, 2, 40.72, -74.01);
    let base = Utc::now();
    for i in 0..count {
        let at = base + Duration::seconds(i as i64 + 1);
        let prayer = state.store.create_prayer(
            Some(1),
            format!("prayer {}", i),
            prayermap::models::point::GeoPoint::new(40.71, -74.0),
            at,
        );
        let outcome = state.store.create_notification_gated(
            2,
            NotificationKind::NearbyPrayer,
            prayer.id,
            prayermap::models::NotificationPayload::NearbyPrayer {
                prayer_id: prayer.id,
                origin: prayer.origin,
                distance_km: 1.0,
                preview: format!("prayer {}", i),
            },
            0, // cooldown off for seeding; timestamps strictly increase
            at,
        );
        assert!(matches!(outcome, prayermap::db::GateOutcome::Created(_)));
    }
}

async fn list_page(
    app: axum::Router,
    token: &str,
    per_page: usize,
    cursor: Option<&str>,
) -> serde_json::Value {
    let uri = match cursor {
        Some(c) => format!("/api/notifications?per_page={}&cursor={}", per_page, c),
        None => format!("/api/notifications?per_page={}", per_page),
    };
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_cursor_pagination_walks_all_pages_without_overlap() {
    let (app, state) = common::create_test_app();
    seed_notifications(&state, 25);
    let token = common::create_test_jwt(2, &state.config.jwt_signing_key);

    let mut seen = std::collections::HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;

    loop {
        let json = list_page(app.clone(), &token, 10, cursor.as_deref()).await;
        let items = json["notifications"].as_array().unwrap();
        for item in items {
            assert!(
                seen.insert(item["id"].as_u64().unwrap()),
                "page overlap at {:?}",
                item["id"]
            );
        }
        pages += 1;
        match json["next_cursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    assert_eq!(seen.len(), 25);
    assert!(pages >= 3);
}

#[tokio::test]
async fn test_bad_cursor_is_rejected() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(2, &state.config.jwt_signing_key);
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/notifications?cursor=!!!not-base64!!!")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_users_only_see_their_own_notifications() {
    let (app, state) = common::create_test_app();
    seed_notifications(&state, 3);
    let stranger = common::create_test_jwt(9, &state.config.jwt_signing_key);

    let json = list_page(app, &stranger, 10, None).await;
    assert!(json["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_read_then_purge_leaves_unread_intact() {
    let (app, state) = common::create_test_app();
    seed_notifications(&state, 2);
    let records = state.store.notifications_for_user(2, 10, None);
    let (first, second) = (records[0].id, records[1].id);

    let token = common::create_test_jwt(2, &state.config.jwt_signing_key);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/notifications/{}/read", first))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Retention sweep far in the future purges only the read record
    let purged = state
        .store
        .purge_read_notifications(30, Utc::now() + Duration::days(31));
    assert_eq!(purged, 1);

    let remaining = state.store.notifications_for_user(2, 10, None);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second);
    assert!(!remaining[0].read);
}

#[tokio::test]
async fn test_mark_read_rejects_foreign_notification() {
    let (app, state) = common::create_test_app();
    seed_notifications(&state, 1);
    let id = state.store.notifications_for_user(2, 10, None)[0].id;

    let stranger = common::create_test_jwt(9, &state.config.jwt_signing_key);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/notifications/{}/read", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", stranger))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fanout_request_shape_roundtrips_through_queue() {
    let (_, state) = common::create_test_app();
    common::seed_user(&state.store, 2, 40.72, -74.01);
    let prayer = state.store.create_prayer(
        Some(1),
        "p".into(),
        prayermap::models::point::GeoPoint::new(40.71, -74.0),
        Utc::now(),
    );

    state
        .queue
        .enqueue_fanout(
            FanoutRequest {
                prayer_id: prayer.id,
                origin: prayer.origin,
                actor_id: 1,
                kind: NotificationKind::NearbyPrayer,
                preview: "p".to_string(),
            },
            0,
        )
        .unwrap();

    let summary = state.queue.drain(10).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(state.store.notifications_for_user(2, 10, None).len(), 1);
}
