// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! At-most-once delivery: concurrent fanouts of the same event must not
//! duplicate notifications, and the rate-limit window must be recorded
//! exactly with the insert.

use chrono::Utc;
use prayermap::models::notification::NotificationKind;
use prayermap::models::point::GeoPoint;
use prayermap::services::FanoutRequest;

mod common;

#[tokio::test]
async fn concurrent_fanouts_create_at_most_one_notification_per_recipient() {
    let (_, state) = common::create_test_app();
    for id in 2..12 {
        common::seed_user(&state.store, id, 40.71 + (id as f64) * 0.001, -74.0);
    }
    let prayer =
        state
            .store
            .create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());

    let request = FanoutRequest {
        prayer_id: prayer.id,
        origin: prayer.origin,
        actor_id: 1,
        kind: NotificationKind::NearbyPrayer,
        preview: "a neighbor asked for prayer".to_string(),
    };

    // Same event fanned out from 8 concurrent workers
    let mut handles = vec![];
    for _ in 0..8 {
        let fanout = state.fanout.clone();
        let request = request.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            fanout.fanout_for_event(&request).expect("fanout")
        }));
    }
    let mut total_created = 0;
    for handle in handles {
        total_created += handle.await.expect("join").created;
    }

    assert_eq!(total_created, 10, "each recipient notified exactly once");
    for id in 2..12 {
        assert_eq!(
            state.store.notifications_for_user(id, 100, None).len(),
            1,
            "user {} must have exactly one record",
            id
        );
    }
}

#[tokio::test]
async fn rate_limited_recipient_is_skipped_without_window_extension() {
    let (_, state) = common::create_test_app();
    common::seed_user(&state.store, 2, 40.72, -74.01);
    common::seed_user(&state.store, 3, 40.73, -74.02);

    let first =
        state
            .store
            .create_prayer(Some(1), "first".into(), GeoPoint::new(40.71, -74.0), Utc::now());
    let second =
        state
            .store
            .create_prayer(Some(4), "second".into(), GeoPoint::new(40.71, -74.0), Utc::now());

    // User 2 was just notified for the first prayer
    let summary = state
        .fanout
        .fanout_for_event(&FanoutRequest {
            prayer_id: first.id,
            origin: first.origin,
            actor_id: 1,
            kind: NotificationKind::NearbyPrayer,
            preview: "first".to_string(),
        })
        .unwrap();
    assert_eq!(summary.created, 2);

    // A different prayer minutes later: both are inside the cooldown window
    let summary = state
        .fanout
        .fanout_for_event(&FanoutRequest {
            prayer_id: second.id,
            origin: second.origin,
            actor_id: 4,
            kind: NotificationKind::NearbyPrayer,
            preview: "second".to_string(),
        })
        .unwrap();

    assert_eq!(summary.created, 0);
    assert_eq!(summary.rate_limited, 2);
    assert_eq!(state.store.notifications_for_user(2, 100, None).len(), 1);
    assert_eq!(state.store.notifications_for_user(3, 100, None).len(), 1);
}

#[tokio::test]
async fn fresh_user_is_notified_while_cooled_down_user_is_not() {
    let (_, state) = common::create_test_app();
    common::seed_user(&state.store, 2, 40.72, -74.01);

    let first =
        state
            .store
            .create_prayer(Some(1), "first".into(), GeoPoint::new(40.71, -74.0), Utc::now());
    state
        .fanout
        .fanout_for_event(&FanoutRequest {
            prayer_id: first.id,
            origin: first.origin,
            actor_id: 1,
            kind: NotificationKind::NearbyPrayer,
            preview: "first".to_string(),
        })
        .unwrap();

    // User 3 appears after the first event, so only user 2 is cooled down
    common::seed_user(&state.store, 3, 40.73, -74.02);
    let second =
        state
            .store
            .create_prayer(Some(4), "second".into(), GeoPoint::new(40.71, -74.0), Utc::now());
    let summary = state
        .fanout
        .fanout_for_event(&FanoutRequest {
            prayer_id: second.id,
            origin: second.origin,
            actor_id: 4,
            kind: NotificationKind::NearbyPrayer,
            preview: "second".to_string(),
        })
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.rate_limited, 1);
    assert_eq!(state.store.notifications_for_user(3, 100, None).len(), 1);
    assert_eq!(state.store.notifications_for_user(2, 100, None).len(), 1);
}
