// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use prayermap::config::Config;
use prayermap::db::MapStore;
use prayermap::models::point::GeoPoint;
use prayermap::models::User;
use prayermap::routes::create_router;
use prayermap::AppState;
use std::collections::HashSet;
use std::sync::Arc;

/// Create a test app over a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let store = MapStore::new();
    let state = Arc::new(AppState::new(config, store));
    (create_router(state.clone()), state)
}

/// Mint a session JWT the way the identity collaborator would.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    prayermap::middleware::auth::create_jwt(user_id, signing_key).expect("JWT creation")
}

/// Seed a user with sane notification defaults at a location.
#[allow(dead_code)]
pub fn seed_user(store: &MapStore, id: u64, lat: f64, lng: f64) -> User {
    let user = User {
        id,
        display_name: format!("user{}", id),
        last_location: Some(GeoPoint::new(lat, lng)),
        notification_radius_km: 48.0,
        notifications_enabled: true,
        muted_kinds: HashSet::new(),
        push_token_count: 1,
        moderator: false,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    store.upsert_user(user.clone());
    user
}
