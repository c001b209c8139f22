// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification fanout engine.
//!
//! For one triggering event, computes the eligible recipient set and emits
//! at most one notification per (recipient, event), respecting preferences
//! and the per-(user, kind) cooldown. Candidates are evaluated
//! independently and in no particular order; a failure for one recipient
//! never aborts the rest. Discovery failure aborts the whole event.

use crate::db::{GateOutcome, MapStore};
use crate::error::AppError;
use crate::models::notification::{NotificationKind, NotificationPayload};
use crate::models::point::GeoPoint;
use crate::services::geo;
use chrono::Utc;
use std::sync::Arc;

/// Candidate discovery seam. The engine only needs "users within radius";
/// whether that predicate is satisfied from home location, last-known
/// location, or live GPS belongs to the location-provider collaborator.
pub trait LocationProvider: Send + Sync {
    fn users_within_radius(
        &self,
        origin: &GeoPoint,
        default_radius_km: f64,
    ) -> Result<Vec<u64>, AppError>;
}

impl LocationProvider for MapStore {
    fn users_within_radius(
        &self,
        origin: &GeoPoint,
        default_radius_km: f64,
    ) -> Result<Vec<u64>, AppError> {
        Ok(MapStore::users_within_radius(self, origin, default_radius_km))
    }
}

/// One triggering event, as handed to the engine.
#[derive(Debug, Clone)]
pub struct FanoutRequest {
    pub prayer_id: u64,
    pub origin: GeoPoint,
    pub actor_id: u64,
    pub kind: NotificationKind,
    pub preview: String,
}

/// Per-event accounting, one bucket per terminal state of the candidate
/// state machine.
#[derive(Debug, Clone, Default)]
pub struct FanoutSummary {
    /// Notifications actually created
    pub created: usize,
    /// Actor, muted kind, global opt-out, or no delivery tokens
    pub excluded: usize,
    /// Cooldown window still open
    pub rate_limited: usize,
    /// (recipient, event) pair already notified
    pub duplicates: usize,
    /// Eligible candidates dropped by the batch cap
    pub over_cap: usize,
}

impl FanoutSummary {
    pub fn candidates_seen(&self) -> usize {
        self.created + self.excluded + self.rate_limited + self.duplicates
    }
}

/// The fanout engine.
#[derive(Clone)]
pub struct FanoutService {
    store: MapStore,
    discovery: Arc<dyn LocationProvider>,
    cooldown_minutes: i64,
    default_radius_km: f64,
    batch_cap: usize,
}

impl FanoutService {
    pub fn new(
        store: MapStore,
        discovery: Arc<dyn LocationProvider>,
        cooldown_minutes: i64,
        default_radius_km: f64,
        batch_cap: usize,
    ) -> Self {
        Self {
            store,
            discovery,
            cooldown_minutes,
            default_radius_km,
            batch_cap,
        }
    }

    /// Run the fanout for one event, returning per-bucket counts.
    ///
    /// Errors only when candidate discovery itself fails; that aborts the
    /// event with no partial state. Callers treat fanout as best-effort:
    /// the primary write that triggered it has already committed.
    pub fn fanout_for_event(&self, request: &FanoutRequest) -> Result<FanoutSummary, AppError> {
        request.origin.validate().map_err(AppError::Validation)?;

        let mut candidates = match request.kind {
            NotificationKind::NearbyPrayer => self
                .discovery
                .users_within_radius(&request.origin, self.default_radius_km)?,
            // Response/support events target the prayer author, not a radius
            NotificationKind::PrayerResponse | NotificationKind::PrayerSupport => {
                let prayer = self
                    .store
                    .get_prayer(request.prayer_id)
                    .ok_or_else(|| AppError::NotFound(format!("prayer {}", request.prayer_id)))?;
                prayer.author_id.into_iter().collect()
            }
        };

        let mut summary = FanoutSummary::default();
        if candidates.len() > self.batch_cap {
            summary.over_cap = candidates.len() - self.batch_cap;
            tracing::warn!(
                prayer_id = request.prayer_id,
                eligible = candidates.len(),
                cap = self.batch_cap,
                dropped = summary.over_cap,
                "Fanout batch cap reached; excess recipients skipped"
            );
            candidates.truncate(self.batch_cap);
        }

        let now = Utc::now();
        for candidate in candidates {
            // Step 1: Excluded is terminal, nothing written
            if candidate == request.actor_id {
                summary.excluded += 1;
                continue;
            }
            let user = match self.store.get_user(candidate) {
                Some(user) => user,
                None => {
                    summary.excluded += 1;
                    continue;
                }
            };
            if !user.accepts(request.kind) {
                summary.excluded += 1;
                continue;
            }

            // Steps 2+3: rate-limit gate and record insert are one atomic
            // unit inside the store
            let payload = self.build_payload(request, &user);
            match self.store.create_notification_gated(
                candidate,
                request.kind,
                request.prayer_id,
                payload,
                self.cooldown_minutes,
                now,
            ) {
                GateOutcome::Created(id) => {
                    summary.created += 1;
                    tracing::debug!(
                        notification_id = id,
                        recipient = candidate,
                        prayer_id = request.prayer_id,
                        "Notification created"
                    );
                }
                GateOutcome::RateLimited => summary.rate_limited += 1,
                GateOutcome::Duplicate => summary.duplicates += 1,
            }
        }

        tracing::info!(
            prayer_id = request.prayer_id,
            kind = ?request.kind,
            created = summary.created,
            excluded = summary.excluded,
            rate_limited = summary.rate_limited,
            duplicates = summary.duplicates,
            "Fanout complete"
        );
        Ok(summary)
    }

    fn build_payload(
        &self,
        request: &FanoutRequest,
        recipient: &crate::models::User,
    ) -> NotificationPayload {
        match request.kind {
            NotificationKind::NearbyPrayer => {
                let distance_km = recipient
                    .last_location
                    .as_ref()
                    .map(|loc| geo::haversine_km(&request.origin, loc))
                    .unwrap_or(0.0);
                NotificationPayload::NearbyPrayer {
                    prayer_id: request.prayer_id,
                    origin: request.origin,
                    distance_km,
                    preview: request.preview.clone(),
                }
            }
            NotificationKind::PrayerResponse => NotificationPayload::PrayerResponse {
                prayer_id: request.prayer_id,
                responder_name: request.preview.clone(),
            },
            NotificationKind::PrayerSupport => NotificationPayload::PrayerSupport {
                prayer_id: request.prayer_id,
                supporter_count: self.store.prayer_response_count(request.prayer_id) as u32,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::point::GeoPoint;
    use crate::models::User;
    use std::collections::HashSet;

    fn user_at(id: u64, lat: f64, lng: f64) -> User {
        User {
            id,
            display_name: format!("user{}", id),
            last_location: Some(GeoPoint::new(lat, lng)),
            notification_radius_km: 48.0,
            notifications_enabled: true,
            muted_kinds: HashSet::new(),
            push_token_count: 1,
            moderator: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn engine(store: &MapStore) -> FanoutService {
        FanoutService::new(store.clone(), Arc::new(store.clone()), 60, 48.0, 100)
    }

    fn nearby_request(prayer_id: u64, actor: u64) -> FanoutRequest {
        FanoutRequest {
            prayer_id,
            origin: GeoPoint::new(40.71, -74.0),
            actor_id: actor,
            kind: NotificationKind::NearbyPrayer,
            preview: "A neighbor asked for prayer".to_string(),
        }
    }

    #[test]
    fn actor_and_opted_out_users_are_excluded() {
        let store = MapStore::new();
        store.upsert_user(user_at(1, 40.71, -74.0)); // actor
        store.upsert_user(user_at(2, 40.72, -74.01)); // eligible
        let mut muted = user_at(3, 40.73, -74.02);
        muted.notifications_enabled = false;
        store.upsert_user(muted);
        let mut tokenless = user_at(4, 40.74, -74.03);
        tokenless.push_token_count = 0;
        store.upsert_user(tokenless);

        let prayer = store.create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());
        let summary = engine(&store)
            .fanout_for_event(&nearby_request(prayer.id, 1))
            .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.excluded, 3);
        assert_eq!(summary.rate_limited, 0);
    }

    #[test]
    fn out_of_radius_users_are_never_candidates() {
        let store = MapStore::new();
        store.upsert_user(user_at(2, 40.72, -74.01)); // ~1 km away
        store.upsert_user(user_at(3, 34.05, -118.24)); // LA, far out of radius

        let prayer = store.create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());
        let summary = engine(&store)
            .fanout_for_event(&nearby_request(prayer.id, 1))
            .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.candidates_seen(), 1);
    }

    #[test]
    fn repeated_fanout_for_same_event_is_idempotent() {
        let store = MapStore::new();
        store.upsert_user(user_at(2, 40.72, -74.01));
        let prayer = store.create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());
        let engine = engine(&store);
        let request = nearby_request(prayer.id, 1);

        let first = engine.fanout_for_event(&request).unwrap();
        let second = engine.fanout_for_event(&request).unwrap();

        assert_eq!(first.created, 1);
        assert_eq!(second.created, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(store.notifications_for_user(2, 100, None).len(), 1);
    }

    #[test]
    fn batch_cap_limits_recipients_and_counts_dropped() {
        let store = MapStore::new();
        for id in 2..22 {
            store.upsert_user(user_at(id, 40.71 + (id as f64) * 0.001, -74.0));
        }
        let prayer = store.create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());
        let engine = FanoutService::new(store.clone(), Arc::new(store.clone()), 60, 48.0, 5);

        let summary = engine.fanout_for_event(&nearby_request(prayer.id, 1)).unwrap();

        assert_eq!(summary.created, 5);
        assert_eq!(summary.over_cap, 15);
    }

    #[test]
    fn response_event_notifies_the_author_only() {
        let store = MapStore::new();
        store.upsert_user(user_at(1, 40.71, -74.0)); // author
        store.upsert_user(user_at(2, 40.72, -74.01)); // bystander
        let prayer = store.create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());

        let request = FanoutRequest {
            prayer_id: prayer.id,
            origin: prayer.origin,
            actor_id: 2,
            kind: NotificationKind::PrayerResponse,
            preview: "user2".to_string(),
        };
        let summary = engine(&store).fanout_for_event(&request).unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(store.notifications_for_user(1, 10, None).len(), 1);
        assert!(store.notifications_for_user(2, 10, None).is_empty());
    }

    struct FailingProvider;
    impl LocationProvider for FailingProvider {
        fn users_within_radius(&self, _: &GeoPoint, _: f64) -> Result<Vec<u64>, AppError> {
            Err(AppError::TransientStore("location index offline".to_string()))
        }
    }

    #[test]
    fn discovery_failure_aborts_the_event_with_no_partial_state() {
        let store = MapStore::new();
        store.upsert_user(user_at(2, 40.72, -74.01));
        let prayer = store.create_prayer(Some(1), "p".into(), GeoPoint::new(40.71, -74.0), Utc::now());
        let engine = FanoutService::new(store.clone(), Arc::new(FailingProvider), 60, 48.0, 100);

        let err = engine.fanout_for_event(&nearby_request(prayer.id, 1)).unwrap_err();
        assert!(matches!(err, AppError::TransientStore(_)));
        assert!(store.notifications_for_user(2, 10, None).is_empty());
    }
}
