// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-(user, notification-kind) cooldown tracking.
//!
//! The rate-limit row is the one hot, contended key in the system. All
//! mutation goes through `DashMap::entry`, which holds the shard lock for
//! the key across the check and the write, so concurrent senders for the
//! same (user, kind) cannot both pass the window check.

use crate::models::notification::{NotificationKind, RateLimitRecord};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RateLimiter {
    records: Arc<DashMap<(u64, NotificationKind), RateLimitRecord>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a send would currently be allowed. Read-only; does not
    /// reserve the window. The cooldown end is inclusive: at exactly
    /// `last_sent + cooldown` the send is still suppressed.
    pub fn can_send(
        &self,
        user: u64,
        kind: NotificationKind,
        cooldown_minutes: i64,
        now: DateTime<Utc>,
    ) -> bool {
        match self.records.get(&(user, kind)) {
            None => true,
            Some(rec) => now - rec.last_sent_at > Duration::minutes(cooldown_minutes),
        }
    }

    /// Unconditionally record a send: sets `last_sent_at`, increments the
    /// counter. Upsert is atomic per key.
    pub fn record_send(&self, user: u64, kind: NotificationKind, now: DateTime<Utc>) {
        self.records
            .entry((user, kind))
            .and_modify(|rec| {
                rec.last_sent_at = now;
                rec.sent_count += 1;
            })
            .or_insert(RateLimitRecord {
                last_sent_at: now,
                sent_count: 1,
            });
    }

    /// Atomic check-and-set: returns `true` and records the send if the
    /// window has elapsed, `false` without touching the record otherwise.
    /// A suppressed send never extends the window.
    pub fn try_acquire(
        &self,
        user: u64,
        kind: NotificationKind,
        cooldown_minutes: i64,
        now: DateTime<Utc>,
    ) -> bool {
        let mut entry = self.records.entry((user, kind)).or_insert(RateLimitRecord {
            // Sentinel far in the past so a fresh key always passes
            last_sent_at: now - Duration::minutes(cooldown_minutes) - Duration::days(1),
            sent_count: 0,
        });
        if now - entry.last_sent_at > Duration::minutes(cooldown_minutes) {
            entry.last_sent_at = now;
            entry.sent_count += 1;
            true
        } else {
            false
        }
    }

    /// Current record for a key, if any send has ever been recorded.
    pub fn get(&self, user: u64, kind: NotificationKind) -> Option<RateLimitRecord> {
        self.records
            .get(&(user, kind))
            .filter(|rec| rec.sent_count > 0)
            .map(|rec| rec.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: i64 = 60;

    #[test]
    fn fresh_key_can_send() {
        let limiter = RateLimiter::new();
        assert!(limiter.can_send(1, NotificationKind::NearbyPrayer, COOLDOWN, Utc::now()));
    }

    #[test]
    fn window_suppresses_until_strictly_after_cooldown() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        limiter.record_send(1, NotificationKind::NearbyPrayer, t0);

        let within = t0 + Duration::minutes(10);
        assert!(!limiter.can_send(1, NotificationKind::NearbyPrayer, COOLDOWN, within));

        // Inclusive cooldown end: exactly T+60 is still suppressed
        let boundary = t0 + Duration::minutes(COOLDOWN);
        assert!(!limiter.can_send(1, NotificationKind::NearbyPrayer, COOLDOWN, boundary));

        let after = t0 + Duration::minutes(COOLDOWN + 1);
        assert!(limiter.can_send(1, NotificationKind::NearbyPrayer, COOLDOWN, after));
    }

    #[test]
    fn kinds_are_limited_independently() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        limiter.record_send(1, NotificationKind::NearbyPrayer, t0);

        assert!(!limiter.can_send(1, NotificationKind::NearbyPrayer, COOLDOWN, t0));
        assert!(limiter.can_send(1, NotificationKind::PrayerResponse, COOLDOWN, t0));
        assert!(limiter.can_send(2, NotificationKind::NearbyPrayer, COOLDOWN, t0));
    }

    #[test]
    fn try_acquire_does_not_extend_window_on_failure() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        assert!(limiter.try_acquire(1, NotificationKind::NearbyPrayer, COOLDOWN, t0));

        // Denied attempt must not move last_sent_at
        let t1 = t0 + Duration::minutes(30);
        assert!(!limiter.try_acquire(1, NotificationKind::NearbyPrayer, COOLDOWN, t1));
        let rec = limiter.get(1, NotificationKind::NearbyPrayer).unwrap();
        assert_eq!(rec.last_sent_at, t0);
        assert_eq!(rec.sent_count, 1);

        // Still eligible at the time it would have been without the denial
        let t2 = t0 + Duration::minutes(COOLDOWN + 1);
        assert!(limiter.try_acquire(1, NotificationKind::NearbyPrayer, COOLDOWN, t2));
    }

    #[test]
    fn concurrent_acquires_admit_exactly_one() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    limiter.try_acquire(7, NotificationKind::NearbyPrayer, COOLDOWN, now)
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 1);
        let rec = limiter.get(7, NotificationKind::NearbyPrayer).unwrap();
        assert_eq!(rec.sent_count, 1);
    }
}
