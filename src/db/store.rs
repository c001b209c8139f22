// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Embedded map store with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles + notification preferences)
//! - Prayers (moderation status, TTL archival)
//! - Memorial connections (append-only ledger, delete-protected)
//! - Notifications (event-deduplicated, rate-limit gated)
//! - Job queue (claim/fail/dead-letter/stale-reset)
//!
//! All operations are synchronous; the store is shared across handlers and
//! workers via a cheap `Clone` (inner `Arc`).

use crate::db::collections;
use crate::error::AppError;
use crate::models::notification::{NotificationKind, NotificationPayload, NotificationRecord};
use crate::models::point::{BoundingBox, GeoPoint};
use crate::models::queue::{
    DeadLetterItem, FailOutcome, JobError, JobPayload, QueueItem, QueueItemStatus,
};
use crate::models::{ConnectionKind, MapStats, MemorialConnection, Prayer, PrayerStatus, User};
use crate::services::geo;
use crate::services::rate_limit::RateLimiter;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Outcome of a gated notification insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Record inserted and rate-limit window recorded, as one unit
    Created(u64),
    /// This (recipient, event) pair was already notified
    Duplicate,
    /// Cooldown window still open; nothing written
    RateLimited,
}

#[derive(Default)]
struct QueueState {
    items: BTreeMap<u64, QueueItem>,
    dead_letters: BTreeMap<u64, DeadLetterItem>,
}

#[derive(Default)]
struct StoreInner {
    users: DashMap<u64, User>,
    prayers: DashMap<u64, Prayer>,
    /// Append-only; ids are assigned monotonically so (created_at, id) is a
    /// total creation order
    connections: RwLock<Vec<MemorialConnection>>,
    notifications: DashMap<u64, NotificationRecord>,
    /// At-most-once index: (recipient, prayer/event id, kind) -> notification id
    notification_index: DashMap<(u64, u64, NotificationKind), u64>,
    rate_limiter: RateLimiter,
    queue: Mutex<QueueState>,
    next_id: AtomicU64,
}

/// Embedded store client.
#[derive(Clone, Default)]
pub struct MapStore {
    inner: Arc<StoreInner>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn queue_guard(&self) -> Result<MutexGuard<'_, QueueState>, AppError> {
        self.inner
            .queue
            .lock()
            .map_err(|_| AppError::TransientStore(format!("{} lock poisoned", collections::JOB_QUEUE)))
    }

    /// The store's rate limiter, shared with the fanout engine.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    // ─── User Operations ─────────────────────────────────────────

    pub fn get_user(&self, user_id: u64) -> Option<User> {
        self.inner.users.get(&user_id).map(|u| u.clone())
    }

    /// Create or update a user.
    pub fn upsert_user(&self, user: User) {
        self.inner.users.insert(user.id, user);
    }

    /// Moderator capability lookup.
    ///
    /// Deliberately a direct read that bypasses the authorization
    /// middleware: permission checks must not route back through the layer
    /// whose decisions depend on them.
    pub fn is_moderator(&self, user_id: u64) -> bool {
        self.inner
            .users
            .get(&user_id)
            .map(|u| u.moderator)
            .unwrap_or(false)
    }

    /// Users whose last known location lies within their own configured
    /// radius of `origin`. Users with no location are undiscoverable.
    pub fn users_within_radius(&self, origin: &GeoPoint, default_radius_km: f64) -> Vec<u64> {
        self.inner
            .users
            .iter()
            .filter(|entry| {
                let user = entry.value();
                let radius = if user.notification_radius_km > 0.0 {
                    user.notification_radius_km
                } else {
                    default_radius_km
                };
                user.last_location
                    .as_ref()
                    .map(|loc| geo::haversine_km(origin, loc) <= radius)
                    .unwrap_or(false)
            })
            .map(|entry| *entry.key())
            .collect()
    }

    // ─── Prayer Operations ───────────────────────────────────────

    pub fn get_prayer(&self, prayer_id: u64) -> Option<Prayer> {
        self.inner.prayers.get(&prayer_id).map(|p| p.clone())
    }

    pub fn create_prayer(
        &self,
        author_id: Option<u64>,
        body: String,
        origin: GeoPoint,
        created_at: DateTime<Utc>,
    ) -> Prayer {
        let prayer = Prayer {
            id: self.next_id(),
            author_id,
            body,
            origin,
            status: PrayerStatus::Active,
            created_at,
            archived_at: None,
        };
        self.inner.prayers.insert(prayer.id, prayer.clone());
        prayer
    }

    /// Moderation status transition.
    pub fn set_prayer_status(&self, prayer_id: u64, status: PrayerStatus) -> Result<(), AppError> {
        match self.inner.prayers.get_mut(&prayer_id) {
            Some(mut prayer) => {
                prayer.status = status;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("prayer {}", prayer_id))),
        }
    }

    /// Soft-archive prayers older than the TTL. Archival removes a prayer
    /// from discovery; it deletes nothing and does not touch connections.
    pub fn archive_expired_prayers(&self, ttl_days: i64, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(ttl_days);
        let mut archived = 0;
        for mut entry in self.inner.prayers.iter_mut() {
            if entry.archived_at.is_none() && entry.created_at < cutoff {
                entry.archived_at = Some(now);
                archived += 1;
            }
        }
        archived
    }

    // ─── Connection Ledger ───────────────────────────────────────

    /// The one visibility rule for memorial connections: a connection is
    /// hidden exactly when its parent prayer has been hidden or removed by
    /// moderation. Every read path composes with this predicate; nothing
    /// here consults any age or expiry value, and the schema carries none.
    fn connection_visible(&self, conn: &MemorialConnection) -> bool {
        self.inner
            .prayers
            .get(&conn.prayer_id)
            .map(|p| p.status.is_visible())
            .unwrap_or(false)
    }

    /// Append one immutable connection row. Fails if the prayer is missing.
    #[allow(clippy::too_many_arguments)]
    pub fn append_connection(
        &self,
        prayer_id: u64,
        from: GeoPoint,
        to: GeoPoint,
        from_user: u64,
        to_user: u64,
        kind: ConnectionKind,
        created_at: DateTime<Utc>,
    ) -> Result<MemorialConnection, AppError> {
        if !self.inner.prayers.contains_key(&prayer_id) {
            return Err(AppError::NotFound(format!("prayer {}", prayer_id)));
        }
        let conn = MemorialConnection {
            id: self.next_id(),
            prayer_id,
            from,
            to,
            from_user,
            to_user,
            kind,
            created_at,
        };
        self.write_connections()?.push(conn.clone());
        tracing::debug!(
            connection_id = conn.id,
            prayer_id,
            collection = collections::CONNECTIONS,
            "Connection appended"
        );
        Ok(conn)
    }

    /// Memorial lines are eternal and cannot be deleted. The refusal lives
    /// here, at the storage layer, so no caller (administrative tooling
    /// included) can remove a row.
    pub fn delete_connection(&self, connection_id: u64) -> Result<(), AppError> {
        tracing::warn!(connection_id, "Rejected attempt to delete a memorial connection");
        Err(AppError::ProtectedRecord(
            "memorial lines are eternal and cannot be deleted".to_string(),
        ))
    }

    pub fn get_connection(&self, connection_id: u64) -> Result<Option<MemorialConnection>, AppError> {
        Ok(self
            .read_connections()?
            .iter()
            .find(|c| c.id == connection_id)
            .cloned())
    }

    /// All visible connections whose endpoints or segment touch the bbox,
    /// in append order. Callers sort and truncate.
    pub fn connections_touching(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Vec<MemorialConnection>, AppError> {
        Ok(self
            .read_connections()?
            .iter()
            .filter(|c| self.connection_visible(c) && geo::connection_touches(c, bbox))
            .cloned()
            .collect())
    }

    /// Visible connections touching the bbox created strictly after `since`.
    pub fn connections_touching_since(
        &self,
        bbox: &BoundingBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<MemorialConnection>, AppError> {
        Ok(self
            .read_connections()?
            .iter()
            .filter(|c| {
                c.created_at > since && self.connection_visible(c) && geo::connection_touches(c, bbox)
            })
            .cloned()
            .collect())
    }

    /// Number of connections recorded for a prayer (any kind, any status).
    pub fn prayer_response_count(&self, prayer_id: u64) -> usize {
        self.read_connections()
            .map(|conns| conns.iter().filter(|c| c.prayer_id == prayer_id).count())
            .unwrap_or(0)
    }

    fn read_connections(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, Vec<MemorialConnection>>, AppError> {
        self.inner
            .connections
            .read()
            .map_err(|_| AppError::TransientStore(format!("{} lock poisoned", collections::CONNECTIONS)))
    }

    fn write_connections(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, Vec<MemorialConnection>>, AppError> {
        self.inner
            .connections
            .write()
            .map_err(|_| AppError::TransientStore(format!("{} lock poisoned", collections::CONNECTIONS)))
    }

    // ─── Map Stats ───────────────────────────────────────────────

    /// Aggregate counts over the full historical ledger.
    pub fn map_stats(&self) -> Result<MapStats, AppError> {
        let mut stats = MapStats {
            total_prayers: self.inner.prayers.len() as u64,
            ..MapStats::default()
        };
        for conn in self.read_connections()?.iter() {
            stats.record(conn, geo::haversine_km(&conn.from, &conn.to));
        }
        Ok(stats)
    }

    // ─── Notification Operations ─────────────────────────────────

    /// Gated notification insert: record + rate-limit window as one unit.
    ///
    /// Holds the (recipient, event, kind) dedup entry for the duration, so
    /// concurrent fanouts of the same event serialize per recipient. The
    /// rate-limit check-and-set and the record insert happen together or
    /// not at all:
    /// - duplicate event: nothing written, window untouched
    /// - rate limited: nothing written, window untouched
    /// - eligible: record inserted and window recorded
    pub fn create_notification_gated(
        &self,
        recipient: u64,
        kind: NotificationKind,
        event_id: u64,
        payload: NotificationPayload,
        cooldown_minutes: i64,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        match self.inner.notification_index.entry((recipient, event_id, kind)) {
            dashmap::mapref::entry::Entry::Occupied(_) => GateOutcome::Duplicate,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                if !self
                    .inner
                    .rate_limiter
                    .try_acquire(recipient, kind, cooldown_minutes, now)
                {
                    return GateOutcome::RateLimited;
                }
                let record = NotificationRecord {
                    id: self.next_id(),
                    recipient,
                    kind,
                    payload,
                    read: false,
                    read_at: None,
                    created_at: now,
                };
                let id = record.id;
                self.inner.notifications.insert(id, record);
                slot.insert(id);
                GateOutcome::Created(id)
            }
        }
    }

    /// Notifications for a user, newest first. `before_id` is the opaque
    /// pagination cursor (ids are monotonic).
    pub fn notifications_for_user(
        &self,
        user_id: u64,
        limit: usize,
        before_id: Option<u64>,
    ) -> Vec<NotificationRecord> {
        let mut records: Vec<NotificationRecord> = self
            .inner
            .notifications
            .iter()
            .filter(|entry| {
                entry.recipient == user_id && before_id.map(|b| entry.id < b).unwrap_or(true)
            })
            .map(|entry| entry.clone())
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        records
    }

    /// Mark a notification read. Only the recipient may do this.
    pub fn mark_notification_read(
        &self,
        notification_id: u64,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        match self.inner.notifications.get_mut(&notification_id) {
            Some(mut record) if record.recipient == user_id => {
                if !record.read {
                    record.read = true;
                    record.read_at = Some(now);
                }
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "notification {}",
                notification_id
            ))),
        }
    }

    /// Purge *read* notifications older than the retention window. Unread
    /// records are never purged. (Notifications, unlike connections, are
    /// not eternal.)
    pub fn purge_read_notifications(&self, retention_days: i64, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(retention_days);
        let doomed: Vec<u64> = self
            .inner
            .notifications
            .iter()
            .filter(|entry| entry.read && entry.created_at < cutoff)
            .map(|entry| entry.id)
            .collect();
        for id in &doomed {
            self.inner.notifications.remove(id);
        }
        doomed.len()
    }

    // ─── Job Queue Operations ────────────────────────────────────

    pub fn enqueue(
        &self,
        payload: JobPayload,
        priority: i32,
        now: DateTime<Utc>,
    ) -> Result<QueueItem, AppError> {
        let item = QueueItem {
            id: self.next_id(),
            payload,
            status: QueueItemStatus::Pending,
            priority,
            retry_count: 0,
            error_history: Vec::new(),
            created_at: now,
            processing_started_at: None,
        };
        self.queue_guard()?.items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Atomically claim the next pending item, `(priority desc, created_at
    /// asc)` order. The queue mutex guarantees no two claimers receive the
    /// same item.
    pub fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<QueueItem>, AppError> {
        Ok(self.claim_batch(1, now)?.into_iter().next())
    }

    /// Claim up to `n` pending items in one critical section.
    pub fn claim_batch(&self, n: usize, now: DateTime<Utc>) -> Result<Vec<QueueItem>, AppError> {
        let mut queue = self.queue_guard()?;
        let mut candidates: Vec<u64> = queue
            .items
            .values()
            .filter(|item| item.status == QueueItemStatus::Pending)
            .map(|item| item.id)
            .collect();
        // BTreeMap iteration is id-ascending; re-sort by claim order
        candidates.sort_by(|a, b| {
            let ia = &queue.items[a];
            let ib = &queue.items[b];
            ib.priority
                .cmp(&ia.priority)
                .then(ia.created_at.cmp(&ib.created_at))
                .then(ia.id.cmp(&ib.id))
        });
        candidates.truncate(n);

        let mut claimed = Vec::with_capacity(candidates.len());
        for id in candidates {
            let item = queue.items.get_mut(&id).expect("candidate id just scanned");
            item.status = QueueItemStatus::Processing;
            item.processing_started_at = Some(now);
            claimed.push(item.clone());
        }
        Ok(claimed)
    }

    /// Mark a claimed item done. Idempotent: completing an item that was
    /// stale-reset and reclaimed (or no longer exists) is a no-op, so a
    /// worker finishing after losing ownership cannot corrupt state.
    pub fn complete(&self, item_id: u64) -> Result<bool, AppError> {
        let mut queue = self.queue_guard()?;
        match queue.items.get_mut(&item_id) {
            Some(item) if item.status == QueueItemStatus::Processing => {
                item.status = QueueItemStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Record a processing failure. Moves the item to the dead-letter store
    /// (copy + delete, one critical section) once retries are exhausted;
    /// otherwise returns it to `pending` for another attempt.
    pub fn fail(
        &self,
        item_id: u64,
        error: &str,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<FailOutcome, AppError> {
        let mut queue = self.queue_guard()?;
        let item = queue
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("queue item {}", item_id)))?;

        item.error_history.push(JobError {
            at: now,
            message: error.to_string(),
        });

        if item.retry_count + 1 >= max_retries {
            let item = queue.items.remove(&item_id).expect("checked above");
            let retries = item.retry_count + 1;
            let dead = DeadLetterItem {
                id: item.id,
                original_item_id: item.id,
                payload: item.payload,
                error_history: item.error_history,
                dead_lettered_at: now,
                requeue_count: 0,
            };
            queue.dead_letters.insert(dead.id, dead);
            tracing::warn!(
                item_id,
                retries,
                "Queue item moved to dead-letter store"
            );
            Ok(FailOutcome::DeadLettered)
        } else {
            item.retry_count += 1;
            item.status = QueueItemStatus::Pending;
            item.processing_started_at = None;
            Ok(FailOutcome::Retrying)
        }
    }

    /// Force items stuck in `processing` back to `pending`. Recovers from
    /// crashed workers; the original worker may still finish and call
    /// `complete`, which is then a no-op.
    pub fn reset_stale(&self, timeout_minutes: i64, now: DateTime<Utc>) -> Result<usize, AppError> {
        let cutoff = now - Duration::minutes(timeout_minutes);
        let mut queue = self.queue_guard()?;
        let mut reset = 0;
        for item in queue.items.values_mut() {
            if item.status == QueueItemStatus::Processing
                && item.processing_started_at.map(|t| t < cutoff).unwrap_or(false)
            {
                item.status = QueueItemStatus::Pending;
                item.processing_started_at = None;
                item.error_history.push(JobError {
                    at: now,
                    message: "stale processing claim reset".to_string(),
                });
                reset += 1;
            }
        }
        Ok(reset)
    }

    /// Re-insert a dead-lettered payload as a fresh pending item.
    /// Retry count resets to zero; the prior error history rides along for
    /// audit. The dead-letter entry itself stays, with its requeue counter
    /// bumped.
    pub fn retry_from_dead_letter(
        &self,
        dead_letter_id: u64,
        now: DateTime<Utc>,
    ) -> Result<QueueItem, AppError> {
        let fresh_id = self.next_id();
        let mut queue = self.queue_guard()?;
        let dead = queue
            .dead_letters
            .get_mut(&dead_letter_id)
            .ok_or_else(|| AppError::NotFound(format!("dead letter {}", dead_letter_id)))?;
        dead.requeue_count += 1;

        let item = QueueItem {
            id: fresh_id,
            payload: dead.payload.clone(),
            status: QueueItemStatus::Pending,
            priority: 0,
            retry_count: 0,
            error_history: dead.error_history.clone(),
            created_at: now,
            processing_started_at: None,
        };
        queue.items.insert(item.id, item.clone());
        Ok(item)
    }

    pub fn dead_letters(&self) -> Result<Vec<DeadLetterItem>, AppError> {
        Ok(self.queue_guard()?.dead_letters.values().cloned().collect())
    }

    pub fn pending_count(&self) -> Result<usize, AppError> {
        Ok(self
            .queue_guard()?
            .items
            .values()
            .filter(|item| item.status == QueueItemStatus::Pending)
            .count())
    }
}
