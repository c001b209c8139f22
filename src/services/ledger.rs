// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connection ledger: append-only creation of memorial connections and the
//! explicit follow-up event publication.
//!
//! Side effects of a response (notification fanout) are published as queue
//! jobs from here, not wired up as storage triggers, so they stay visible,
//! testable, and independently retryable.

use crate::db::MapStore;
use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::point::GeoPoint;
use crate::models::queue::JobPayload;
use crate::models::{ConnectionKind, MemorialConnection};
use chrono::Utc;

/// Service owning all writes to the connection ledger.
#[derive(Clone)]
pub struct LedgerService {
    store: MapStore,
}

impl LedgerService {
    pub fn new(store: MapStore) -> Self {
        Self { store }
    }

    /// Persist one immutable memorial connection.
    ///
    /// Fails with `NotFound` if the prayer does not exist. There is no
    /// update path for any field after creation.
    #[allow(clippy::too_many_arguments)]
    pub fn create_connection(
        &self,
        prayer_id: u64,
        from: GeoPoint,
        to: GeoPoint,
        from_user: u64,
        to_user: u64,
        kind: ConnectionKind,
    ) -> Result<MemorialConnection, AppError> {
        from.validate().map_err(AppError::Validation)?;
        to.validate().map_err(AppError::Validation)?;

        let conn = self.store.append_connection(
            prayer_id,
            from,
            to,
            from_user,
            to_user,
            kind,
            Utc::now(),
        )?;
        tracing::info!(
            connection_id = conn.id,
            prayer_id,
            from_user,
            to_user,
            kind = ?kind,
            "Memorial connection created"
        );
        Ok(conn)
    }

    /// Always refused; see the storage-layer guard.
    pub fn delete_connection(&self, connection_id: u64) -> Result<(), AppError> {
        self.store.delete_connection(connection_id)
    }

    /// A user responds to a prayer: append the connection, then enqueue the
    /// notification fanout for the prayer author.
    ///
    /// Fanout is a best-effort side effect. If enqueueing fails the
    /// connection still stands and the error is only logged; the primary
    /// write never rolls back or blocks on notification plumbing.
    pub fn respond_to_prayer(
        &self,
        prayer_id: u64,
        responder_id: u64,
        responder_location: GeoPoint,
        kind: ConnectionKind,
    ) -> Result<MemorialConnection, AppError> {
        let prayer = self
            .store
            .get_prayer(prayer_id)
            .ok_or_else(|| AppError::NotFound(format!("prayer {}", prayer_id)))?;

        let responder_name = self
            .store
            .get_user(responder_id)
            .map(|u| u.display_name)
            .unwrap_or_else(|| "Someone".to_string());

        let conn = self.create_connection(
            prayer_id,
            prayer.origin,
            responder_location,
            prayer.author_id.unwrap_or(0),
            responder_id,
            kind,
        )?;

        let enqueued = self.store.enqueue(
            JobPayload::FanoutEvent {
                prayer_id,
                origin: prayer.origin,
                actor_id: responder_id,
                kind: NotificationKind::PrayerResponse,
                preview: format!("{} prayed for your request", responder_name),
            },
            0,
            Utc::now(),
        );
        if let Err(err) = enqueued {
            tracing::error!(
                prayer_id,
                connection_id = conn.id,
                error = %err,
                "Failed to enqueue response fanout (connection stands)"
            );
        }

        Ok(conn)
    }
}
