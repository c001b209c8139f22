// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod connection;
pub mod notification;
pub mod point;
pub mod prayer;
pub mod queue;
pub mod stats;
pub mod user;

pub use connection::{
    ClusteredViewport, ConnectionCluster, ConnectionKind, ConnectionView, DensityCell,
    MemorialConnection, VisualStyle,
};
pub use notification::{NotificationKind, NotificationPayload, NotificationRecord, RateLimitRecord};
pub use point::{BoundingBox, GeoPoint, GridCell};
pub use prayer::{Prayer, PrayerStatus};
pub use queue::{DeadLetterItem, FailOutcome, JobError, JobPayload, QueueItem, QueueItemStatus};
pub use stats::MapStats;
pub use user::User;
