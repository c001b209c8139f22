//! User model for storage and API.

use crate::models::notification::NotificationKind;
use crate::models::point::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// User profile and notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Display name shown on responses
    pub display_name: String,
    /// Last known location, supplied by the location-provider collaborator.
    /// `None` means the user is undiscoverable for nearby fanout.
    pub last_location: Option<GeoPoint>,
    /// Discovery radius for nearby-prayer notifications (km)
    pub notification_radius_km: f64,
    /// Global push toggle
    pub notifications_enabled: bool,
    /// Notification kinds the user has muted
    #[serde(default)]
    pub muted_kinds: HashSet<NotificationKind>,
    /// Number of active device push tokens (transport owns the tokens)
    pub push_token_count: u32,
    /// Moderator capability flag, read via a direct store lookup
    pub moderator: bool,
    /// When the user first joined (ISO 8601)
    pub created_at: String,
}

impl User {
    /// Whether this user can receive a notification of the given kind at all.
    /// Rate limiting is a separate, later gate.
    pub fn accepts(&self, kind: NotificationKind) -> bool {
        self.notifications_enabled && self.push_token_count > 0 && !self.muted_kinds.contains(&kind)
    }
}
