//! Application configuration loaded from environment variables.
//!
//! Engine tunables (cooldowns, radii, caps) carry defaults that match the
//! product behavior and can be overridden per deployment.

use std::env;

/// Name of the internal job queue, used in worker request guards and logs.
pub const FANOUT_QUEUE_NAME: &str = "prayermap-jobs";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared secret required on `/worker/*` requests
    pub worker_token: String,

    // --- Notification fanout ---
    /// Per-(user, kind) notification cooldown window
    pub notification_cooldown_minutes: i64,
    /// Default discovery radius when a user has not configured one (km)
    pub default_notification_radius_km: f64,
    /// Maximum recipients notified for a single event
    pub fanout_batch_cap: usize,

    // --- Viewport engine ---
    /// Fractional padding applied to each bbox axis before querying
    pub viewport_padding_fraction: f64,
    /// Above this many connections in a bbox, clustered queries aggregate
    pub cluster_max_individual: usize,

    // --- Retry queue ---
    /// Attempts before an item moves to the dead-letter store
    pub queue_max_retries: u32,
    /// Minutes after which a `processing` claim is considered stale
    pub queue_stale_timeout_minutes: i64,

    // --- Maintenance ---
    /// Days after creation at which a prayer is soft-archived
    pub prayer_archive_ttl_days: i64,
    /// Days a *read* notification is retained before purge
    pub read_notification_retention_days: i64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            worker_token: "test_worker_token".to_string(),
            notification_cooldown_minutes: 60,
            default_notification_radius_km: 48.0,
            fanout_batch_cap: 100,
            viewport_padding_fraction: 0.2,
            cluster_max_individual: 50,
            queue_max_retries: 3,
            queue_stale_timeout_minutes: 30,
            prayer_archive_ttl_days: 365,
            read_notification_retention_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            worker_token: env::var("WORKER_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("WORKER_TOKEN"))?,
            notification_cooldown_minutes: parse_env("NOTIFICATION_COOLDOWN_MINUTES", 60)?,
            default_notification_radius_km: parse_env("DEFAULT_NOTIFICATION_RADIUS_KM", 48.0)?,
            fanout_batch_cap: parse_env("FANOUT_BATCH_CAP", 100)?,
            viewport_padding_fraction: parse_env("VIEWPORT_PADDING_FRACTION", 0.2)?,
            cluster_max_individual: parse_env("CLUSTER_MAX_INDIVIDUAL", 50)?,
            queue_max_retries: parse_env("QUEUE_MAX_RETRIES", 3)?,
            queue_stale_timeout_minutes: parse_env("QUEUE_STALE_TIMEOUT_MINUTES", 30)?,
            prayer_archive_ttl_days: parse_env("PRAYER_ARCHIVE_TTL_DAYS", 365)?,
            read_notification_retention_days: parse_env("READ_NOTIFICATION_RETENTION_DAYS", 30)?,
        })
    }
}

/// Parse an optional env var, falling back to a default.
/// A present-but-unparseable value is a hard error rather than a silent default.
fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Unparseable environment variable: {0}")]
    Invalid(&'static str),
}
