//! Database layer (embedded in-process store).

pub mod store;

pub use store::{GateOutcome, MapStore};

/// Collection names as constants, used in logs and metrics.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRAYERS: &str = "prayers";
    pub const CONNECTIONS: &str = "memorial_connections";
    pub const NOTIFICATIONS: &str = "notifications";
    /// Live retry queue (dead letters live alongside it)
    pub const JOB_QUEUE: &str = "job_queue";
}
