// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and age math.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Age of a timestamp in fractional days relative to `now`.
///
/// Clamped to zero for timestamps in the future (clock skew between
/// writers must not produce negative ages).
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (now - created_at).num_seconds();
    if secs <= 0 {
        return 0.0;
    }
    secs as f64 / 86_400.0
}
