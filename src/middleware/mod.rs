// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, security, etc.).

pub mod auth;
pub mod security;
pub mod worker_auth;

pub use auth::{require_auth, require_moderator};
pub use worker_auth::require_worker_auth;
