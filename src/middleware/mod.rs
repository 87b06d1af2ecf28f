// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (caller identity, maintenance auth).

pub mod auth;
pub mod tasks_auth;

pub use auth::{identify_caller, Caller};
pub use tasks_auth::require_tasks_auth;
