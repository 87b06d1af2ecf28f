// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret authentication for `/tasks/*` maintenance routes.

use crate::db::ActivityStore;
use crate::storage::BlobStore;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <TASKS_TOKEN>`.
pub async fn require_tasks_auth<D: ActivityStore, B: BlobStore>(
    State(state): State<Arc<AppState<D, B>>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(presented) = presented else {
        tracing::warn!(path = %request.uri().path(), "Blocked tasks request without token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !token_matches(presented, &state.config.tasks_token) {
        tracing::warn!(path = %request.uri().path(), "Blocked tasks request with invalid token");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison; an empty expected token never matches.
fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret2", "secret"));
        assert!(!token_matches("", ""));
        assert!(!token_matches("secre", "secret"));
    }
}
