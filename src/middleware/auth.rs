// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Caller identity from JWTs.
//!
//! The query function reports a missing identity as a typed error rather
//! than a bare 401, so this middleware never rejects: it records who the
//! caller is (if anyone) and lets the handler decide.

use crate::db::ActivityStore;
use crate::storage::BlobStore;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie carrying the session JWT for browser callers.
pub const AUTH_COOKIE: &str = "fit_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

/// Request extension set by [`identify_caller`].
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<AuthUser>);

impl Caller {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.user_id.as_str())
    }
}

/// Middleware that attaches the caller's identity, if any, to the request.
pub async fn identify_caller<D: ActivityStore, B: BlobStore>(
    State(state): State<Arc<AppState<D, B>>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let caller = resolve_caller(request.headers(), &jar, &state.config.jwt_signing_key);
    if caller.is_none() {
        tracing::debug!(path = %request.uri().path(), "Anonymous caller");
    }
    request.extensions_mut().insert(Caller(caller));

    next.run(request).await
}

/// Header first, then cookie. Invalid or expired tokens count as anonymous.
pub fn resolve_caller(headers: &HeaderMap, jar: &CookieJar, signing_key: &[u8]) -> Option<AuthUser> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .or_else(|| jar.get(AUTH_COOKIE).map(|c| c.value().to_string()))?;

    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    match decode::<Claims>(&token, &key, &validation) {
        Ok(data) if !data.claims.sub.is_empty() => Some(AuthUser {
            user_id: data.claims.sub,
        }),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected caller token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum_extra::extract::cookie::Cookie;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    fn create_jwt(user_id: &str, signing_key: &[u8]) -> jsonwebtoken::errors::Result<String> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + 60 * 60,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(signing_key),
        )
    }

    #[test]
    fn test_bearer_token_resolves_user() {
        let token = create_jwt("user-1", KEY).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let user = resolve_caller(&headers, &CookieJar::new(), KEY).unwrap();
        assert_eq!(user.user_id, "user-1");
    }

    #[test]
    fn test_cookie_token_resolves_user() {
        let token = create_jwt("user-2", KEY).unwrap();
        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE, token));

        let user = resolve_caller(&HeaderMap::new(), &jar, KEY).unwrap();
        assert_eq!(user.user_id, "user-2");
    }

    #[test]
    fn test_wrong_key_is_anonymous() {
        let token = create_jwt("user-1", b"some_other_key_that_is_long_enough").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        assert!(resolve_caller(&headers, &CookieJar::new(), KEY).is_none());
        assert!(resolve_caller(&HeaderMap::new(), &CookieJar::new(), KEY).is_none());
    }
}
