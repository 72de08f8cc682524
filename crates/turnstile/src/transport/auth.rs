// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::QueueError;
use crate::state::AppState;

/// Check the `Authorization: Bearer` header against the configured admin
/// token. No configured token means the check is disabled (dev mode).
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), QueueError> {
    let Some(expected) = expected else { return Ok(()) };

    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(QueueError::Unauthorized)?;

    // Accumulate the comparison instead of short-circuiting, so a wrong
    // token's timing reveals nothing about how far it matched.
    let expected = expected.as_bytes();
    let presented = presented.as_bytes();
    let mut mismatch = expected.len() ^ presented.len();
    for (e, p) in expected.iter().zip(presented.iter()) {
        mismatch |= usize::from(e ^ p);
    }

    if mismatch == 0 {
        Ok(())
    } else {
        Err(QueueError::Unauthorized)
    }
}

/// Axum middleware that enforces Bearer token authentication on `/admin/*`.
///
/// The public queue routes are exempt: the join handler validates registry
/// tokens itself, and status probes require no token at all.
pub async fn auth_layer(
    state: State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !req.uri().path().starts_with("/admin") {
        return next.run(req).await;
    }

    if let Err(code) = validate_bearer(req.headers(), state.config.admin_token.as_deref()) {
        return code.to_http_response("unauthorized").into_response();
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
