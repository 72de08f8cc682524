// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the queue service.

pub mod admin;
pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the axum `Router` with all queue and admin routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/health", get(http::health))
        // Public queue surface
        .route("/queue/join", post(http::join))
        .route("/queue/status", get(http::status))
        // Privileged queue operations
        .route("/admin/event/start", post(admin::start_event))
        .route("/admin/event/stop", post(admin::stop_event))
        .route("/admin/event/{id}/advance", post(admin::advance_event))
        .route("/admin/event/users", get(admin::event_users))
        .route("/admin/event/enqueue", post(admin::enqueue_user))
        .route("/admin/event/enqueue-batch", post(admin::enqueue_batch))
        .route("/admin/event/entries", get(admin::event_entries))
        // Domain management
        .route("/admin/domains", post(admin::create_domain).get(admin::list_domains))
        .route("/admin/domains/{id}", delete(admin::delete_domain))
        // Event management
        .route("/admin/events", post(admin::create_event).get(admin::list_events))
        .route("/admin/events/{id}", put(admin::update_event).delete(admin::delete_event))
        // Token registry
        .route("/admin/tokens", post(admin::create_token).get(admin::list_tokens))
        .route("/admin/tokens/{id}/revoke", post(admin::revoke_token))
        .route("/admin/tokens/{id}", delete(admin::delete_token))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
