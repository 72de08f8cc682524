// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin handlers: privileged queue operations plus domain, event, and token
//! management. All routes here sit behind the bearer middleware.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::engine::Placement;
use crate::error::QueueError;
use crate::meta::{Domain, Event};
use crate::state::AppState;

/// Hard cap on synthetic batch enqueues per request.
const ENQUEUE_BATCH_CAP: u32 = 1000;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdRequest {
    pub event_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub event_id: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub success: bool,
    pub moved: Vec<String>,
    pub active: Vec<String>,
    pub waiting: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub active: Vec<String>,
    pub waiting: Vec<String>,
    /// Seconds left on the batch window, 0 when no window is running.
    pub remaining: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub event_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub success: bool,
    pub state: &'static str,
    pub position: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueBatchRequest {
    pub event_id: String,
    pub count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueBatchResponse {
    pub success: bool,
    pub enqueued: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub event_id: String,
    pub user_id: String,
    pub entered_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub id: String,
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub domain: String,
    pub queue_limit: u32,
    pub interval_sec: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub queue_limit: Option<u32>,
    #[serde(default)]
    pub interval_sec: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
    #[serde(default)]
    pub never_expires: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreatedResponse {
    pub id: String,
    /// The secret, returned exactly once.
    pub token: String,
    pub name: Option<String>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub id: String,
    pub name: Option<String>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub is_active: bool,
    pub is_expired: bool,
    pub last_used_at: Option<i64>,
}

// -- Helpers ------------------------------------------------------------------

async fn load_event(s: &AppState, event_id: &str) -> Result<Event, axum::response::Response> {
    match s.meta.event_by_id(event_id).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err(QueueError::NotFound.to_http_response("event not found").into_response()),
        Err(e) => Err(e.to_http_response("metadata store unavailable").into_response()),
    }
}

fn event_limits_valid(queue_limit: u32, interval_sec: u32) -> bool {
    (1..=1000).contains(&queue_limit) && (1..=3600).contains(&interval_sec)
}

// -- Queue operations ---------------------------------------------------------

/// `POST /admin/event/start`
pub async fn start_event(
    State(s): State<Arc<AppState>>,
    Json(req): Json<EventIdRequest>,
) -> impl IntoResponse {
    let event = match load_event(&s, &req.event_id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.engine.start(&event).await {
        Ok(()) => {
            tracing::info!(event_id = %event.id, "event started");
            Json(SuccessResponse { success: true }).into_response()
        }
        Err(e) => e.to_http_response("failed to start event").into_response(),
    }
}

/// `POST /admin/event/stop`
pub async fn stop_event(
    State(s): State<Arc<AppState>>,
    Json(req): Json<EventIdRequest>,
) -> impl IntoResponse {
    let event = match load_event(&s, &req.event_id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.engine.stop(&event).await {
        Ok(()) => {
            tracing::info!(event_id = %event.id, "event stopped");
            Json(SuccessResponse { success: true }).into_response()
        }
        Err(e) => e.to_http_response("failed to stop event").into_response(),
    }
}

/// `POST /admin/event/{id}/advance` — manual rotation.
pub async fn advance_event(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let event = match load_event(&s, &id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.engine.advance_now(&event).await {
        Ok(rotation) => Json(AdvanceResponse {
            success: true,
            moved: rotation.moved,
            active: rotation.active,
            waiting: rotation.waiting,
        })
        .into_response(),
        Err(e) => e.to_http_response("failed to advance event").into_response(),
    }
}

/// `GET /admin/event/users` — current batch and waiting line.
pub async fn event_users(
    State(s): State<Arc<AppState>>,
    Query(q): Query<EventQuery>,
) -> impl IntoResponse {
    let event = match load_event(&s, &q.event_id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.engine.snapshot(&event.id).await {
        Ok(snap) => Json(UsersResponse {
            active: snap.active,
            waiting: snap.waiting,
            remaining: snap.ttl.max(0),
        })
        .into_response(),
        Err(e) => {
            // Degraded read, same as the public status probe.
            tracing::warn!(event_id = %event.id, err = %e, "user listing degraded");
            Json(UsersResponse { active: Vec::new(), waiting: Vec::new(), remaining: 0 })
                .into_response()
        }
    }
}

/// `POST /admin/event/enqueue` — enqueue a single user.
pub async fn enqueue_user(
    State(s): State<Arc<AppState>>,
    Json(req): Json<EnqueueRequest>,
) -> impl IntoResponse {
    if req.user_id.trim().is_empty() {
        return QueueError::Validation.to_http_response("userId is required").into_response();
    }
    let event = match load_event(&s, &req.event_id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.engine.enqueue(&event, req.user_id.trim()).await {
        Ok(Placement::Active) => {
            Json(EnqueueResponse { success: true, state: "active", position: 0 }).into_response()
        }
        Ok(Placement::Waiting { position }) => {
            Json(EnqueueResponse { success: true, state: "waiting", position }).into_response()
        }
        Err(e) => e.to_http_response("failed to enqueue").into_response(),
    }
}

/// `POST /admin/event/enqueue-batch` — synthetic load helper.
pub async fn enqueue_batch(
    State(s): State<Arc<AppState>>,
    Json(req): Json<EnqueueBatchRequest>,
) -> impl IntoResponse {
    if req.count == 0 || req.count > ENQUEUE_BATCH_CAP {
        return QueueError::Validation
            .to_http_response(format!("count must be in 1..={ENQUEUE_BATCH_CAP}"))
            .into_response();
    }
    let event = match load_event(&s, &req.event_id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.engine.enqueue_batch(&event, req.count).await {
        Ok(users) => {
            Json(EnqueueBatchResponse { success: true, enqueued: users.len() }).into_response()
        }
        Err(e) => e.to_http_response("failed to enqueue batch").into_response(),
    }
}

/// `GET /admin/event/entries` — recent admissions, newest first.
pub async fn event_entries(
    State(s): State<Arc<AppState>>,
    Query(q): Query<EventQuery>,
) -> impl IntoResponse {
    let event = match load_event(&s, &q.event_id).await {
        Ok(event) => event,
        Err(resp) => return resp,
    };
    match s.meta.recent_entries(&event.id).await {
        Ok(entries) => {
            let list: Vec<EntryInfo> = entries
                .into_iter()
                .map(|entry| EntryInfo {
                    event_id: entry.event_id,
                    user_id: entry.user_id,
                    entered_at: entry.entered_at_ms,
                })
                .collect();
            Json(list).into_response()
        }
        Err(e) => e.to_http_response("failed to read entries").into_response(),
    }
}

// -- Domain CRUD --------------------------------------------------------------

/// `POST /admin/domains`
pub async fn create_domain(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CreateDomainRequest>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return QueueError::Validation.to_http_response("name is required").into_response();
    }
    match s.meta.create_domain(name).await {
        Ok(domain) => Json(domain).into_response(),
        Err(e @ QueueError::Conflict) => {
            e.to_http_response("domain name already exists").into_response()
        }
        Err(e) => e.to_http_response("failed to create domain").into_response(),
    }
}

/// `GET /admin/domains`
pub async fn list_domains(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    match s.meta.list_domains().await {
        Ok(domains) => Json::<Vec<Domain>>(domains).into_response(),
        Err(e) => e.to_http_response("failed to list domains").into_response(),
    }
}

/// `DELETE /admin/domains/{id}`
pub async fn delete_domain(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match s.meta.delete_domain(&id).await {
        Ok(true) => Json(RemovedResponse { id, removed: true }).into_response(),
        Ok(false) => QueueError::NotFound.to_http_response("domain not found").into_response(),
        Err(e) => e.to_http_response("failed to delete domain").into_response(),
    }
}

// -- Event CRUD ---------------------------------------------------------------

/// `POST /admin/events`
pub async fn create_event(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return QueueError::Validation.to_http_response("name is required").into_response();
    }
    if !event_limits_valid(req.queue_limit, req.interval_sec) {
        return QueueError::Validation
            .to_http_response("queueLimit must be 1..=1000 and intervalSec 1..=3600")
            .into_response();
    }
    match s.meta.domain_by_name(req.domain.trim()).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return QueueError::NotFound.to_http_response("domain not found").into_response()
        }
        Err(e) => return e.to_http_response("metadata store unavailable").into_response(),
    }
    match s.meta.create_event(name, req.domain.trim(), req.queue_limit, req.interval_sec).await {
        Ok(event) => Json(event).into_response(),
        Err(e @ QueueError::Conflict) => {
            e.to_http_response("event already exists in this domain").into_response()
        }
        Err(e) => e.to_http_response("failed to create event").into_response(),
    }
}

/// `GET /admin/events`
pub async fn list_events(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    match s.meta.list_events().await {
        Ok(events) => Json::<Vec<Event>>(events).into_response(),
        Err(e) => e.to_http_response("failed to list events").into_response(),
    }
}

/// `PUT /admin/events/{id}`
pub async fn update_event(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> impl IntoResponse {
    if let Some(name) = req.name.as_deref() {
        if name.trim().is_empty() {
            return QueueError::Validation.to_http_response("name must be non-empty").into_response();
        }
    }
    if let Some(limit) = req.queue_limit {
        if !(1..=1000).contains(&limit) {
            return QueueError::Validation
                .to_http_response("queueLimit must be 1..=1000")
                .into_response();
        }
    }
    if let Some(interval) = req.interval_sec {
        if !(1..=3600).contains(&interval) {
            return QueueError::Validation
                .to_http_response("intervalSec must be 1..=3600")
                .into_response();
        }
    }
    match s
        .meta
        .update_event(&id, req.name.as_deref().map(str::trim), req.queue_limit, req.interval_sec)
        .await
    {
        Ok(Some(event)) => Json(event).into_response(),
        Ok(None) => QueueError::NotFound.to_http_response("event not found").into_response(),
        Err(e) => e.to_http_response("failed to update event").into_response(),
    }
}

/// `DELETE /admin/events/{id}` — removes the record and clears ephemeral keys.
pub async fn delete_event(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match s.meta.delete_event(&id).await {
        Ok(true) => {
            if let Err(e) = s.engine.clear_event(&id).await {
                tracing::warn!(event_id = %id, err = %e, "failed to clear ephemeral keys");
            }
            Json(RemovedResponse { id, removed: true }).into_response()
        }
        Ok(false) => QueueError::NotFound.to_http_response("event not found").into_response(),
        Err(e) => e.to_http_response("failed to delete event").into_response(),
    }
}

// -- Token registry -----------------------------------------------------------

/// `POST /admin/tokens`
pub async fn create_token(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CreateTokenRequest>,
) -> impl IntoResponse {
    match s.registry.generate(req.name, req.expires_in_days, req.never_expires).await {
        Ok(token) => Json(TokenCreatedResponse {
            id: token.id,
            token: token.secret,
            name: token.name,
            created_at: token.created_at_ms,
            expires_at: token.expires_at_ms,
        })
        .into_response(),
        Err(e) => e.to_http_response("failed to create token").into_response(),
    }
}

/// `GET /admin/tokens` — records only, never the secret.
pub async fn list_tokens(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    let now = crate::state::epoch_ms();
    match s.registry.list().await {
        Ok(tokens) => {
            let list: Vec<TokenInfo> = tokens
                .iter()
                .map(|record| TokenInfo {
                    id: record.id.clone(),
                    name: record.name.clone(),
                    created_at: record.created_at_ms,
                    expires_at: record.expires_at_ms,
                    is_active: record.is_active,
                    is_expired: record.is_expired(now),
                    last_used_at: record.last_used_at_ms,
                })
                .collect();
            Json(list).into_response()
        }
        Err(e) => e.to_http_response("failed to list tokens").into_response(),
    }
}

/// `POST /admin/tokens/{id}/revoke`
pub async fn revoke_token(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match s.registry.revoke(&id).await {
        Ok(true) => Json(SuccessResponse { success: true }).into_response(),
        Ok(false) => QueueError::NotFound.to_http_response("token not found").into_response(),
        Err(e) => e.to_http_response("failed to revoke token").into_response(),
    }
}

/// `DELETE /admin/tokens/{id}`
pub async fn delete_token(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match s.registry.delete(&id).await {
        Ok(true) => Json(RemovedResponse { id, removed: true }).into_response(),
        Ok(false) => QueueError::NotFound.to_http_response("token not found").into_response(),
        Err(e) => e.to_http_response("failed to delete token").into_response(),
    }
}
