// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public queue handlers: join and status.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::engine::{Placement, QueueSnapshot, UserState};
use crate::error::QueueError;
use crate::meta::Event;
use crate::state::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_events: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub event_id: String,
    pub user_id: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// The stable join wire shape. Every branch of the classification table fills
/// all fields; `state` is the discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub state: UserState,
    pub position: usize,
    pub total: usize,
    pub time_remaining: i64,
    pub active_users: usize,
    pub waiting_users: usize,
    pub show_waiting_timer: bool,
    pub waiting_timer_duration: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub event_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: UserState,
    pub position: usize,
    pub total: usize,
    pub time_remaining: i64,
    pub active_users: usize,
    pub waiting_users: usize,
    pub show_waiting_timer: bool,
    pub waiting_timer_duration: i64,
}

/// Branch-specific outcome of a join, flattened onto [`JoinResponse`].
#[derive(Debug)]
enum JoinOutcome {
    Active { time_remaining: i64 },
    Waiting { position: usize, time_remaining: i64, show_waiting_timer: bool, timer_duration: i64 },
}

impl JoinOutcome {
    fn into_wire(self, snap: &QueueSnapshot) -> JoinResponse {
        let active_users = snap.active.len();
        let waiting_users = snap.waiting.len();
        let total = active_users + waiting_users;
        match self {
            Self::Active { time_remaining } => JoinResponse {
                success: true,
                state: UserState::Active,
                position: 0,
                total,
                time_remaining,
                active_users,
                waiting_users,
                show_waiting_timer: false,
                waiting_timer_duration: 0,
            },
            Self::Waiting { position, time_remaining, show_waiting_timer, timer_duration } => {
                JoinResponse {
                    success: true,
                    state: UserState::Waiting,
                    position,
                    total,
                    time_remaining,
                    active_users,
                    waiting_users,
                    show_waiting_timer,
                    waiting_timer_duration: if show_waiting_timer { timer_duration } else { 0 },
                }
            }
        }
    }
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    let active_events = s.meta.active_events().await.map(|events| events.len()).unwrap_or(0);
    Json(HealthResponse { status: "running".to_owned(), active_events })
}

/// `POST /queue/join` — request admission to an event.
pub async fn join(
    State(s): State<Arc<AppState>>,
    Json(req): Json<JoinRequest>,
) -> impl IntoResponse {
    if req.event_id.trim().is_empty() || req.user_id.trim().is_empty() {
        return QueueError::Validation
            .to_http_response("eventId and userId are required")
            .into_response();
    }

    let token = req.token.as_deref().unwrap_or("").trim();
    if token.is_empty() {
        return QueueError::Unauthorized.to_http_response("missing token").into_response();
    }
    match s.registry.validate(token).await {
        Ok(true) => {}
        Ok(false) => {
            return QueueError::Unauthorized.to_http_response("invalid token").into_response()
        }
        Err(e) => return e.to_http_response("token validation failed").into_response(),
    }

    let event = match s.meta.event_by_id(&req.event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return QueueError::NotFound.to_http_response("event not found").into_response(),
        Err(e) => return e.to_http_response("metadata store unavailable").into_response(),
    };

    // Domain, when supplied, must match the event's; otherwise it resolves
    // from the event itself.
    if let Some(domain) = req.domain.as_deref() {
        if domain != event.domain {
            return QueueError::Validation.to_http_response("domain not validated").into_response();
        }
    }

    match classify_join(&s, &event, req.user_id.trim()).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => e.to_http_response("queue store unavailable").into_response(),
    }
}

/// Join classification: already-active, direct entry, enqueue, or
/// opportunistic-advance-then-report.
async fn classify_join(
    s: &AppState,
    event: &Event,
    user_id: &str,
) -> Result<JoinResponse, QueueError> {
    let limit = event.queue_limit;
    let interval = event.interval_sec as i64;
    let snap = s.engine.snapshot(&event.id).await?;

    if snap.in_active(user_id) {
        let outcome = JoinOutcome::Active { time_remaining: snap.time_remaining() };
        return Ok(outcome.into_wire(&snap));
    }

    if !snap.is_member(user_id) {
        if snap.can_enter_directly(limit) {
            let admit = s.engine.admit(event, user_id).await?;
            let after = s.engine.snapshot(&event.id).await?;
            // An entry into an idle event reports no wait at all; an entry
            // into an open window reports that window's remaining time.
            let time_remaining = if admit.window_was_active { admit.time_remaining } else { 0 };
            return Ok(JoinOutcome::Active { time_remaining }.into_wire(&after));
        }

        let placement = s.engine.enqueue(event, user_id).await?;
        let after = s.engine.snapshot(&event.id).await?;
        let position = match placement {
            Placement::Waiting { position } => position,
            Placement::Active => 0,
        };
        let outcome = JoinOutcome::Waiting {
            position,
            time_remaining: after.time_remaining(),
            show_waiting_timer: true,
            timer_duration: interval,
        };
        return Ok(outcome.into_wire(&after));
    }

    // Already waiting: take one opportunistic advance, then report the
    // resulting state. The scheduler covers this if the advance fails.
    if let Err(e) = s.engine.advance(event).await {
        tracing::warn!(event_id = %event.id, err = %e, "opportunistic advance failed");
    }
    let after = s.engine.snapshot(&event.id).await?;
    let status = after.status_of(user_id);
    let outcome = match status.state {
        UserState::Active => JoinOutcome::Active { time_remaining: after.time_remaining() },
        UserState::Waiting => {
            let show = after.window_active() && after.active.len() >= limit as usize;
            JoinOutcome::Waiting {
                position: status.position,
                time_remaining: after.time_remaining(),
                show_waiting_timer: show,
                timer_duration: interval,
            }
        }
    };
    Ok(outcome.into_wire(&after))
}

/// `GET /queue/status` — idempotent probe, no token required.
pub async fn status(
    State(s): State<Arc<AppState>>,
    Query(q): Query<StatusQuery>,
) -> impl IntoResponse {
    if q.event_id.trim().is_empty() || q.user_id.trim().is_empty() {
        return QueueError::Validation
            .to_http_response("eventId and userId are required")
            .into_response();
    }

    let event = match s.meta.event_by_id(&q.event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return QueueError::NotFound.to_http_response("event not found").into_response(),
        Err(e) => return e.to_http_response("metadata store unavailable").into_response(),
    };

    if let Err(e) = s.engine.advance(&event).await {
        tracing::debug!(event_id = %event.id, err = %e, "opportunistic advance failed");
    }

    match s.engine.snapshot(&event.id).await {
        Ok(snap) => {
            let status = snap.status_of(q.user_id.trim());
            let show = status.state == UserState::Waiting
                && snap.window_active()
                && snap.active.len() >= event.queue_limit as usize;
            Json(StatusResponse {
                state: status.state,
                position: status.position,
                total: status.total,
                time_remaining: status.time_remaining,
                active_users: status.active_users,
                waiting_users: status.waiting_users,
                show_waiting_timer: show,
                waiting_timer_duration: if show { event.interval_sec as i64 } else { 0 },
            })
            .into_response()
        }
        Err(e) => {
            // Degraded read: the probe stays answerable while the ephemeral
            // store is down.
            tracing::warn!(event_id = %event.id, err = %e, "status degraded, queue store down");
            Json(StatusResponse {
                state: UserState::Waiting,
                position: 0,
                total: 0,
                time_remaining: 0,
                active_users: 0,
                waiting_users: 0,
                show_waiting_timer: false,
                waiting_timer_duration: 0,
            })
            .into_response()
        }
    }
}
