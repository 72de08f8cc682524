// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The admission and rotation protocol.
//!
//! All state lives in the ephemeral store under `q:{event}:*` keys; the engine
//! composes the store's atomic primitives and never holds a lock across them.
//! Admissions are journaled to the metadata store best-effort.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::meta::{Event, MetaStore};
use crate::store::{active_key, timer_key, users_key, waiting_key, QueueStore};

pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    meta: MetaStore,
}

/// Point-in-time read of one event's ephemeral state.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub active: Vec<String>,
    pub waiting: Vec<String>,
    /// Timer TTL in store semantics: -2 absent, -1 no expiry, else seconds.
    pub ttl: i64,
}

impl QueueSnapshot {
    pub fn window_active(&self) -> bool {
        self.ttl > 0
    }

    pub fn has_slot(&self, limit: u32) -> bool {
        self.active.len() < limit as usize
    }

    /// Entry-window policy: a newcomer enters directly into an idle event
    /// (no window, no backlog) or into a spare active slot.
    pub fn can_enter_directly(&self, limit: u32) -> bool {
        (!self.window_active() && self.waiting.is_empty()) || self.has_slot(limit)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.active.iter().any(|u| u == user_id) || self.waiting.iter().any(|u| u == user_id)
    }

    pub fn in_active(&self, user_id: &str) -> bool {
        self.active.iter().any(|u| u == user_id)
    }

    pub fn time_remaining(&self) -> i64 {
        self.ttl.max(0)
    }

    pub fn status_of(&self, user_id: &str) -> UserStatus {
        let active_users = self.active.len();
        let waiting_users = self.waiting.len();
        if self.in_active(user_id) {
            UserStatus {
                state: UserState::Active,
                position: 0,
                total: active_users + waiting_users,
                time_remaining: self.time_remaining(),
                active_users,
                waiting_users,
            }
        } else {
            // For an absent user this is the would-be position if they
            // enqueued next; informational only, never a reservation.
            let position = self
                .waiting
                .iter()
                .position(|u| u == user_id)
                .map(|i| i + 1)
                .unwrap_or(waiting_users + 1);
            UserStatus {
                state: UserState::Waiting,
                position,
                total: active_users + waiting_users,
                time_remaining: self.time_remaining(),
                active_users,
                waiting_users,
            }
        }
    }
}

/// Where a user ended up within an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Active,
    Waiting { position: usize },
}

/// Result of a direct admission.
#[derive(Debug, Clone, Copy)]
pub struct AdmitOutcome {
    /// Whether a batch window was already running before this admission.
    pub window_was_active: bool,
    /// Timer TTL after the admission, clamped at 0.
    pub time_remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Active,
    Waiting,
}

#[derive(Debug, Clone)]
pub struct UserStatus {
    pub state: UserState,
    pub position: usize,
    pub total: usize,
    pub time_remaining: i64,
    pub active_users: usize,
    pub waiting_users: usize,
}

/// Result of a forced rotation.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub moved: Vec<String>,
    pub active: Vec<String>,
    pub waiting: Vec<String>,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn QueueStore>, meta: MetaStore) -> Self {
        Self { store, meta }
    }

    pub async fn snapshot(&self, event_id: &str) -> Result<QueueSnapshot, QueueError> {
        let active = self.store.list_range(&active_key(event_id)).await?;
        let waiting = self.store.list_range(&waiting_key(event_id)).await?;
        let ttl = self.store.ttl(&timer_key(event_id)).await?;
        Ok(QueueSnapshot { active, waiting, ttl })
    }

    /// Append a user to the waiting line. Idempotent w.r.t. membership:
    /// a user already in the event keeps their existing placement.
    pub async fn enqueue(&self, event: &Event, user_id: &str) -> Result<Placement, QueueError> {
        let users = users_key(&event.id);
        if !self.store.set_add(&users, user_id).await? {
            // Already a member: report the existing placement.
            let active = self.store.list_range(&active_key(&event.id)).await?;
            if active.iter().any(|u| u == user_id) {
                return Ok(Placement::Active);
            }
            let waiting = self.store.list_range(&waiting_key(&event.id)).await?;
            if let Some(idx) = waiting.iter().position(|u| u == user_id) {
                return Ok(Placement::Waiting { position: idx + 1 });
            }
            // Membership is set but the list append from a concurrent join has
            // not landed yet. Report the would-be position; pushing here would
            // duplicate the user.
            return Ok(Placement::Waiting { position: waiting.len() + 1 });
        }
        let len = self.store.push_back(&waiting_key(&event.id), user_id).await?;
        Ok(Placement::Waiting { position: len.max(1) as usize })
    }

    /// Direct entry into the active batch. Caller is responsible for having
    /// checked the entry-window policy; races with the scheduler are benign
    /// because the batch bound is re-established at the next rotation.
    pub async fn admit(&self, event: &Event, user_id: &str) -> Result<AdmitOutcome, QueueError> {
        let timer = timer_key(&event.id);
        let prior_ttl = self.store.ttl(&timer).await?;

        self.store.set_add(&users_key(&event.id), user_id).await?;
        let active_len = self.store.push_back(&active_key(&event.id), user_id).await?;
        self.journal(&event.id, user_id).await;

        if active_len >= event.queue_limit as i64 || prior_ttl <= 0 {
            self.store.set_with_ttl(&timer, "1", event.interval_sec as i64).await?;
        }

        // First admission wakes the event for the scheduler. Best-effort:
        // the user is already admitted either way.
        if !event.is_active {
            if let Err(e) = self.meta.set_event_active(&event.id, true).await {
                tracing::warn!(event_id = %event.id, err = %e, "failed to mark event active");
            }
        }

        let ttl = self.store.ttl(&timer).await?;
        Ok(AdmitOutcome { window_was_active: prior_ttl > 0, time_remaining: ttl.max(0) })
    }

    /// Rotate or top up the active batch. Safe to call concurrently from the
    /// scheduler and request paths; a redundant call is a no-op.
    ///
    /// Returns the users promoted out of the waiting line, in order.
    pub async fn advance(&self, event: &Event) -> Result<Vec<String>, QueueError> {
        let limit = event.queue_limit.max(1) as usize;
        let interval = event.interval_sec as i64;
        let active = active_key(&event.id);
        let waiting = waiting_key(&event.id);
        let timer = timer_key(&event.id);

        let ttl = self.store.ttl(&timer).await?;
        let active_len = self.store.list_len(&active).await?;
        let waiting_len = self.store.list_len(&waiting).await?;

        let mut fresh_window = false;
        let slots = if active_len >= limit && ttl <= 0 {
            // Expired full batch: turn it over.
            self.clear_active(&event.id).await?;
            if waiting_len == 0 {
                // Drained event: no batch, no window.
                self.store.delete(&timer).await?;
                return Ok(Vec::new());
            }
            self.store.set_with_ttl(&timer, "1", interval).await?;
            fresh_window = true;
            limit
        } else if ttl > 0 {
            // Open window: top up without rotating.
            limit.saturating_sub(active_len)
        } else {
            // No window, partial batch: absorb up to the limit.
            limit
        };

        let mut moved = Vec::new();
        if slots > 0 && waiting_len > 0 {
            while moved.len() < slots {
                let Some(user) = self.store.pop_front(&waiting).await? else { break };
                self.store.push_back(&active, &user).await?;
                self.journal(&event.id, &user).await;
                moved.push(user);
            }
        }

        // A non-empty batch always runs under a window.
        if !fresh_window
            && self.store.list_len(&active).await? > 0
            && self.store.ttl(&timer).await? <= 0
        {
            self.store.set_with_ttl(&timer, "1", interval).await?;
        }

        Ok(moved)
    }

    /// Backfill one user into an empty batch and mark the event active.
    pub async fn start(&self, event: &Event) -> Result<(), QueueError> {
        let active = active_key(&event.id);
        if self.store.list_len(&active).await? == 0 {
            if let Some(user) = self.store.pop_front(&waiting_key(&event.id)).await? {
                self.store.push_back(&active, &user).await?;
                self.journal(&event.id, &user).await;
            }
        }
        if self.store.list_len(&active).await? > 0 {
            self.store
                .set_with_ttl(&timer_key(&event.id), "1", event.interval_sec as i64)
                .await?;
        }
        self.meta.set_event_active(&event.id, true).await?;
        Ok(())
    }

    /// Clear the batch and the timer; the waiting line survives a stop.
    pub async fn stop(&self, event: &Event) -> Result<(), QueueError> {
        self.clear_active(&event.id).await?;
        self.store.delete(&timer_key(&event.id)).await?;
        self.meta.set_event_active(&event.id, false).await?;
        Ok(())
    }

    /// Privileged manual rotation: evict the batch unconditionally and
    /// promote up to the limit from the waiting line.
    pub async fn advance_now(&self, event: &Event) -> Result<Rotation, QueueError> {
        let limit = event.queue_limit.max(1) as usize;
        let active = active_key(&event.id);
        let waiting = waiting_key(&event.id);
        let timer = timer_key(&event.id);

        self.clear_active(&event.id).await?;

        let mut moved = Vec::new();
        while moved.len() < limit {
            let Some(user) = self.store.pop_front(&waiting).await? else { break };
            self.store.push_back(&active, &user).await?;
            self.journal(&event.id, &user).await;
            moved.push(user);
        }

        if moved.is_empty() {
            self.store.delete(&timer).await?;
        } else {
            self.store.set_with_ttl(&timer, "1", event.interval_sec as i64).await?;
        }

        Ok(Rotation {
            moved,
            active: self.store.list_range(&active).await?,
            waiting: self.store.list_range(&waiting).await?,
        })
    }

    /// Enqueue `count` synthetic users, then run one advance.
    pub async fn enqueue_batch(
        &self,
        event: &Event,
        count: u32,
    ) -> Result<Vec<String>, QueueError> {
        let mut users = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let suffix: u32 = rand::rng().random();
            let user = format!("load-{suffix:08x}");
            self.enqueue(event, &user).await?;
            users.push(user);
        }
        self.advance(event).await?;
        Ok(users)
    }

    pub async fn status(&self, event_id: &str, user_id: &str) -> Result<UserStatus, QueueError> {
        Ok(self.snapshot(event_id).await?.status_of(user_id))
    }

    /// Remove all ephemeral keys for an event (used when the event is deleted).
    pub async fn clear_event(&self, event_id: &str) -> Result<(), QueueError> {
        self.store.delete(&active_key(event_id)).await?;
        self.store.delete(&waiting_key(event_id)).await?;
        self.store.delete(&users_key(event_id)).await?;
        self.store.delete(&timer_key(event_id)).await?;
        Ok(())
    }

    /// Delete the batch and prune its members from the membership set.
    async fn clear_active(&self, event_id: &str) -> Result<(), QueueError> {
        let key = active_key(event_id);
        let evicted = self.store.list_range(&key).await?;
        self.store.delete(&key).await?;
        let users = users_key(event_id);
        for user in &evicted {
            self.store.set_remove(&users, user).await?;
        }
        Ok(())
    }

    /// Best-effort history; an admission must not fail on a journal error.
    async fn journal(&self, event_id: &str, user_id: &str) {
        if let Err(e) = self.meta.insert_entry(event_id, user_id).await {
            tracing::warn!(event_id = %event_id, err = %e, "entry journal write failed");
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
