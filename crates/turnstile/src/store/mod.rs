// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral queue store: per-event ordered lists, a membership set, and a
//! TTL-bearing timer key.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::error::QueueError;

pub use self::memory::MemoryQueueStore;
pub use self::redis::RedisQueueStore;

/// Key for the currently admitted batch (ordered, admission order).
pub fn active_key(event_id: &str) -> String {
    format!("q:{event_id}:active")
}

/// Key for the waiting line (ordered, FIFO).
pub fn waiting_key(event_id: &str) -> String {
    format!("q:{event_id}:waiting")
}

/// Key for the membership set (`active ∪ waiting`).
pub fn users_key(event_id: &str) -> String {
    format!("q:{event_id}:users")
}

/// Key for the batch-window timer. Presence means a window is in progress;
/// remaining TTL is seconds until rotation.
pub fn timer_key(event_id: &str) -> String {
    format!("q:{event_id}:timer")
}

/// Keyed store with atomic primitives. The engine composes these without
/// assuming multi-key transactions; each call is individually atomic.
///
/// TTL reads follow Redis semantics: `-2` for a missing key, `-1` for a key
/// without expiry, otherwise remaining seconds.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append to the tail of an ordered list. Returns the new length.
    async fn push_back(&self, key: &str, value: &str) -> Result<i64, QueueError>;

    /// Pop from the head of an ordered list.
    async fn pop_front(&self, key: &str) -> Result<Option<String>, QueueError>;

    /// Length of an ordered list (0 if absent).
    async fn list_len(&self, key: &str) -> Result<usize, QueueError>;

    /// Full contents of an ordered list, head first.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, QueueError>;

    /// Add a member to a set. Returns true if the member was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, QueueError>;

    /// Remove a member from a set.
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), QueueError>;

    /// Membership test.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, QueueError>;

    /// Delete a key of any type.
    async fn delete(&self, key: &str) -> Result<(), QueueError>;

    /// Set a scalar key with a TTL in seconds.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: i64) -> Result<(), QueueError>;

    /// Remaining TTL of a key in seconds (Redis semantics, see trait docs).
    async fn ttl(&self, key: &str) -> Result<i64, QueueError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), QueueError>;
}
