// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// A named admission domain. Events belong to exactly one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub created_at_ms: i64,
}

/// A named admission context with capacity and rotation interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub domain: String,
    /// Active-batch capacity, 1..=1000.
    pub queue_limit: u32,
    /// Batch-window length in seconds, 1..=3600.
    pub interval_sec: u32,
    pub is_active: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Append-only journal row written on each admission. Best-effort history,
/// not required for correctness of the queue loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub event_id: String,
    pub user_id: String,
    pub entered_at_ms: i64,
}

/// A bearer token record. The secret is stored but never serialized; callers
/// see it exactly once, at generation time.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub id: String,
    pub secret: String,
    pub name: Option<String>,
    pub created_at_ms: i64,
    pub expires_at_ms: Option<i64>,
    pub is_active: bool,
    pub last_used_at_ms: Option<i64>,
}

impl TokenRecord {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|at| at <= now_ms)
    }
}
