// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory queue store for tests and local development.
//!
//! TTLs are deadline-based and checked lazily on access, mirroring the Redis
//! semantics the engine relies on (`-2` missing, `-1` no expiry).

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::QueueError;
use crate::store::QueueStore;

enum Value {
    List(VecDeque<String>),
    Set(HashSet<String>),
    Scalar { expires_at: Option<Instant> },
}

#[derive(Default)]
pub struct MemoryQueueStore {
    inner: Mutex<HashMap<String, Value>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a scalar key to read as expired, as if its TTL had elapsed.
    /// Lets tests drive rotations without sleeping through real intervals.
    pub async fn expire_now(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(Value::Scalar { expires_at }) = inner.get_mut(key) {
            *expires_at = Some(Instant::now());
        }
    }
}

/// Remove the key if its deadline has passed; returns whether it survived.
fn prune_expired(inner: &mut HashMap<String, Value>, key: &str) -> bool {
    if let Some(Value::Scalar { expires_at: Some(deadline) }) = inner.get(key) {
        if *deadline <= Instant::now() {
            inner.remove(key);
            return false;
        }
    }
    inner.contains_key(key)
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn push_back(&self, key: &str, value: &str) -> Result<i64, QueueError> {
        let mut inner = self.inner.lock().await;
        match inner.entry(key.to_owned()).or_insert_with(|| Value::List(VecDeque::new())) {
            Value::List(list) => {
                list.push_back(value.to_owned());
                Ok(list.len() as i64)
            }
            _ => Err(QueueError::Internal),
        }
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>, QueueError> {
        let mut inner = self.inner.lock().await;
        let (value, now_empty) = match inner.get_mut(key) {
            Some(Value::List(list)) => {
                let value = list.pop_front();
                (value, list.is_empty())
            }
            Some(_) => return Err(QueueError::Internal),
            None => return Ok(None),
        };
        if now_empty {
            inner.remove(key);
        }
        Ok(value)
    }

    async fn list_len(&self, key: &str) -> Result<usize, QueueError> {
        let inner = self.inner.lock().await;
        match inner.get(key) {
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(QueueError::Internal),
            None => Ok(0),
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, QueueError> {
        let inner = self.inner.lock().await;
        match inner.get(key) {
            Some(Value::List(list)) => Ok(list.iter().cloned().collect()),
            Some(_) => Err(QueueError::Internal),
            None => Ok(Vec::new()),
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        let mut inner = self.inner.lock().await;
        match inner.entry(key.to_owned()).or_insert_with(|| Value::Set(HashSet::new())) {
            Value::Set(set) => Ok(set.insert(member.to_owned())),
            _ => Err(QueueError::Internal),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let mut now_empty = false;
        if let Some(Value::Set(set)) = inner.get_mut(key) {
            set.remove(member);
            now_empty = set.is_empty();
        }
        if now_empty {
            inner.remove(key);
        }
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        let inner = self.inner.lock().await;
        match inner.get(key) {
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(QueueError::Internal),
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), QueueError> {
        self.inner.lock().await.remove(key);
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, _value: &str, ttl_secs: i64) -> Result<(), QueueError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs.max(1) as u64);
        self.inner
            .lock()
            .await
            .insert(key.to_owned(), Value::Scalar { expires_at: Some(deadline) });
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, QueueError> {
        let mut inner = self.inner.lock().await;
        if !prune_expired(&mut inner, key) {
            return Ok(-2);
        }
        match inner.get(key) {
            Some(Value::Scalar { expires_at: Some(deadline) }) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                Ok(remaining.as_secs_f64().ceil() as i64)
            }
            Some(_) => Ok(-1),
            None => Ok(-2),
        }
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
