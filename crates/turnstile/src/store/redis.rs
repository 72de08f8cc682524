// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed queue store.
//!
//! The connection is established lazily through a `ConnectionManager`, which
//! reconnects with exponential backoff (3 attempts, 250 ms → 1 s). Every
//! operation is bounded by a 5 s timeout; any failure maps to
//! `QueueError::EphemeralUnavailable` so callers see a single degraded-store
//! error kind.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::FromRedisValue;
use tokio::sync::RwLock;

use crate::error::QueueError;
use crate::store::QueueStore;

const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnect backoff: 250 ms * 2^attempt, 3 attempts (caps at 1 s per step).
const RECONNECT_EXPONENT_BASE: u64 = 2;
const RECONNECT_FACTOR_MS: u64 = 250;
const RECONNECT_ATTEMPTS: usize = 3;

pub struct RedisQueueStore {
    client: redis::Client,
    manager: RwLock<Option<ConnectionManager>>,
}

impl RedisQueueStore {
    /// Create a store handle. Does not connect; the first operation does.
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self { client, manager: RwLock::new(None) })
    }

    async fn conn(&self) -> Result<ConnectionManager, QueueError> {
        if let Some(manager) = self.manager.read().await.as_ref() {
            return Ok(manager.clone());
        }

        let mut guard = self.manager.write().await;
        // Another task may have connected while we waited for the write lock.
        if let Some(manager) = guard.as_ref() {
            return Ok(manager.clone());
        }

        let connect = ConnectionManager::new_with_backoff(
            self.client.clone(),
            RECONNECT_EXPONENT_BASE,
            RECONNECT_FACTOR_MS,
            RECONNECT_ATTEMPTS,
        );
        match tokio::time::timeout(OP_TIMEOUT, connect).await {
            Ok(Ok(manager)) => {
                *guard = Some(manager.clone());
                Ok(manager)
            }
            Ok(Err(e)) => {
                tracing::debug!(err = %e, "ephemeral store connect failed");
                Err(QueueError::EphemeralUnavailable)
            }
            Err(_) => {
                tracing::debug!("ephemeral store connect timed out");
                Err(QueueError::EphemeralUnavailable)
            }
        }
    }

    async fn run<T: FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T, QueueError> {
        let mut conn = self.conn().await?;
        match tokio::time::timeout(OP_TIMEOUT, cmd.query_async::<_, T>(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::debug!(err = %e, "ephemeral store command failed");
                Err(QueueError::EphemeralUnavailable)
            }
            Err(_) => {
                tracing::debug!("ephemeral store command timed out");
                Err(QueueError::EphemeralUnavailable)
            }
        }
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push_back(&self, key: &str, value: &str) -> Result<i64, QueueError> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(value);
        self.run(cmd).await
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>, QueueError> {
        let mut cmd = redis::cmd("LPOP");
        cmd.arg(key);
        self.run(cmd).await
    }

    async fn list_len(&self, key: &str) -> Result<usize, QueueError> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(key);
        let len: i64 = self.run(cmd).await?;
        Ok(len.max(0) as usize)
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, QueueError> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(0).arg(-1);
        self.run(cmd).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(member);
        let added: i64 = self.run(cmd).await?;
        Ok(added == 1)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), QueueError> {
        let mut cmd = redis::cmd("SREM");
        cmd.arg(key).arg(member);
        let _: i64 = self.run(cmd).await?;
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, QueueError> {
        let mut cmd = redis::cmd("SISMEMBER");
        cmd.arg(key).arg(member);
        let found: i64 = self.run(cmd).await?;
        Ok(found == 1)
    }

    async fn delete(&self, key: &str) -> Result<(), QueueError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let _: i64 = self.run(cmd).await?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: i64) -> Result<(), QueueError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_secs.max(1));
        let _: () = self.run(cmd).await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, QueueError> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        self.run(cmd).await
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let _: String = self.run(redis::cmd("PING")).await?;
        Ok(())
    }
}
