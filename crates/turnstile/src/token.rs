// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token registry for the join path.
//!
//! Secrets are 32 random bytes, hex-encoded, returned exactly once at
//! generation time. Validation deactivates lapsed tokens in place and stamps
//! `lastUsedAt` on success.

use rand::Rng;

use crate::error::QueueError;
use crate::meta::{MetaStore, TokenRecord};
use crate::state::epoch_ms;

/// Default lifetime when neither `expiresInDays` nor `neverExpires` is given.
const DEFAULT_EXPIRY_DAYS: i64 = 15;

const DAY_MS: i64 = 86_400_000;

pub struct TokenRegistry {
    meta: MetaStore,
}

/// A freshly generated token. The only place the secret ever appears.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    pub id: String,
    pub secret: String,
    pub name: Option<String>,
    pub created_at_ms: i64,
    pub expires_at_ms: Option<i64>,
}

impl TokenRegistry {
    pub fn new(meta: MetaStore) -> Self {
        Self { meta }
    }

    pub async fn generate(
        &self,
        name: Option<String>,
        expires_in_days: Option<i64>,
        never_expires: bool,
    ) -> Result<GeneratedToken, QueueError> {
        let now = epoch_ms();
        let expires_at_ms = if never_expires {
            None
        } else {
            let days = expires_in_days.unwrap_or(DEFAULT_EXPIRY_DAYS).max(1);
            Some(now + days * DAY_MS)
        };
        let record = TokenRecord {
            id: uuid::Uuid::new_v4().to_string(),
            secret: generate_secret(),
            name,
            created_at_ms: now,
            expires_at_ms,
            is_active: true,
            last_used_at_ms: None,
        };
        self.meta.insert_token(&record).await?;
        Ok(GeneratedToken {
            id: record.id,
            secret: record.secret,
            name: record.name,
            created_at_ms: record.created_at_ms,
            expires_at_ms: record.expires_at_ms,
        })
    }

    pub async fn list(&self) -> Result<Vec<TokenRecord>, QueueError> {
        self.meta.list_tokens().await
    }

    pub async fn revoke(&self, id: &str) -> Result<bool, QueueError> {
        self.meta.set_token_active(id, false).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, QueueError> {
        self.meta.delete_token(id).await
    }

    /// Check a presented secret. A lapsed token is deactivated on the spot so
    /// later lookups short-circuit at the store.
    pub async fn validate(&self, secret: &str) -> Result<bool, QueueError> {
        let Some(record) = self.meta.token_by_secret(secret).await? else {
            return Ok(false);
        };
        if record.is_expired(epoch_ms()) {
            self.meta.set_token_active(&record.id, false).await?;
            return Ok(false);
        }
        self.meta.touch_token(&record.id).await?;
        Ok(true)
    }
}

/// 32 random bytes, hex-encoded (64 chars).
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

const HEX: &[u8; 16] = b"0123456789abcdef";

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
