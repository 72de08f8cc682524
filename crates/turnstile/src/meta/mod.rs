// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable metadata store: domains, events, tokens, and the entry journal.
//!
//! SQLite-backed via `sqlx`. Schema is created on connect. Unique-constraint
//! violations map to `Conflict`; any other database failure maps to
//! `MetadataUnavailable` so callers can distinguish "absent" from "unreachable".

pub mod model;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

use crate::error::QueueError;
use crate::state::epoch_ms;

pub use model::{Domain, EntryRecord, Event, TokenRecord};

/// Most Entry rows ever returned by a single read.
pub const ENTRIES_CAP: i64 = 200;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct MetaStore {
    pool: SqlitePool,
}

fn map_sqlx(e: sqlx::Error) -> QueueError {
    if let sqlx::Error::Database(ref db) = e {
        if db.message().contains("UNIQUE constraint failed") {
            return QueueError::Conflict;
        }
    }
    tracing::debug!(err = %e, "metadata store query failed");
    QueueError::MetadataUnavailable
}

impl MetaStore {
    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new().acquire_timeout(CONNECT_TIMEOUT).connect(url).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Single-connection in-memory database, for tests and local dev.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS domains (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at_ms INTEGER NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                domain TEXT NOT NULL,
                queue_limit INTEGER NOT NULL,
                interval_sec INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at_ms INTEGER NOT NULL,
                updated_at_ms INTEGER NOT NULL,
                UNIQUE(domain, name)
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                entered_at_ms INTEGER NOT NULL
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_event ON entries (event_id, entered_at_ms);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id TEXT PRIMARY KEY,
                secret TEXT NOT NULL UNIQUE,
                name TEXT,
                created_at_ms INTEGER NOT NULL,
                expires_at_ms INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_used_at_ms INTEGER
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // -- Domains --------------------------------------------------------------

    pub async fn create_domain(&self, name: &str) -> Result<Domain, QueueError> {
        let domain = Domain {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_owned(),
            created_at_ms: epoch_ms(),
        };
        sqlx::query("INSERT INTO domains (id, name, created_at_ms) VALUES (?, ?, ?)")
            .bind(&domain.id)
            .bind(&domain.name)
            .bind(domain.created_at_ms)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(domain)
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>, QueueError> {
        let rows = sqlx::query("SELECT id, name, created_at_ms FROM domains ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows
            .iter()
            .map(|row| Domain {
                id: row.get("id"),
                name: row.get("name"),
                created_at_ms: row.get("created_at_ms"),
            })
            .collect())
    }

    pub async fn domain_by_name(&self, name: &str) -> Result<Option<Domain>, QueueError> {
        let row = sqlx::query("SELECT id, name, created_at_ms FROM domains WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(|row| Domain {
            id: row.get("id"),
            name: row.get("name"),
            created_at_ms: row.get("created_at_ms"),
        }))
    }

    pub async fn delete_domain(&self, id: &str) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    // -- Events ---------------------------------------------------------------

    pub async fn create_event(
        &self,
        name: &str,
        domain: &str,
        queue_limit: u32,
        interval_sec: u32,
    ) -> Result<Event, QueueError> {
        let now = epoch_ms();
        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_owned(),
            domain: domain.to_owned(),
            queue_limit,
            interval_sec,
            is_active: false,
            created_at_ms: now,
            updated_at_ms: now,
        };
        sqlx::query(
            r#"
            INSERT INTO events
                (id, name, domain, queue_limit, interval_sec, is_active, created_at_ms, updated_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.domain)
        .bind(event.queue_limit as i64)
        .bind(event.interval_sec as i64)
        .bind(event.is_active)
        .bind(event.created_at_ms)
        .bind(event.updated_at_ms)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(event)
    }

    pub async fn event_by_id(&self, id: &str) -> Result<Option<Event>, QueueError> {
        let row = sqlx::query("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.as_ref().map(event_from_row))
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, QueueError> {
        let rows = sqlx::query("SELECT * FROM events ORDER BY domain, name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    pub async fn active_events(&self) -> Result<Vec<Event>, QueueError> {
        let rows = sqlx::query("SELECT * FROM events WHERE is_active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    pub async fn update_event(
        &self,
        id: &str,
        name: Option<&str>,
        queue_limit: Option<u32>,
        interval_sec: Option<u32>,
    ) -> Result<Option<Event>, QueueError> {
        let Some(mut event) = self.event_by_id(id).await? else {
            return Ok(None);
        };
        if let Some(name) = name {
            event.name = name.to_owned();
        }
        if let Some(limit) = queue_limit {
            event.queue_limit = limit;
        }
        if let Some(interval) = interval_sec {
            event.interval_sec = interval;
        }
        event.updated_at_ms = epoch_ms();

        sqlx::query(
            r#"
            UPDATE events
            SET name = ?, queue_limit = ?, interval_sec = ?, updated_at_ms = ?
            WHERE id = ?
        "#,
        )
        .bind(&event.name)
        .bind(event.queue_limit as i64)
        .bind(event.interval_sec as i64)
        .bind(event.updated_at_ms)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(Some(event))
    }

    pub async fn set_event_active(&self, id: &str, is_active: bool) -> Result<(), QueueError> {
        sqlx::query("UPDATE events SET is_active = ?, updated_at_ms = ? WHERE id = ?")
            .bind(is_active)
            .bind(epoch_ms())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    pub async fn delete_event(&self, id: &str) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    // -- Entry journal --------------------------------------------------------

    pub async fn insert_entry(&self, event_id: &str, user_id: &str) -> Result<(), QueueError> {
        sqlx::query("INSERT INTO entries (event_id, user_id, entered_at_ms) VALUES (?, ?, ?)")
            .bind(event_id)
            .bind(user_id)
            .bind(epoch_ms())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    /// Most recent entries for an event, newest first, capped at [`ENTRIES_CAP`].
    pub async fn recent_entries(&self, event_id: &str) -> Result<Vec<EntryRecord>, QueueError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, user_id, entered_at_ms FROM entries
            WHERE event_id = ?
            ORDER BY entered_at_ms DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(event_id)
        .bind(ENTRIES_CAP)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows
            .iter()
            .map(|row| EntryRecord {
                event_id: row.get("event_id"),
                user_id: row.get("user_id"),
                entered_at_ms: row.get("entered_at_ms"),
            })
            .collect())
    }

    // -- Tokens ---------------------------------------------------------------

    pub async fn insert_token(&self, token: &TokenRecord) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            INSERT INTO tokens
                (id, secret, name, created_at_ms, expires_at_ms, is_active, last_used_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&token.id)
        .bind(&token.secret)
        .bind(&token.name)
        .bind(token.created_at_ms)
        .bind(token.expires_at_ms)
        .bind(token.is_active)
        .bind(token.last_used_at_ms)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    pub async fn list_tokens(&self) -> Result<Vec<TokenRecord>, QueueError> {
        let rows = sqlx::query("SELECT * FROM tokens ORDER BY created_at_ms DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.iter().map(token_from_row).collect())
    }

    pub async fn token_by_secret(&self, secret: &str) -> Result<Option<TokenRecord>, QueueError> {
        let row = sqlx::query("SELECT * FROM tokens WHERE secret = ? AND is_active = 1")
            .bind(secret)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.as_ref().map(token_from_row))
    }

    pub async fn set_token_active(&self, id: &str, is_active: bool) -> Result<bool, QueueError> {
        let result = sqlx::query("UPDATE tokens SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_token(&self, id: &str) -> Result<(), QueueError> {
        sqlx::query("UPDATE tokens SET last_used_at_ms = ? WHERE id = ?")
            .bind(epoch_ms())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    pub async fn delete_token(&self, id: &str) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        name: row.get("name"),
        domain: row.get("domain"),
        queue_limit: row.get::<i64, _>("queue_limit") as u32,
        interval_sec: row.get::<i64, _>("interval_sec") as u32,
        is_active: row.get("is_active"),
        created_at_ms: row.get("created_at_ms"),
        updated_at_ms: row.get("updated_at_ms"),
    }
}

fn token_from_row(row: &sqlx::sqlite::SqliteRow) -> TokenRecord {
    TokenRecord {
        id: row.get("id"),
        secret: row.get("secret"),
        name: row.get("name"),
        created_at_ms: row.get("created_at_ms"),
        expires_at_ms: row.get("expires_at_ms"),
        is_active: row.get("is_active"),
        last_used_at_ms: row.get("last_used_at_ms"),
    }
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
