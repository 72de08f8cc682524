// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end queue scenarios.
//!
//! Stands up the full router in-process on the in-memory queue store and an
//! in-memory metadata store, with a seeded event and join token.

use std::sync::Arc;

use axum_test::TestServer;
use tokio_util::sync::CancellationToken;

use turnstile::config::Config;
use turnstile::meta::MetaStore;
use turnstile::state::AppState;
use turnstile::store::{timer_key, MemoryQueueStore, QueueStore};
use turnstile::transport::build_router;

pub struct TestQueue {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryQueueStore>,
    pub server: TestServer,
    pub event_id: String,
    pub token: String,
}

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        ephemeral_url: "redis://127.0.0.1:6379".into(),
        database_url: "sqlite::memory:".into(),
        admin_token: None,
        tick_ms: 100,
        store_backoff_secs: 30,
        log_level: "info".into(),
    }
}

impl TestQueue {
    /// Stand up the service around one event with the given capacity and
    /// window, plus a never-expiring join token.
    pub async fn start(queue_limit: u32, interval_sec: u32) -> anyhow::Result<Self> {
        let meta = MetaStore::in_memory().await?;
        meta.create_domain("shop").await?;
        let event = meta.create_event("drop", "shop", queue_limit, interval_sec).await?;

        let store = Arc::new(MemoryQueueStore::new());
        let state = Arc::new(AppState::new(
            test_config(),
            store.clone() as Arc<dyn QueueStore>,
            meta,
            CancellationToken::new(),
        ));
        let token = state.registry.generate(None, None, true).await?;

        let server = TestServer::new(build_router(Arc::clone(&state)))
            .map_err(|e| anyhow::anyhow!("test server: {e}"))?;

        Ok(Self { state, store, server, event_id: event.id, token: token.secret })
    }

    /// Run the scheduler against this instance (100 ms tick).
    pub fn run_scheduler(&self) {
        turnstile::scheduler::spawn_scheduler(Arc::clone(&self.state));
    }

    pub async fn join(&self, user: &str) -> serde_json::Value {
        self.server
            .post("/queue/join")
            .json(&serde_json::json!({
                "eventId": self.event_id,
                "userId": user,
                "token": self.token,
            }))
            .await
            .json()
    }

    pub async fn status(&self, user: &str) -> serde_json::Value {
        self.server
            .get("/queue/status")
            .add_query_params(&[("eventId", self.event_id.as_str()), ("userId", user)])
            .await
            .json()
    }

    pub async fn admin_enqueue(&self, user: &str) -> serde_json::Value {
        self.server
            .post("/admin/event/enqueue")
            .json(&serde_json::json!({ "eventId": self.event_id, "userId": user }))
            .await
            .json()
    }

    pub async fn admin_post(&self, path: &str) -> serde_json::Value {
        self.server
            .post(path)
            .json(&serde_json::json!({ "eventId": self.event_id }))
            .await
            .json()
    }

    /// Force the batch window to read as expired.
    pub async fn expire_window(&self) {
        self.store.expire_now(&timer_key(&self.event_id)).await;
    }

    pub async fn active_users(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.state.engine.snapshot(&self.event_id).await?.active)
    }

    pub async fn waiting_users(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.state.engine.snapshot(&self.event_id).await?.waiting)
    }

    pub async fn window_ttl(&self) -> anyhow::Result<i64> {
        Ok(self.state.engine.snapshot(&self.event_id).await?.ttl)
    }
}

impl Drop for TestQueue {
    fn drop(&mut self) {
        self.state.shutdown.cancel();
    }
}
