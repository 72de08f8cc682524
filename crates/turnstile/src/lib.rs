// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turnstile: a virtual waiting-room queue service.
//!
//! Users join a configured event and are either admitted into a
//! capacity-bounded active batch or queued FIFO behind it; a background
//! scheduler rotates batches as their windows expire.

pub mod config;
pub mod engine;
pub mod error;
pub mod meta;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod token;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::meta::MetaStore;
use crate::state::AppState;
use crate::store::{QueueStore, RedisQueueStore};
use crate::transport::build_router;

/// Run the queue service until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let meta = MetaStore::connect(&config.database_url).await?;
    let store: Arc<dyn QueueStore> = Arc::new(RedisQueueStore::new(&config.ephemeral_url)?);
    let state = Arc::new(AppState::new(config, store, meta, shutdown.clone()));

    scheduler::spawn_scheduler(Arc::clone(&state));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
        });
    }

    tracing::info!("turnstile listening on {addr}");
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
