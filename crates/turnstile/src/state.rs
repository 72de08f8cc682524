// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::engine::QueueEngine;
use crate::meta::MetaStore;
use crate::store::QueueStore;
use crate::token::TokenRegistry;

/// Shared service state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn QueueStore>,
    pub meta: MetaStore,
    pub engine: QueueEngine,
    pub registry: TokenRegistry,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn QueueStore>,
        meta: MetaStore,
        shutdown: CancellationToken,
    ) -> Self {
        let engine = QueueEngine::new(Arc::clone(&store), meta.clone());
        let registry = TokenRegistry::new(meta.clone());
        Self { config, store, meta, engine, registry, shutdown }
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
