// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background rotation driver.
//!
//! A single task ticks every second, loads the active events, probes the
//! ephemeral store, and advances each event. A failure of either store pauses
//! rotation for the configured backoff (default 30 s); a failure on one event
//! never stops the others.

use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

/// Spawn the rotation task. Stops when the shutdown token is cancelled.
pub fn spawn_scheduler(state: Arc<AppState>) {
    let tick = state.config.tick_interval();
    let backoff = state.config.store_backoff();

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(tick);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut meta_backoff_until: Option<Instant> = None;
        let mut store_backoff_until: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let now = Instant::now();
            if meta_backoff_until.is_some_and(|until| until > now)
                || store_backoff_until.is_some_and(|until| until > now)
            {
                continue;
            }
            meta_backoff_until = None;
            store_backoff_until = None;

            let events = match state.meta.active_events().await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(err = %e, "metadata store unavailable, pausing rotation");
                    meta_backoff_until = Some(now + backoff);
                    continue;
                }
            };

            if let Err(e) = state.store.ping().await {
                tracing::warn!(err = %e, "ephemeral store unavailable, pausing rotation");
                store_backoff_until = Some(now + backoff);
                continue;
            }

            for event in &events {
                match state.engine.advance(event).await {
                    Ok(moved) if !moved.is_empty() => {
                        tracing::debug!(
                            event_id = %event.id,
                            promoted = moved.len(),
                            "scheduler advanced event"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(event_id = %event.id, err = %e, "advance failed");
                    }
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
