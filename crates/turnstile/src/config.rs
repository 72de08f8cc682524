// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the turnstile queue service.
#[derive(Debug, Clone, clap::Parser)]
pub struct Config {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "TURNSTILE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9400, env = "TURNSTILE_PORT")]
    pub port: u16,

    /// Ephemeral queue store URL (Redis).
    #[arg(long, default_value = "redis://127.0.0.1:6379", env = "TURNSTILE_EPHEMERAL_URL")]
    pub ephemeral_url: String,

    /// Metadata store URL (SQLite).
    #[arg(long, default_value = "sqlite:turnstile.db?mode=rwc", env = "TURNSTILE_DATABASE_URL")]
    pub database_url: String,

    /// Bearer token for `/admin/*` routes. If unset, admin auth is disabled.
    #[arg(long, env = "TURNSTILE_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Scheduler tick interval in milliseconds.
    #[arg(long, default_value_t = 1000, env = "TURNSTILE_TICK_MS")]
    pub tick_ms: u64,

    /// How long the scheduler pauses after a store outage, in seconds.
    #[arg(long, default_value_t = 30, env = "TURNSTILE_STORE_BACKOFF_SECS")]
    pub store_backoff_secs: u64,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "TURNSTILE_LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms)
    }

    pub fn store_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store_backoff_secs)
    }
}
