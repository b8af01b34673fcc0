use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use compute::DayOverflow;
use config::{Config, ConfigError, Environment, File};
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info};

use crate::realtime::ChangeHub;
use crate::schemas::AppState;

/// Runtime settings, layered from built-in defaults, an optional `fluxo.toml`
/// and `FLUXO_*` environment variables (nested keys use `__`, e.g.
/// `FLUXO_HASHING__ITERATIONS`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    /// Lifetime of a sign-in session.
    pub session_ttl_hours: i64,
    /// Lifetime of cached analysis reports.
    pub cache_ttl_seconds: u64,
    /// ISO 4217 code used when printing amounts.
    pub currency: String,
    pub day_overflow: DayOverflow,
    /// Buffered change events per realtime subscriber before it must resync.
    pub realtime_buffer: usize,
    pub hashing: HashingSettings,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingSettings {
    pub salt_length: u32,
    pub hash_length: u32,
    pub iterations: u32,
    pub mem_cost_kib: u32,
    pub threads: u32,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .set_default("database_url", "sqlite://fluxo.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("session_ttl_hours", 720_i64)?
            .set_default("cache_ttl_seconds", 300_i64)?
            .set_default("currency", "BRL")?
            .set_default("day_overflow", "clamp")?
            .set_default("realtime_buffer", 256_i64)?
            .set_default("hashing.salt_length", 16_i64)?
            .set_default("hashing.hash_length", 32_i64)?
            .set_default("hashing.iterations", 3_i64)?
            .set_default("hashing.mem_cost_kib", 65536_i64)?
            .set_default("hashing.threads", 2_i64)?
            .add_source(File::with_name("fluxo").required(false))
            .add_source(
                Environment::with_prefix("FLUXO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Applies command line overrides on top of the loaded settings.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(database_url) = database_url {
            self.database_url = database_url;
        }
        if let Some(bind_address) = bind_address {
            self.bind_address = bind_address;
        }
        self
    }
}

/// Initialize application state from settings
pub async fn initialize_app_state(settings: Settings) -> Result<AppState> {
    info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url).await?;

    let cache = Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(settings.cache_ttl_seconds))
        .build();
    debug!(ttl_seconds = settings.cache_ttl_seconds, "Analysis cache initialized");

    let changes = ChangeHub::new(settings.realtime_buffer);

    Ok(AppState {
        db,
        cache,
        changes,
        settings: Arc::new(settings),
    })
}
