//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use emotes_core::Config;
use emotes_db::{PgEmoteRepository, PgUserRepository};
use emotes_infra::{init_telemetry, LogFormat};
use emotes_services::{EmoteContext, StatusBroadcast};
use emotes_storage::KeyScheme;
use emotes_worker::{EmoteStore, EmoteStoreConfig};

use crate::auth::JwtVerifier;
use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    init_telemetry("emotes-api", config.environment(), LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    tokio::fs::create_dir_all(config.scratch_dir())
        .await
        .with_context(|| format!("Failed to create scratch dir {:?}", config.scratch_dir()))?;

    let ctx = Arc::new(EmoteContext::new(
        storage,
        Arc::new(PgEmoteRepository::new(pool.clone())),
        Arc::new(PgUserRepository::new(pool)),
        KeyScheme::new(config.key_env_prefix()),
        config.scratch_dir().clone(),
    ));
    let status = StatusBroadcast::new(config.status_channel_capacity());
    let store = Arc::new(EmoteStore::new(
        ctx,
        status,
        EmoteStoreConfig::from(&config),
    ));

    let state = Arc::new(AppState::new(store, JwtVerifier::new(config.jwt_secret())));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
