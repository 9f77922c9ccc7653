//! Storage setup and initialization

use std::sync::Arc;

use anyhow::Result;
use emotes_core::Config;
use emotes_storage::{create_storage, Storage};

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = ?storage.backend_type(),
        "Storage initialized successfully"
    );
    Ok(storage)
}
