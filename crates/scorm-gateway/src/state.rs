//! Application state

use crate::chunks::ChunkManager;
use crate::config::{GatewayConfig, StorageBackend};
use anyhow::Context;
use axum::http::HeaderValue;
use scorm_storage::{CloudStorage, FlexibleStorage, LocalStorage};
use std::sync::Arc;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Storage backend selected for this deployment
    pub storage: Arc<FlexibleStorage>,
    /// Chunked upload sessions
    pub chunk_manager: Arc<ChunkManager>,
    /// Parsed CORS origin
    pub allowed_origin: HeaderValue,
}

impl AppState {
    /// Create a new application state
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let allowed_origin = HeaderValue::from_str(&config.cors_origin)
            .with_context(|| format!("invalid CORS origin '{}'", config.cors_origin))?;

        let storage = match config.storage_backend {
            StorageBackend::Local => {
                tokio::fs::create_dir_all(&config.public_dir)
                    .await
                    .with_context(|| {
                        format!("failed to create {}", config.public_dir.display())
                    })?;
                info!("Using local storage at {}", config.public_dir.display());
                FlexibleStorage::Local(LocalStorage::new(&config.public_dir))
            }
            StorageBackend::Cloudinary => {
                let cloud = CloudStorage::new(config.cloud_config()?)?;
                info!(
                    "Using cloud storage (account {}, prefix {})",
                    cloud.config().cloud_name,
                    cloud.config().root_prefix
                );
                FlexibleStorage::Cloud(cloud)
            }
        };

        let chunk_manager = Arc::new(
            ChunkManager::new(&config.temp_dir, &config.uploads_dir)
                .with_max_chunks(config.max_chunks),
        );

        Ok(Self {
            config,
            storage: Arc::new(storage),
            chunk_manager,
            allowed_origin,
        })
    }
}
