//! Backend selection for rendition storage.

use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use emotes_core::Config;

/// Where renditions go, with everything the backend needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Bucket {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        public_read: bool,
    },
    Directory {
        root: PathBuf,
        public_base_url: String,
    },
}

fn required(value: Option<&str>, name: &str) -> StorageResult<String> {
    value
        .map(str::to_string)
        .ok_or_else(|| StorageError::ConfigError(format!("{} is required for emote storage", name)))
}

impl StorageTarget {
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        match config.storage_backend() {
            StorageBackend::S3 => Ok(StorageTarget::Bucket {
                bucket: required(config.s3_bucket(), "S3_BUCKET")?,
                region: required(config.s3_region(), "S3_REGION")?,
                endpoint: config.s3_endpoint().map(str::to_string),
                public_read: config.s3_public_read(),
            }),
            StorageBackend::Local => Ok(StorageTarget::Directory {
                root: required(config.local_storage_path(), "LOCAL_STORAGE_PATH")?.into(),
                public_base_url: required(
                    config.local_storage_base_url(),
                    "LOCAL_STORAGE_BASE_URL",
                )?,
            }),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            StorageTarget::Bucket { .. } => StorageBackend::S3,
            StorageTarget::Directory { .. } => StorageBackend::Local,
        }
    }

    /// Start the backend. A backend compiled out by features is a config error.
    pub async fn connect(self) -> StorageResult<Arc<dyn Storage>> {
        match self {
            #[cfg(feature = "storage-s3")]
            StorageTarget::Bucket {
                bucket,
                region,
                endpoint,
                public_read,
            } => Ok(Arc::new(
                S3Storage::new(bucket, region, endpoint, public_read).await?,
            )),
            #[cfg(feature = "storage-local")]
            StorageTarget::Directory {
                root,
                public_base_url,
            } => Ok(Arc::new(LocalStorage::new(root, public_base_url).await?)),
            #[allow(unreachable_patterns)]
            other => Err(StorageError::ConfigError(format!(
                "{:?} storage is not compiled into this build",
                other.backend()
            ))),
        }
    }
}

/// Storage for emote renditions, as configured
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    StorageTarget::from_config(config)?.connect().await
}
