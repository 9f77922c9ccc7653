//! Shared key generation for storage backends.
//!
//! Key format: `[{env}/]emote/{emote_id}/{scope}x`.

use emotes_core::constants::EMOTE_KEY_SEGMENT;
use uuid::Uuid;

use crate::{StorageError, StorageResult};

/// Prefix holding every object of one emote.
///
/// `env_prefix` is `None` in production and e.g. `Some("dev")` elsewhere.
pub fn emote_prefix(env_prefix: Option<&str>, emote_id: Uuid) -> String {
    match env_prefix {
        Some(env) if !env.is_empty() => format!("{}/{}/{}", env, EMOTE_KEY_SEGMENT, emote_id),
        _ => format!("{}/{}", EMOTE_KEY_SEGMENT, emote_id),
    }
}

/// Key of one published rendition.
pub fn rendition_key(env_prefix: Option<&str>, emote_id: Uuid, scope: u8) -> String {
    format!("{}/{}x", emote_prefix(env_prefix, emote_id), scope)
}

/// Reject keys that could escape a backend's root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key '{}' contains invalid characters",
            storage_key
        )));
    }
    Ok(())
}

/// Environment-bound key builder handed to the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyScheme {
    env_prefix: Option<String>,
}

impl KeyScheme {
    pub fn new(env_prefix: Option<&str>) -> Self {
        Self {
            env_prefix: env_prefix.map(String::from),
        }
    }

    pub fn emote_prefix(&self, emote_id: Uuid) -> String {
        emote_prefix(self.env_prefix.as_deref(), emote_id)
    }

    pub fn rendition_key(&self, emote_id: Uuid, scope: u8) -> String {
        rendition_key(self.env_prefix.as_deref(), emote_id, scope)
    }
}
