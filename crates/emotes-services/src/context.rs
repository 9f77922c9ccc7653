use std::path::{Path, PathBuf};
use std::sync::Arc;

use emotes_db::{EmoteRepository, UserRepository};
use emotes_storage::{KeyScheme, Storage};
use uuid::Uuid;

/// Collaborators shared by every emote: storage, repositories and key layout
pub struct EmoteContext {
    pub storage: Arc<dyn Storage>,
    pub emotes: Arc<dyn EmoteRepository>,
    pub users: Arc<dyn UserRepository>,
    pub keys: KeyScheme,
    scratch_root: PathBuf,
}

impl EmoteContext {
    pub fn new(
        storage: Arc<dyn Storage>,
        emotes: Arc<dyn EmoteRepository>,
        users: Arc<dyn UserRepository>,
        keys: KeyScheme,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            emotes,
            users,
            keys,
            scratch_root: scratch_root.into(),
        }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Scratch directory owned by one emote's worker
    pub fn scratch_dir(&self, emote_id: Uuid) -> PathBuf {
        self.scratch_root.join(emote_id.to_string())
    }
}
