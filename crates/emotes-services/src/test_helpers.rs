//! Emote context over in-memory collaborators, for tests

use std::sync::Arc;

use emotes_db::test_helpers::{MockEmoteRepository, MockUserRepository};
use emotes_storage::test_helpers::MockStorage;
use emotes_storage::KeyScheme;
use tempfile::TempDir;

pub use emotes_processing::test_helpers::{gif, png};

use crate::EmoteContext;

pub struct Harness {
    pub ctx: Arc<EmoteContext>,
    pub storage: MockStorage,
    pub emotes: MockEmoteRepository,
    pub users: MockUserRepository,
    pub scratch: TempDir,
}

/// Fresh context with mock storage and repositories, keyed under `dev`
pub fn harness() -> Harness {
    let storage = MockStorage::new();
    let emotes = MockEmoteRepository::new();
    let users = MockUserRepository::new();
    let scratch = tempfile::tempdir().unwrap();
    let ctx = Arc::new(EmoteContext::new(
        Arc::new(storage.clone()),
        Arc::new(emotes.clone()),
        Arc::new(users.clone()),
        KeyScheme::new(Some("dev")),
        scratch.path(),
    ));
    Harness {
        ctx,
        storage,
        emotes,
        users,
        scratch,
    }
}
