use std::sync::Arc;

use emotes_db::UserRepository;
use emotes_worker::EmoteStore;

use crate::auth::JwtVerifier;

/// Shared handler state
pub struct AppState {
    pub store: Arc<EmoteStore>,
    pub auth: JwtVerifier,
}

impl AppState {
    pub fn new(store: Arc<EmoteStore>, auth: JwtVerifier) -> Self {
        Self { store, auth }
    }

    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.store.context().users
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.store.config().max_upload_size_bytes
    }
}
