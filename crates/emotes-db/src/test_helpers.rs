//! In-memory repositories for tests

use async_trait::async_trait;
use emotes_core::{AppError, EmoteData, EmotePatch, EmoteStatus, User, UserRank};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{EmoteRepository, UserRepository};

#[derive(Clone, Default)]
pub struct MockEmoteRepository {
    emotes: Arc<Mutex<HashMap<Uuid, EmoteData>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockEmoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with a database error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored record
    pub fn get(&self, id: Uuid) -> Option<EmoteData> {
        self.emotes.lock().unwrap().get(&id).cloned()
    }

    pub fn insert(&self, emote: EmoteData) {
        self.emotes.lock().unwrap().insert(emote.id, emote);
    }

    /// Drop a record behind the owner's back
    pub fn remove(&self, id: Uuid) -> Option<EmoteData> {
        self.emotes.lock().unwrap().remove(&id)
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl EmoteRepository for MockEmoteRepository {
    async fn upsert(&self, emote: &EmoteData) -> Result<EmoteData, AppError> {
        self.check_writable()?;
        self.insert(emote.clone());
        Ok(emote.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EmoteData>, AppError> {
        Ok(self
            .get(id)
            .filter(|emote| emote.status != EmoteStatus::Deleted))
    }

    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &EmotePatch,
    ) -> Result<Option<EmoteData>, AppError> {
        self.check_writable()?;
        let mut emotes = self.emotes.lock().unwrap();
        Ok(emotes
            .get_mut(&id)
            .filter(|emote| emote.status != EmoteStatus::Deleted)
            .map(|emote| {
                patch.apply_to(emote);
                emote.clone()
            }))
    }

    async fn mark_live(&self, id: Uuid) -> Result<Option<EmoteData>, AppError> {
        self.check_writable()?;
        let mut emotes = self.emotes.lock().unwrap();
        Ok(emotes
            .get_mut(&id)
            .filter(|emote| emote.status == EmoteStatus::Processing)
            .map(|emote| {
                emote.status = EmoteStatus::Live;
                emote.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.check_writable()?;
        Ok(self.emotes.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return it
    pub fn add_user(&self, display_name: &str, rank: UserRank) -> User {
        let user = User {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            rank,
            emotes: Vec::new(),
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.get(id))
    }

    async fn add_emote(&self, user_id: Uuid, emote_id: Uuid) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&user_id).map(|user| {
            if !user.emotes.contains(&emote_id) {
                user.emotes.push(emote_id);
            }
            user.clone()
        }))
    }

    async fn remove_emote(
        &self,
        user_id: Uuid,
        emote_id: Uuid,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.get_mut(&user_id).map(|user| {
            user.emotes.retain(|id| *id != emote_id);
            user.clone()
        }))
    }
}
