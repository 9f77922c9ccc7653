//! Test helpers: an app wired to in-memory storage and repositories.
//!
//! Run with `cargo test -p emotes-api`. No database or bucket is needed.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use emotes_api::auth::JwtVerifier;
use emotes_api::setup::routes::app_routes;
use emotes_api::state::AppState;
use emotes_core::{EmoteData, EmoteStatus, ProcessingUpdate, User, UserRank};
use emotes_db::test_helpers::{MockEmoteRepository, MockUserRepository};
use emotes_services::test_helpers::harness;
use emotes_services::{StatusBroadcast, StatusSubscription};
use emotes_storage::test_helpers::MockStorage;
use emotes_worker::{EmoteStore, EmoteStoreConfig};
use tempfile::TempDir;
use uuid::Uuid;

pub use emotes_services::test_helpers::png;

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage: MockStorage,
    pub emotes: MockEmoteRepository,
    pub users: MockUserRepository,
    _scratch: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn bearer(&self, user: &User) -> String {
        let token = self
            .state
            .auth
            .issue(user.id, chrono::Duration::minutes(10))
            .unwrap();
        format!("Bearer {}", token)
    }

    pub fn user(&self, name: &str, rank: UserRank) -> User {
        self.users.add_user(name, rank)
    }

    /// A finished emote owned by `owner`, with one rendition in storage
    pub fn live_emote(&self, owner: &User, name: &str) -> EmoteData {
        let mut data = EmoteData::new_processing(name, "image/png", owner.id);
        data.status = EmoteStatus::Live;
        data.owner_name = Some(owner.display_name.clone());
        self.emotes.insert(data.clone());
        self.storage.insert(
            &format!("dev/emote/{}/1x", data.id),
            vec![1, 2, 3],
            "image/png",
        );
        data
    }

    pub fn processing_emote(&self, owner: &User) -> EmoteData {
        let data = EmoteData::new_processing("stillBaking", "image/png", owner.id);
        self.emotes.insert(data.clone());
        data
    }

    pub fn subscribe_all(&self) -> StatusSubscription {
        self.state.store.status().subscribe_all()
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with_limit(EmoteStoreConfig::default().max_upload_size_bytes)
}

pub fn setup_test_app_with_limit(max_upload_size_bytes: usize) -> TestApp {
    let h = harness();
    let store = Arc::new(EmoteStore::new(
        h.ctx.clone(),
        StatusBroadcast::new(64),
        EmoteStoreConfig {
            max_upload_size_bytes,
            ..EmoteStoreConfig::default()
        },
    ));
    let state = Arc::new(AppState::new(store, JwtVerifier::new(TEST_SECRET)));
    let server = TestServer::new(app_routes(state.clone())).unwrap();

    TestApp {
        server,
        state,
        storage: h.storage,
        emotes: h.emotes,
        users: h.users,
        _scratch: h.scratch,
    }
}

/// Wait for the terminal update of one emote
pub async fn terminal_update(subscription: &mut StatusSubscription, id: Uuid) -> ProcessingUpdate {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let event = subscription.next().await.expect("status bus closed");
            if event.update().emote_id == id && event.is_terminal() {
                return event.update().clone();
            }
        }
    })
    .await
    .expect("no terminal update in time")
}
