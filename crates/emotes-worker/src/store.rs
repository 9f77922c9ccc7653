//! Emote store: the orchestrator.
//!
//! `create` hands back the synthesized emote straight away. Transcoding runs
//! in a worker unit; a feeder task streams the upload into it and a
//! supervisor task relays whatever the worker reports.

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use emotes_core::constants::{
    DEFAULT_MAX_UPLOAD_SIZE_BYTES, SUPPORTED_MIME_TYPES, TOTAL_PROCESSING_TASKS,
};
use emotes_core::validation;
use emotes_core::{AppError, Config, ErrorMetadata, ProcessingUpdate};
use emotes_services::{Emote, EmoteContext, StatusBroadcast};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::channel::Outbox;
use crate::protocol::{OrchestratorMessage, Tagged, WorkerMessage};
use crate::unit::{WorkerHandle, WorkerUnit};

#[derive(Debug, Clone)]
pub struct EmoteStoreConfig {
    pub allowed_content_types: Vec<String>,
    pub max_upload_size_bytes: usize,
}

impl Default for EmoteStoreConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: SUPPORTED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_BYTES,
        }
    }
}

impl From<&Config> for EmoteStoreConfig {
    fn from(config: &Config) -> Self {
        Self {
            allowed_content_types: config.allowed_content_types().to_vec(),
            max_upload_size_bytes: config.max_upload_size_bytes(),
        }
    }
}

/// What the request layer knows about an upload
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub mime: String,
    pub owner: Uuid,
    /// Explicit name; falls back to the file stem
    pub name: Option<String>,
    pub filename: Option<String>,
    pub tags: Vec<String>,
}

impl CreateOptions {
    fn resolve_name(&self) -> Option<String> {
        self.name.clone().or_else(|| {
            self.filename
                .as_deref()
                .and_then(|f| Path::new(f).file_stem())
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
    }
}

pub struct EmoteStore {
    ctx: Arc<EmoteContext>,
    status: StatusBroadcast,
    config: EmoteStoreConfig,
}

impl EmoteStore {
    pub fn new(ctx: Arc<EmoteContext>, status: StatusBroadcast, config: EmoteStoreConfig) -> Self {
        Self {
            ctx,
            status,
            config,
        }
    }

    pub fn context(&self) -> &Arc<EmoteContext> {
        &self.ctx
    }

    pub fn status(&self) -> &StatusBroadcast {
        &self.status
    }

    pub fn config(&self) -> &EmoteStoreConfig {
        &self.config
    }

    pub async fn find_emote(&self, id: Uuid) -> Result<Emote, AppError> {
        self.ctx
            .emotes
            .find_by_id(id)
            .await?
            .map(|data| Emote::new(data, self.ctx.clone()))
            .ok_or_else(|| AppError::NotFound(format!("Unknown emote {}", id)))
    }

    /// Start ingesting an upload.
    ///
    /// Everything checkable up front is checked here. The emote is returned
    /// while still PROCESSING; progress and failures after this point only
    /// show up on the status broadcast.
    #[tracing::instrument(skip(self, stream, options), fields(owner_id = %options.owner, mime = %options.mime))]
    pub async fn create<S, E>(&self, stream: S, options: CreateOptions) -> Result<Emote, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let mime = options.mime.trim().to_ascii_lowercase();
        let accepted = self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&mime));
        if !accepted || validation::validate_mime(&mime).is_err() {
            return Err(AppError::UnsupportedMediaType(format!(
                "'{}' is not an accepted image type",
                options.mime
            )));
        }

        let name = options
            .resolve_name()
            .ok_or_else(|| AppError::InvalidInput("an emote name is required".to_string()))?;
        validation::validate_name(&name)?;
        validation::validate_tags(&options.tags)?;

        if self.ctx.users.find_by_id(options.owner).await?.is_none() {
            return Err(AppError::NotFound(format!("user {}", options.owner)));
        }

        let mut emote = Emote::synthesize(name, mime, options.owner, self.ctx.clone());
        emote.set_tags(options.tags);

        let (handle, port) =
            WorkerUnit::spawn(&emote, self.ctx.clone(), self.config.max_upload_size_bytes)?;
        let (outbox, inbox) = port.split();

        tokio::spawn(feed(emote.id(), stream, outbox));
        tokio::spawn(supervise(
            emote.clone(),
            handle,
            inbox,
            self.status.clone(),
        ));

        tracing::info!(emote_id = %emote.id(), name = %emote.data().name, "Emote upload accepted");
        Ok(emote)
    }
}

/// Forward the upload as ordered chunks followed by the end marker. A failing
/// stream ends without the marker, which the worker reports as an error.
async fn feed<S, E>(emote_id: Uuid, stream: S, outbox: Outbox<OrchestratorMessage>)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut stream = Box::pin(stream);
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                if let Err(e) = outbox.post(OrchestratorMessage::FileStreamChunk(bytes)) {
                    tracing::debug!(emote_id = %emote_id, error = %e, "Worker stopped accepting chunks");
                    return;
                }
                chunks += 1;
            }
            Err(e) => {
                tracing::warn!(emote_id = %emote_id, error = %e, "Upload stream failed");
                return;
            }
        }
    }

    if outbox.post(OrchestratorMessage::FileStreamEnd).is_ok() {
        tracing::debug!(emote_id = %emote_id, chunks, "Upload streamed to worker");
    }
}

/// Relay worker messages until a terminal one, then stop the worker.
///
/// Exactly one terminal update reaches the broadcast: `done` once the emote is
/// LIVE, or `error` for any failure, including a worker that vanished.
async fn supervise(
    mut emote: Emote,
    handle: WorkerHandle,
    mut inbox: UnboundedReceiver<WorkerMessage>,
    status: StatusBroadcast,
) {
    let id = emote.id();
    let mut final_update: Option<ProcessingUpdate> = None;

    loop {
        let Some(message) = inbox.recv().await else {
            tracing::error!(emote_id = %id, "Worker exited without reporting a result");
            status.publish(ProcessingUpdate::failed(
                id,
                "Processing stopped unexpectedly",
            ));
            break;
        };
        tracing::trace!(emote_id = %id, tag = message.tag(), "Worker message");

        match message {
            WorkerMessage::WriteDb => {
                if let Err(e) = emote.write().await {
                    report_failure(&status, id, &e);
                    break;
                }
            }
            WorkerMessage::ProcessingUpdate(update) if update.done => {
                // held back until the record is LIVE
                final_update = Some(update);
            }
            WorkerMessage::ProcessingUpdate(update) => status.publish(update),
            WorkerMessage::ProcessingComplete => {
                match emote.mark_live().await {
                    Ok(()) => {
                        tracing::info!(emote_id = %id, "Emote is live");
                        status.publish(final_update.take().unwrap_or_else(|| {
                            ProcessingUpdate::completed(
                                id,
                                TOTAL_PROCESSING_TASKS,
                                "Processing complete",
                            )
                        }));
                    }
                    Err(e) => report_failure(&status, id, &e),
                }
                break;
            }
            WorkerMessage::Error(message) => {
                tracing::warn!(emote_id = %id, error = %message, "Worker reported an error");
                status.publish(ProcessingUpdate::failed(id, message));
                break;
            }
        }
    }

    handle.terminate();
}

fn report_failure(status: &StatusBroadcast, id: Uuid, err: &AppError) {
    tracing::error!(emote_id = %id, error = %err.detailed_message(), "Failed to persist emote");
    status.publish(ProcessingUpdate::failed(id, err.client_message()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotes_core::{EmoteStatus, UserRank};
    use emotes_services::test_helpers::{harness, png, Harness};
    use emotes_services::StatusSubscription;
    use std::io;
    use std::time::Duration;

    fn store(h: &Harness) -> EmoteStore {
        EmoteStore::new(
            h.ctx.clone(),
            StatusBroadcast::new(64),
            EmoteStoreConfig::default(),
        )
    }

    fn chunked(data: Vec<u8>) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
        let chunks: Vec<Result<Bytes, io::Error>> = data
            .chunks(1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        futures::stream::iter(chunks)
    }

    fn options(owner: Uuid, mime: &str) -> CreateOptions {
        CreateOptions {
            mime: mime.to_string(),
            owner,
            name: None,
            filename: Some("forsenE.png".to_string()),
            tags: vec!["forsen".to_string()],
        }
    }

    async fn collect_until_terminal(sub: &mut StatusSubscription) -> Vec<ProcessingUpdate> {
        tokio::time::timeout(Duration::from_secs(30), async {
            let mut updates = Vec::new();
            while let Some(event) = sub.next().await {
                let terminal = event.is_terminal();
                updates.push(event.update().clone());
                if terminal {
                    break;
                }
            }
            updates
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_processes_upload_to_live() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();

        let emote = store
            .create(chunked(png(400, 200)), options(owner.id, "image/png"))
            .await
            .unwrap();
        assert_eq!(emote.status(), EmoteStatus::Processing);
        assert_eq!(emote.data().name, "forsenE");
        assert!(emote.data().private);

        let updates = collect_until_terminal(&mut all).await;

        let last = updates.last().unwrap();
        assert!(last.done);
        assert!(!last.error);
        assert_eq!(last.tasks, (13, 13));
        assert!(updates.iter().filter(|u| u.done).count() == 1);

        let stored = h.emotes.get(emote.id()).unwrap();
        assert_eq!(stored.status, EmoteStatus::Live);
        assert_eq!(stored.owner_name.as_deref(), Some("forsen"));
        assert_eq!(stored.tags, vec!["forsen".to_string()]);
        assert_eq!(h.storage.keys().len(), 4);
    }

    #[tokio::test]
    async fn test_every_update_reaches_the_bus() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();

        let emote = store
            .create(chunked(png(96, 32)), options(owner.id, "image/png"))
            .await
            .unwrap();

        let mut updates = Vec::new();
        tokio::time::timeout(Duration::from_secs(30), async {
            while let Some(event) = all.next().await {
                let update = event.update().clone();
                let finished = update.is_terminal();
                updates.push(update);
                if finished {
                    break;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(updates.len(), 13);
        assert!(updates.iter().all(|u| u.emote_id == emote.id()));
        for (i, update) in updates.iter().enumerate() {
            assert_eq!(update.tasks.0, i as u32 + 1);
        }
    }

    #[tokio::test]
    async fn test_garbage_upload_publishes_one_error() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();

        let emote = store
            .create(
                chunked(b"this is not a png".to_vec()),
                options(owner.id, "image/png"),
            )
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(30), all.next())
            .await
            .unwrap()
            .unwrap();
        assert!(first.update().error);
        assert_eq!(first.update().tasks, (0, 0));
        assert_eq!(first.update().emote_id, emote.id());

        let next = tokio::time::timeout(Duration::from_millis(200), all.next()).await;
        assert!(next.is_err(), "no update may follow the error");

        // written before processing failed, and left as is
        let stored = h.emotes.get(emote.id()).unwrap();
        assert_eq!(stored.status, EmoteStatus::Processing);
    }

    #[tokio::test]
    async fn test_broken_stream_publishes_one_error() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();

        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"\x89PNG\r\n")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ]);
        let emote = store
            .create(stream, options(owner.id, "image/png"))
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(10), all.next())
            .await
            .unwrap()
            .unwrap();
        assert!(first.update().error);
        assert!(h.emotes.get(emote.id()).is_none());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_terminal() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();
        h.emotes.fail_writes(true);

        store
            .create(chunked(png(96, 32)), options(owner.id, "image/png"))
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(10), all.next())
            .await
            .unwrap()
            .unwrap();
        assert!(first.update().error);
        assert_eq!(first.update().message, "Failed to access database");
        let next = tokio::time::timeout(Duration::from_millis(500), all.next()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_unsupported_mime() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);

        let err = store
            .create(chunked(vec![1, 2, 3]), options(owner.id, "video/mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn test_create_normalizes_mime_case() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();

        let emote = store
            .create(chunked(png(96, 32)), options(owner.id, " IMAGE/PNG"))
            .await
            .unwrap();
        assert_eq!(emote.data().mime, "image/png");

        let updates = collect_until_terminal(&mut all).await;
        let last = updates.last().unwrap();
        assert!(last.done && !last.error);
        for key in h.storage.keys() {
            assert_eq!(h.storage.get(&key).unwrap().content_type, "image/png");
        }
    }

    #[tokio::test]
    async fn test_create_rejects_allowed_but_unprocessable_mime() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = EmoteStore::new(
            h.ctx.clone(),
            StatusBroadcast::new(64),
            EmoteStoreConfig {
                allowed_content_types: vec!["image/png".into(), "image/bmp".into()],
                ..Default::default()
            },
        );

        let err = store
            .create(chunked(vec![1, 2, 3]), options(owner.id, "image/bmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn test_delete_while_processing_is_locked() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();
        let uploads = h.storage.hold_uploads().await;

        let emote = store
            .create(chunked(png(400, 200)), options(owner.id, "image/png"))
            .await
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(30), all.next())
            .await
            .unwrap()
            .unwrap();
        assert!(!first.is_terminal());

        let mut found = store.find_emote(emote.id()).await.unwrap();
        let err = found.delete().await.unwrap_err();
        assert!(matches!(err, AppError::Locked(_)));

        drop(uploads);
        let updates = collect_until_terminal(&mut all).await;
        assert!(updates.last().unwrap().done);
        assert_eq!(h.emotes.get(emote.id()).unwrap().status, EmoteStatus::Live);
        assert_eq!(h.storage.keys().len(), 4);
    }

    #[tokio::test]
    async fn test_record_removed_mid_processing_stays_gone() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);
        let mut all = store.status().subscribe_all();
        let uploads = h.storage.hold_uploads().await;

        let emote = store
            .create(chunked(png(400, 200)), options(owner.id, "image/png"))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(30), all.next())
            .await
            .unwrap()
            .unwrap();
        assert!(h.emotes.remove(emote.id()).is_some());

        drop(uploads);
        let updates = collect_until_terminal(&mut all).await;
        let last = updates.last().unwrap();
        assert!(last.error);
        assert!(!last.done);
        assert_eq!(updates.iter().filter(|u| u.is_terminal()).count(), 1);
        assert!(h.emotes.get(emote.id()).is_none());
        assert!(h.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_name_and_unknown_owner() {
        let h = harness();
        let owner = h.users.add_user("forsen", UserRank::Default);
        let store = store(&h);

        let mut bad_name = options(owner.id, "image/png");
        bad_name.name = Some("no spaces allowed".to_string());
        let err = store
            .create(chunked(png(8, 8)), bad_name)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = store
            .create(chunked(png(8, 8)), options(Uuid::new_v4(), "image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_emote() {
        let h = harness();
        let store = store(&h);
        let err = store.find_emote(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let data = emotes_core::EmoteData::new_processing("forsenE", "image/png", Uuid::new_v4());
        h.emotes.insert(data.clone());
        assert_eq!(store.find_emote(data.id).await.unwrap().resolve(), data);
    }

    #[test]
    fn test_name_falls_back_to_file_stem() {
        let mut opts = options(Uuid::nil(), "image/png");
        assert_eq!(opts.resolve_name().as_deref(), Some("forsenE"));
        opts.name = Some("forsenPls".into());
        assert_eq!(opts.resolve_name().as_deref(), Some("forsenPls"));
        opts.name = None;
        opts.filename = None;
        assert_eq!(opts.resolve_name(), None);
    }
}
