//! Emote create, read, edit and delete

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use emotes_core::{AppError, EmoteData};
use emotes_services::{Emote, UpdateOptions, UpdateOutcome};
use emotes_worker::CreateOptions;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Optional JSON metadata sent as the `data` part of an upload
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateEmoteData {
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Multipart layout of an upload, for the API docs. `data`, when sent, must
/// precede `file`: the file is streamed to the worker as it arrives.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateEmoteForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub data: Option<CreateEmoteData>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EditEmoteResponse {
    pub emote: EmoteData,
    pub outcome: UpdateOutcome,
}

/// Sender half of the byte stream handed to [`EmoteStore::create`].
///
/// Dropping it before [`UploadFeed::finish`] aborts the upload, so the
/// worker never sees an end-of-stream for a request that failed midway.
///
/// [`EmoteStore::create`]: emotes_worker::EmoteStore::create
struct UploadFeed {
    sender: Option<mpsc::UnboundedSender<Result<Bytes, AppError>>>,
}

impl UploadFeed {
    fn channel() -> (Self, mpsc::UnboundedReceiver<Result<Bytes, AppError>>) {
        let (sender, receiver) = mpsc::unbounded();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    fn push(&self, chunk: Bytes) {
        if let Some(sender) = &self.sender {
            if sender.unbounded_send(Ok(chunk)).is_err() {
                tracing::debug!("Worker stopped reading the upload");
            }
        }
    }

    /// End the stream normally
    fn finish(mut self) {
        self.sender.take();
    }
}

impl Drop for UploadFeed {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.unbounded_send(Err(AppError::InvalidInput(
                "upload aborted".to_string(),
            )));
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/emotes",
    tag = "emotes",
    request_body(content = CreateEmoteForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Upload accepted, processing started", body = EmoteData),
        (status = 400, description = "Invalid name, tags or body, or `data` sent after `file`", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 415, description = "Unsupported image type", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(actor_id = %actor.id))]
pub async fn create_emote(
    Actor(actor): Actor,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let max_bytes = state.max_upload_bytes();
    let mut data = CreateEmoteData::default();
    let mut accepted: Option<(Emote, UploadFeed)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                if accepted.is_some() {
                    return Err(AppError::InvalidInput(
                        "only one 'file' part is allowed".to_string(),
                    )
                    .into());
                }
                let filename = field.file_name().map(str::to_string);
                let mime = field
                    .content_type()
                    .map(str::to_lowercase)
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let (feed, chunks) = UploadFeed::channel();
                let emote = state
                    .store
                    .create(
                        chunks,
                        CreateOptions {
                            mime,
                            owner: actor.id,
                            name: data.name.clone(),
                            filename,
                            tags: data.tags.clone(),
                        },
                    )
                    .await?;

                let mut size = 0usize;
                while let Some(chunk) = field.chunk().await? {
                    size += chunk.len();
                    if size > max_bytes {
                        return Err(AppError::PayloadTooLarge(format!(
                            "upload exceeds {} bytes",
                            max_bytes
                        ))
                        .into());
                    }
                    feed.push(chunk);
                }
                accepted = Some((emote, feed));
            }
            Some("data") => {
                if accepted.is_some() {
                    return Err(AppError::InvalidInput(
                        "the 'data' part must come before 'file'".to_string(),
                    )
                    .into());
                }
                let text = field.text().await?;
                data = serde_json::from_str(&text).map_err(AppError::from)?;
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    let (emote, feed) = accepted
        .ok_or_else(|| AppError::InvalidInput("a 'file' part is required".to_string()))?;
    feed.finish();

    Ok((StatusCode::CREATED, Json(emote.resolve())))
}

#[utoipa::path(
    get,
    path = "/v1/emotes/{id}",
    tag = "emotes",
    params(("id" = Uuid, Path, description = "Emote ID")),
    responses(
        (status = 200, description = "Emote", body = EmoteData),
        (status = 404, description = "Unknown emote", body = ErrorResponse)
    )
)]
pub async fn get_emote(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<EmoteData>, HttpAppError> {
    let emote = state.store.find_emote(id).await?;
    Ok(Json(emote.resolve()))
}

#[utoipa::path(
    patch,
    path = "/v1/emotes/{id}",
    tag = "emotes",
    params(("id" = Uuid, Path, description = "Emote ID")),
    request_body = UpdateOptions,
    responses(
        (status = 200, description = "Changes applied; skipped fields are listed", body = EditEmoteResponse),
        (status = 400, description = "No requested field was valid", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "No requested field may be changed by the caller", body = ErrorResponse),
        (status = 404, description = "Unknown emote", body = ErrorResponse),
        (status = 423, description = "Emote still processing", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(actor_id = %actor.id, emote_id = %id))]
pub async fn edit_emote(
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    ValidatedJson(options): ValidatedJson<UpdateOptions>,
) -> Result<Json<EditEmoteResponse>, HttpAppError> {
    let mut emote = state.store.find_emote(id).await?;
    let outcome = emote.update(options, &actor).await?;
    Ok(Json(EditEmoteResponse {
        emote: emote.resolve(),
        outcome,
    }))
}

#[utoipa::path(
    delete,
    path = "/v1/emotes/{id}",
    tag = "emotes",
    params(("id" = Uuid, Path, description = "Emote ID")),
    responses(
        (status = 204, description = "Emote and its renditions deleted"),
        (status = 403, description = "Not the owner or a moderator", body = ErrorResponse),
        (status = 404, description = "Unknown emote", body = ErrorResponse),
        (status = 423, description = "Emote still processing", body = ErrorResponse),
        (status = 502, description = "Storage cleanup failed; record kept", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(actor_id = %actor.id, emote_id = %id))]
pub async fn delete_emote(
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, HttpAppError> {
    let mut emote = state.store.find_emote(id).await?;
    emote.authorize_delete(&actor)?;
    emote.delete().await?;
    Ok(StatusCode::NO_CONTENT)
}
