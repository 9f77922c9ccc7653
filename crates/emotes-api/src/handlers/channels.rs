//! Channel emote sets

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use emotes_core::{AppError, User};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Path alias for the authenticated user's own channel
pub const SELF_CHANNEL: &str = "@me";

/// Resolve the `{user}` path segment and check the actor may edit that channel
async fn channel_for(state: &AppState, actor: User, user: &str) -> Result<User, AppError> {
    let channel = if user == SELF_CHANNEL {
        actor.clone()
    } else {
        let id = Uuid::parse_str(user)?;
        state
            .users()
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unknown user {}", id)))?
    };

    if channel.id != actor.id && !actor.is_moderator() {
        return Err(AppError::Forbidden(
            "only the channel owner or a moderator can change its emotes".to_string(),
        ));
    }
    Ok(channel)
}

#[utoipa::path(
    put,
    path = "/v1/channels/{user}/emotes/{emote}",
    tag = "channels",
    params(
        ("user" = String, Path, description = "User ID or @me"),
        ("emote" = Uuid, Path, description = "Emote ID")
    ),
    responses(
        (status = 200, description = "Emote enabled in the channel", body = User),
        (status = 403, description = "Not allowed, or the emote is global", body = ErrorResponse),
        (status = 404, description = "Unknown user or emote", body = ErrorResponse),
        (status = 423, description = "Emote still processing", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(actor_id = %actor.id, channel = %user, emote_id = %emote_id))]
pub async fn add_channel_emote(
    Actor(actor): Actor,
    Path((user, emote_id)): Path<(String, Uuid)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<User>, HttpAppError> {
    let channel = channel_for(&state, actor, &user).await?;
    let emote = state.store.find_emote(emote_id).await?;
    let channel = emote.add_to_channel(&channel).await?;
    Ok(Json(channel))
}

#[utoipa::path(
    delete,
    path = "/v1/channels/{user}/emotes/{emote}",
    tag = "channels",
    params(
        ("user" = String, Path, description = "User ID or @me"),
        ("emote" = Uuid, Path, description = "Emote ID")
    ),
    responses(
        (status = 200, description = "Emote removed from the channel", body = User),
        (status = 403, description = "Not allowed, or the emote is global", body = ErrorResponse),
        (status = 404, description = "Unknown user or emote", body = ErrorResponse),
        (status = 423, description = "Emote still processing", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(actor_id = %actor.id, channel = %user, emote_id = %emote_id))]
pub async fn remove_channel_emote(
    Actor(actor): Actor,
    Path((user, emote_id)): Path<(String, Uuid)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<User>, HttpAppError> {
    let channel = channel_for(&state, actor, &user).await?;
    let emote = state.store.find_emote(emote_id).await?;
    let channel = emote.remove_from_channel(&channel).await?;
    Ok(Json(channel))
}
