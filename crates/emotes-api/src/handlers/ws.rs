//! Processing status stream over WebSocket.
//!
//! The client names one emote; the server forwards that emote's updates and
//! closes the socket after the terminal one: 1000 once it is live, 1011 with
//! the failure message otherwise.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use emotes_core::ProcessingUpdate;
use emotes_services::{StatusBroadcast, StatusEvent};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

pub const STATUS_MESSAGE_TYPE: &str = "CreateEmote:Status";

/// Close reasons are capped at 123 bytes by the protocol
const MAX_CLOSE_REASON: usize = 123;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "CreateEmote:Status")]
    CreateEmoteStatus {
        #[serde(rename = "emoteId")]
        emote_id: Uuid,
    },
}

#[derive(Debug, Serialize)]
pub struct StatusFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub done: bool,
    pub payload: &'a ProcessingUpdate,
}

fn close(code: u16, reason: &str) -> Message {
    let mut end = reason.len().min(MAX_CLOSE_REASON);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    Message::Close(Some(CloseFrame {
        code,
        reason: reason[..end].to_string().into(),
    }))
}

/// Messages to send for one event; terminal events are followed by a close frame
pub fn frames_for(event: &StatusEvent) -> Result<Vec<Message>, serde_json::Error> {
    let update = event.update();
    let frame = serde_json::to_string(&StatusFrame {
        kind: STATUS_MESSAGE_TYPE,
        done: update.done,
        payload: update,
    })?;

    let mut frames = vec![Message::Text(frame.into())];
    match event {
        StatusEvent::Progress(_) => {}
        StatusEvent::Done(_) => frames.push(close(close_code::NORMAL, "Processing complete")),
        StatusEvent::Failed(update) => frames.push(close(close_code::ERROR, &update.message)),
    }
    Ok(frames)
}

#[utoipa::path(
    get,
    path = "/v1/ws",
    tag = "status",
    responses(
        (status = 101, description = "Switching to the status stream")
    )
)]
pub async fn status_stream(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let status = state.store.status().clone();
    ws.on_upgrade(move |socket| handle_socket(socket, status))
}

async fn handle_socket(socket: WebSocket, status: StatusBroadcast) {
    let (mut sender, mut receiver) = socket.split();

    let emote_id = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(ClientMessage::CreateEmoteStatus { emote_id }) => break emote_id,
                Err(e) => {
                    tracing::debug!(error = %e, "Malformed status request");
                    let _ = sender
                        .send(close(close_code::UNSUPPORTED, "Malformed message"))
                        .await;
                    return;
                }
            },
            Some(Ok(Message::Binary(_))) => {
                let _ = sender
                    .send(close(close_code::UNSUPPORTED, "Expected a text message"))
                    .await;
                return;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
        }
    };

    let mut subscription = status.subscribe(emote_id);
    tracing::debug!(emote_id = %emote_id, "Status stream subscribed");

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else {
                    let _ = sender.send(close(close_code::AWAY, "Status stream closed")).await;
                    return;
                };
                let frames = match frames_for(&event) {
                    Ok(frames) => frames,
                    Err(e) => {
                        tracing::error!(emote_id = %emote_id, error = %e, "Failed to encode status frame");
                        let _ = sender.send(close(close_code::ERROR, "Internal error")).await;
                        return;
                    }
                };
                for frame in frames {
                    if sender.send(frame).await.is_err() {
                        tracing::debug!(emote_id = %emote_id, "Status client went away");
                        return;
                    }
                }
                if event.is_terminal() {
                    return;
                }
            }
            incoming = receiver.next() => {
                if matches!(incoming, Some(Ok(Message::Close(_))) | Some(Err(_)) | None) {
                    tracing::debug!(emote_id = %emote_id, "Status client disconnected");
                    return;
                }
            }
        }
    }
}
