//! Body of a worker unit.
//!
//! Receives the original upload chunk by chunk, writes it to the emote's
//! scratch directory, asks the orchestrator to persist the record, then runs
//! the transform pipeline and reports each step. Whatever goes wrong, the
//! orchestrator hears about it exactly once through an `Error` message.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use emotes_core::{AppError, ErrorMetadata};
use emotes_services::{Emote, EmoteContext};
use futures::FutureExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::channel::Port;
use crate::protocol::{OrchestratorMessage, Tagged, WorkerInit, WorkerMessage};

pub type WorkerPort = Port<WorkerMessage, OrchestratorMessage>;

/// Run one worker to completion or cancellation
pub async fn run_worker(
    init: WorkerInit,
    ctx: Arc<EmoteContext>,
    mut port: WorkerPort,
    cancel: CancellationToken,
) {
    let body = AssertUnwindSafe(process_upload(&init, ctx, &mut port)).catch_unwind();

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!("Worker cancelled");
            return;
        }
        result = body => result,
    };

    let failure = match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => {
            tracing::error!(error = %e.detailed_message(), "Worker failed");
            e.client_message()
        }
        Err(panic) => {
            let message = format!("worker panicked: {}", panic_message(panic.as_ref()));
            tracing::error!(error = %message, "Worker failed");
            message
        }
    };

    if let Err(e) = port.post(WorkerMessage::Error(failure)) {
        tracing::warn!(error = %e, "Orchestrator gone before the worker error was reported");
    }
}

#[tracing::instrument(skip_all, fields(emote_id = tracing::field::Empty))]
async fn process_upload(
    init: &WorkerInit,
    ctx: Arc<EmoteContext>,
    port: &mut WorkerPort,
) -> Result<(), AppError> {
    let emote = Emote::from_json(&init.emote_state, ctx)?;
    tracing::Span::current().record("emote_id", tracing::field::display(emote.id()));

    let validation = emote.validate();
    tracing::info!(emote = %emote, valid = validation.valid(), "Emote validated");
    if let Some(err) = validation.first_error() {
        return Err(err.clone().into());
    }

    emote.ensure_filepath().await?;
    let size = receive_original(&emote, port, init.max_upload_bytes).await?;
    tracing::info!(emote = %emote, size_bytes = size, "Original upload written to scratch");

    port.post(WorkerMessage::WriteDb)?;

    let outbox = port.outbox();
    emote
        .process(|update| {
            if let Err(e) = outbox.post(WorkerMessage::ProcessingUpdate(update)) {
                tracing::warn!(error = %e, "Progress update dropped");
            }
        })
        .await?;

    port.post(WorkerMessage::ProcessingComplete)?;
    tracing::info!(emote = %emote, "Emote processed");
    Ok(())
}

/// Write chunks to `<scratch>/<id>/og` until the end marker, then flush to disk
async fn receive_original(
    emote: &Emote,
    port: &mut WorkerPort,
    max_bytes: usize,
) -> Result<usize, AppError> {
    let mut file = tokio::fs::File::create(emote.original_path()).await?;
    let mut written = 0usize;

    loop {
        match port.recv().await {
            Some(OrchestratorMessage::FileStreamChunk(chunk)) => {
                written += chunk.len();
                if written > max_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "upload exceeds {} bytes",
                        max_bytes
                    )));
                }
                file.write_all(&chunk).await?;
            }
            Some(message @ OrchestratorMessage::FileStreamEnd) => {
                tracing::trace!(tag = message.tag(), "End of upload");
                break;
            }
            None => {
                return Err(AppError::WorkerFault(
                    "upload stream ended before it was complete".to_string(),
                ))
            }
        }
    }

    if written == 0 {
        return Err(AppError::InvalidInput("upload is empty".to_string()));
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
