use std::sync::Arc;

use emotes_services::{Emote, EmoteContext};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::channel::{duplex, Port};
use crate::processor::run_worker;
use crate::protocol::{OrchestratorMessage, WorkerInit, WorkerMessage};

pub type OrchestratorPort = Port<OrchestratorMessage, WorkerMessage>;

/// Spawns isolated workers, one per upload
pub struct WorkerUnit;

impl WorkerUnit {
    /// Start a worker for `emote` and return its handle plus the
    /// orchestrator's end of the channel
    pub fn spawn(
        emote: &Emote,
        ctx: Arc<EmoteContext>,
        max_upload_bytes: usize,
    ) -> Result<(WorkerHandle, OrchestratorPort), emotes_core::AppError> {
        let init = WorkerInit {
            emote_state: emote.to_json()?,
            max_upload_bytes,
        };
        let (orchestrator, worker) = duplex::<OrchestratorMessage, WorkerMessage>();
        let cancel = CancellationToken::new();
        let join = tokio::spawn(run_worker(init, ctx, worker, cancel.clone()));

        tracing::debug!(emote_id = %emote.id(), "Worker spawned");

        Ok((
            WorkerHandle {
                emote_id: emote.id(),
                cancel,
                join,
            },
            orchestrator,
        ))
    }
}

/// Control over a running worker
#[derive(Debug)]
pub struct WorkerHandle {
    emote_id: Uuid,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn emote_id(&self) -> Uuid {
        self.emote_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the worker. A no-op for one that already exited.
    pub fn terminate(&self) {
        if !self.join.is_finished() {
            tracing::debug!(emote_id = %self.emote_id, "Terminating worker");
        }
        self.cancel.cancel();
        self.join.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotes_services::test_helpers::harness;

    #[tokio::test]
    async fn test_terminate_stops_waiting_worker() {
        let h = harness();
        let emote = Emote::synthesize("forsenE", "image/png", Uuid::new_v4(), h.ctx.clone());
        let (handle, port) = WorkerUnit::spawn(&emote, h.ctx.clone(), 1024).unwrap();
        assert_eq!(handle.emote_id(), emote.id());

        handle.terminate();
        let (_outbox, mut inbox) = port.split();
        assert!(inbox.recv().await.is_none());
    }
}
