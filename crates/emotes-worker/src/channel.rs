//! Ordered duplex channel between two parties.
//!
//! Each side holds a [`Port`] that sends one message type and receives the
//! other. Messages arrive in the order they were posted.

use emotes_core::AppError;
use tokio::sync::mpsc;

use crate::protocol::Tagged;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("channel closed while posting {tag}")]
pub struct ChannelClosed {
    pub tag: &'static str,
}

impl From<ChannelClosed> for AppError {
    fn from(err: ChannelClosed) -> Self {
        AppError::WorkerFault(err.to_string())
    }
}

/// Sending half. Cheap to clone.
#[derive(Debug)]
pub struct Outbox<S> {
    sender: mpsc::UnboundedSender<S>,
}

impl<S> Clone for Outbox<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: Tagged> Outbox<S> {
    pub fn post(&self, message: S) -> Result<(), ChannelClosed> {
        let tag = message.tag();
        self.sender.send(message).map_err(|_| ChannelClosed { tag })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// One end of a duplex channel: posts `S`, receives `R`
#[derive(Debug)]
pub struct Port<S, R> {
    outbox: Outbox<S>,
    inbox: mpsc::UnboundedReceiver<R>,
}

impl<S: Tagged, R> Port<S, R> {
    pub fn post(&self, message: S) -> Result<(), ChannelClosed> {
        self.outbox.post(message)
    }

    /// Next message, or `None` once the other side has dropped its outbox
    pub async fn recv(&mut self) -> Option<R> {
        self.inbox.recv().await
    }

    pub fn outbox(&self) -> Outbox<S> {
        self.outbox.clone()
    }

    pub fn split(self) -> (Outbox<S>, mpsc::UnboundedReceiver<R>) {
        (self.outbox, self.inbox)
    }
}

/// Connected pair of ports
pub fn duplex<A, B>() -> (Port<A, B>, Port<B, A>) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        Port {
            outbox: Outbox { sender: a_tx },
            inbox: b_rx,
        },
        Port {
            outbox: Outbox { sender: b_tx },
            inbox: a_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{OrchestratorMessage, WorkerMessage};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_messages_arrive_in_send_order() {
        let (orchestrator, mut worker) = duplex::<OrchestratorMessage, WorkerMessage>();

        for chunk in [&b"ab"[..], b"cd", b"ef"] {
            orchestrator
                .post(OrchestratorMessage::FileStreamChunk(Bytes::copy_from_slice(chunk)))
                .unwrap();
        }
        orchestrator.post(OrchestratorMessage::FileStreamEnd).unwrap();

        let mut received = Vec::new();
        while let Some(OrchestratorMessage::FileStreamChunk(bytes)) = worker.recv().await {
            received.extend_from_slice(&bytes);
        }
        assert_eq!(received, b"abcdef");
    }

    #[tokio::test]
    async fn test_post_after_peer_dropped_fails() {
        let (orchestrator, worker) = duplex::<OrchestratorMessage, WorkerMessage>();
        drop(worker);

        let err = orchestrator
            .post(OrchestratorMessage::FileStreamEnd)
            .unwrap_err();
        assert_eq!(err.tag, "FileStreamEnd");
        assert!(orchestrator.outbox().is_closed());
    }

    #[tokio::test]
    async fn test_recv_ends_when_peer_outbox_dropped() {
        let (orchestrator, worker) = duplex::<OrchestratorMessage, WorkerMessage>();
        let (_outbox, mut inbox) = orchestrator.split();
        worker.post(WorkerMessage::WriteDb).unwrap();
        drop(worker);

        assert_eq!(inbox.recv().await, Some(WorkerMessage::WriteDb));
        assert_eq!(inbox.recv().await, None);
    }
}
