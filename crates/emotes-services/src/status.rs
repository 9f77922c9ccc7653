//! Status broadcast
//!
//! Every in-flight worker's progress goes through one multicast bus. A
//! subscription narrows it down to a single emote and stops after that
//! emote's terminal update.

use emotes_core::ProcessingUpdate;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StatusBroadcast {
    sender: broadcast::Sender<ProcessingUpdate>,
}

/// One update as seen by a per-emote subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Progress(ProcessingUpdate),
    Done(ProcessingUpdate),
    Failed(ProcessingUpdate),
}

impl StatusEvent {
    pub fn update(&self) -> &ProcessingUpdate {
        match self {
            StatusEvent::Progress(u) | StatusEvent::Done(u) | StatusEvent::Failed(u) => u,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusEvent::Progress(_))
    }
}

impl From<ProcessingUpdate> for StatusEvent {
    fn from(update: ProcessingUpdate) -> Self {
        if update.error {
            StatusEvent::Failed(update)
        } else if update.done {
            StatusEvent::Done(update)
        } else {
            StatusEvent::Progress(update)
        }
    }
}

impl StatusBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to every current subscriber. Updates nobody listens to are dropped.
    pub fn publish(&self, update: ProcessingUpdate) {
        let emote_id = update.emote_id;
        match self.sender.send(update) {
            Ok(receivers) => {
                tracing::trace!(emote_id = %emote_id, receivers, "Status update published")
            }
            Err(_) => tracing::trace!(emote_id = %emote_id, "Status update had no subscribers"),
        }
    }

    /// Updates for one emote, ending after its terminal update
    pub fn subscribe(&self, emote_id: Uuid) -> StatusSubscription {
        StatusSubscription {
            receiver: self.sender.subscribe(),
            emote_id: Some(emote_id),
            finished: false,
        }
    }

    /// Every update on the bus. Never ends on its own.
    pub fn subscribe_all(&self) -> StatusSubscription {
        StatusSubscription {
            receiver: self.sender.subscribe(),
            emote_id: None,
            finished: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct StatusSubscription {
    receiver: broadcast::Receiver<ProcessingUpdate>,
    emote_id: Option<Uuid>,
    finished: bool,
}

impl StatusSubscription {
    pub fn emote_id(&self) -> Option<Uuid> {
        self.emote_id
    }

    /// Next matching event, or `None` once the stream is over
    pub async fn next(&mut self) -> Option<StatusEvent> {
        if self.finished {
            return None;
        }

        loop {
            match self.receiver.recv().await {
                Ok(update) => {
                    if self.emote_id.is_some_and(|id| id != update.emote_id) {
                        continue;
                    }
                    let event = StatusEvent::from(update);
                    if self.emote_id.is_some() && event.is_terminal() {
                        self.finished = true;
                    }
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, emote_id = ?self.emote_id, "Status subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_emote() {
        let bus = StatusBroadcast::new(16);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut sub = bus.subscribe(a);

        bus.publish(ProcessingUpdate::progress(b, 1, 13, "Resized 4x"));
        bus.publish(ProcessingUpdate::progress(a, 1, 13, "Resized 4x"));

        let event = sub.next().await.unwrap();
        assert_eq!(event.update().emote_id, a);
        assert!(matches!(event, StatusEvent::Progress(_)));
    }

    #[tokio::test]
    async fn test_subscription_ends_after_done() {
        let bus = StatusBroadcast::new(16);
        let id = Uuid::new_v4();
        let mut sub = bus.subscribe(id);

        bus.publish(ProcessingUpdate::completed(id, 13, "Processing complete"));
        bus.publish(ProcessingUpdate::progress(id, 1, 13, "late"));

        assert!(matches!(sub.next().await, Some(StatusEvent::Done(_))));
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_ends_after_error() {
        let bus = StatusBroadcast::new(16);
        let id = Uuid::new_v4();
        let mut sub = bus.subscribe(id);

        bus.publish(ProcessingUpdate::failed(id, "decode failed"));

        let event = sub.next().await.unwrap();
        assert!(event.is_terminal());
        assert_eq!(event.update().tasks, (0, 0));
        assert!(matches!(event, StatusEvent::Failed(_)));
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_ahead() {
        let bus = StatusBroadcast::new(2);
        let id = Uuid::new_v4();
        let mut sub = bus.subscribe(id);

        for i in 1..=5 {
            bus.publish(ProcessingUpdate::progress(id, i, 13, "step"));
        }

        let event = sub.next().await.unwrap();
        assert_eq!(event.update().tasks, (4, 13));
    }

    #[tokio::test]
    async fn test_closed_bus_ends_subscription() {
        let bus = StatusBroadcast::new(4);
        let mut sub = bus.subscribe_all();
        drop(bus);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = StatusBroadcast::new(4);
        bus.publish(ProcessingUpdate::progress(Uuid::new_v4(), 1, 13, "x"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
