//! Emote workers
//!
//! One worker unit runs per upload. The orchestrator ([`EmoteStore`]) streams
//! the upload to it over a tagged duplex channel and relays what it reports
//! back: persistence requests, progress, completion or a single error.

pub mod channel;
pub mod processor;
pub mod protocol;
pub mod store;
pub mod unit;

pub use channel::{duplex, ChannelClosed, Outbox, Port};
pub use protocol::{OrchestratorMessage, Tagged, WorkerInit, WorkerMessage};
pub use store::{CreateOptions, EmoteStore, EmoteStoreConfig};
pub use unit::{WorkerHandle, WorkerUnit};
