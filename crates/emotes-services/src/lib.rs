//! Emotes Services Library
//!
//! The Emote entity with its transform pipeline and business rules, and the
//! status broadcast that fans processing progress out to subscribers.

pub mod context;
pub mod emote;
pub mod status;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use context::EmoteContext;
pub use emote::{Emote, EmoteValidation, ResizeSequence, UpdateOptions, UpdateOutcome};
pub use status::{StatusBroadcast, StatusEvent, StatusSubscription};
