//! Emotes Database Layer
//!
//! Record store capabilities for emotes and users, with Postgres
//! implementations.

pub mod emote;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod user;

pub use emote::{EmoteRepository, PgEmoteRepository};
pub use user::{PgUserRepository, UserRepository};
