//! Data models for the emote pipeline

mod emote;
mod processing;
mod rendition;
mod user;

pub use emote::*;
pub use processing::*;
pub use rendition::*;
pub use user::*;
