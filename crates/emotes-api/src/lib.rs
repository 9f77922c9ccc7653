//! Emotes API
//!
//! HTTP and WebSocket surface over the emote store.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
