//! Emotes Core Library
//!
//! Domain models, error types, configuration and validation rules shared by
//! every emotes crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

pub use config::{BaseConfig, Config, EmoteServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    EmoteData, EmotePatch, EmoteStatus, ProcessingUpdate, Rendition, RenditionBox, SourceKind,
    User, UserRank,
};
pub use storage_types::StorageBackend;
