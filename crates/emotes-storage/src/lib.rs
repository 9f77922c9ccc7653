//! Emotes Storage Library
//!
//! Object storage abstraction for published renditions, with S3 and local
//! filesystem backends.
//!
//! # Storage key format
//!
//! Every object belonging to an emote lives under one prefix:
//!
//! - **Production**: `emote/{emote_id}/{scope}x`
//! - **Other environments**: `dev/emote/{emote_id}/{scope}x`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

pub use emotes_core::StorageBackend;
pub use factory::{create_storage, StorageTarget};
pub use keys::{emote_prefix, rendition_key, KeyScheme};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
