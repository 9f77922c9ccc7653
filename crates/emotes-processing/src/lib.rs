//! Emotes Processing Library
//!
//! CPU-bound image work: decoding, box-fit resizing and size optimization of
//! static and animated sources. Everything here is synchronous; callers run it
//! on a blocking pool.

pub mod error;
pub mod transform;
pub mod metadata;

pub use error::{ProcessingError, ProcessingResult};
pub use transform::{DecodedSource, ImageOptimizer, ImageResize};
pub use metadata::ImageMetadata;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
