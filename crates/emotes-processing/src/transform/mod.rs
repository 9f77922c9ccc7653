mod optimize;
mod resize;
mod source;

pub use optimize::ImageOptimizer;
pub use resize::ImageResize;
pub use source::DecodedSource;
