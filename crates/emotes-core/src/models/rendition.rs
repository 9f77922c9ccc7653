use std::path::PathBuf;

/// Fixed bounding box for one rendition scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionBox {
    pub scope: u8,
    pub width: u32,
    pub height: u32,
}

impl RenditionBox {
    pub const fn new(scope: u8, width: u32, height: u32) -> Self {
        Self {
            scope,
            width,
            height,
        }
    }
}

/// Resized file waiting in scratch storage to be optimized and uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub scope: u8,
    pub extension: &'static str,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Rendition {
    /// File name used in scratch storage, e.g. `4x.png`
    pub fn file_name(scope: u8, extension: &str) -> String {
        format!("{}x.{}", scope, extension)
    }
}
