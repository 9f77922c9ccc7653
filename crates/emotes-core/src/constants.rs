//! Pipeline constants

use crate::models::RenditionBox;

/// Target boxes, most detailed first
pub const RENDITION_BOXES: [RenditionBox; 4] = [
    RenditionBox::new(4, 384, 128),
    RenditionBox::new(3, 228, 76),
    RenditionBox::new(2, 144, 48),
    RenditionBox::new(1, 96, 32),
];

/// Resize, optimize and upload per rendition plus the completion marker
pub const TOTAL_PROCESSING_TASKS: u32 = RENDITION_BOXES.len() as u32 * 3 + 1;

/// Raster formats accepted for upload
pub const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/gif", "image/jpeg", "image/webp"];

/// Scratch file holding the untouched upload
pub const ORIGINAL_FILE_NAME: &str = "og";

/// Object key segment between the environment prefix and the emote id
pub const EMOTE_KEY_SEGMENT: &str = "emote";

/// Default upload limit (2.5 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE_BYTES: usize = 2_621_440;
