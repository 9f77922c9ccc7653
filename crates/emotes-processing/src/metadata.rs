use emotes_core::SourceKind;

/// Native geometry of a decoded source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    /// Height of a single frame
    pub height: u32,
    pub frame_count: usize,
    pub kind: SourceKind,
}

impl ImageMetadata {
    pub fn is_animated(&self) -> bool {
        self.kind == SourceKind::Animated
    }
}
