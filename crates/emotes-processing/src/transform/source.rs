use std::io::Cursor;

use emotes_core::SourceKind;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat};

use super::resize::ImageResize;
use crate::{ImageMetadata, ProcessingError, ProcessingResult};

/// GIF encoder speed for freshly resized frames (1 = best palette, 30 = fastest)
const RESIZE_GIF_SPEED: i32 = 10;

/// Original upload decoded once, ready to be rendered at any size
pub enum DecodedSource {
    Static(DynamicImage),
    Animated(Vec<Frame>),
}

impl DecodedSource {
    pub fn decode(data: &[u8], kind: SourceKind) -> ProcessingResult<Self> {
        match kind {
            SourceKind::Static => image::load_from_memory(data)
                .map(DecodedSource::Static)
                .map_err(|e| ProcessingError::Decode(e.to_string())),
            SourceKind::Animated => {
                let decoder = GifDecoder::new(Cursor::new(data))
                    .map_err(|e| ProcessingError::Decode(e.to_string()))?;
                let frames = decoder
                    .into_frames()
                    .collect_frames()
                    .map_err(|e| ProcessingError::Decode(e.to_string()))?;
                if frames.is_empty() {
                    return Err(ProcessingError::EmptyAnimation);
                }
                Ok(DecodedSource::Animated(frames))
            }
        }
    }

    /// Native geometry. Animation frames are full-canvas, so the frame height
    /// is the per-frame height rather than the height of all frames stacked.
    pub fn metadata(&self) -> ProcessingResult<ImageMetadata> {
        let (kind, (width, height), frame_count) = match self {
            DecodedSource::Static(img) => (SourceKind::Static, (img.width(), img.height()), 1),
            DecodedSource::Animated(frames) => {
                let first = frames.first().ok_or(ProcessingError::EmptyAnimation)?;
                (
                    SourceKind::Animated,
                    first.buffer().dimensions(),
                    frames.len(),
                )
            }
        };

        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }

        Ok(ImageMetadata {
            width,
            height,
            frame_count,
            kind,
        })
    }

    /// Encode at exactly `width` x `height`: PNG for static sources, a looping
    /// GIF with the original frame count and delays for animated ones.
    pub fn render(&self, width: u32, height: u32) -> ProcessingResult<Vec<u8>> {
        match self {
            DecodedSource::Static(img) => {
                let resized = ImageResize::resize_image(img, width, height);
                let mut out = Vec::new();
                resized
                    .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
                    .map_err(|e| ProcessingError::Encode(e.to_string()))?;
                Ok(out)
            }
            DecodedSource::Animated(frames) => {
                let resized = frames.iter().map(|frame| {
                    let buffer = ImageResize::resize_frame(frame.buffer(), width, height);
                    Frame::from_parts(buffer, 0, 0, frame.delay())
                });
                encode_gif(resized, RESIZE_GIF_SPEED)
            }
        }
    }
}

pub(crate) fn encode_gif(
    frames: impl IntoIterator<Item = Frame>,
    speed: i32,
) -> ProcessingResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut out, speed);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        encoder
            .encode_frames(frames)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers as fixtures;

    #[test]
    fn test_static_source_metadata_and_render() {
        let source = DecodedSource::decode(&fixtures::png(400, 200), SourceKind::Static).unwrap();
        let meta = source.metadata().unwrap();
        assert_eq!((meta.width, meta.height, meta.frame_count), (400, 200, 1));
        assert!(!meta.is_animated());

        let (w, h) = ImageResize::fit_within(meta.width, meta.height, 384, 128);
        let png = source.render(w, h).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (256, 128));
    }

    #[test]
    fn test_animated_render_preserves_frame_count() {
        let source = DecodedSource::decode(&fixtures::gif(60, 20, 3), SourceKind::Animated).unwrap();
        let meta = source.metadata().unwrap();
        assert_eq!((meta.width, meta.height, meta.frame_count), (60, 20, 3));

        for b in emotes_core::constants::RENDITION_BOXES {
            let (w, h) = ImageResize::fit_within(meta.width, meta.height, b.width, b.height);
            let gif = source.render(w, h).unwrap();
            let rendered = DecodedSource::decode(&gif, SourceKind::Animated).unwrap();
            let rendered_meta = rendered.metadata().unwrap();
            assert_eq!(rendered_meta.frame_count, 3, "scope {}", b.scope);
            assert_eq!((rendered_meta.width, rendered_meta.height), (w, h));
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            DecodedSource::decode(b"not an image", SourceKind::Static),
            Err(ProcessingError::Decode(_))
        ));
        assert!(matches!(
            DecodedSource::decode(b"not an image", SourceKind::Animated),
            Err(ProcessingError::Decode(_))
        ));
    }
}
