use std::io::Cursor;

use color_quant::NeuQuant;
use emotes_core::SourceKind;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, Frame, ImageEncoder, RgbaImage};

use super::source::{encode_gif, DecodedSource};
use crate::{ProcessingError, ProcessingResult};

/// NeuQuant sampling factor (1 = best, 30 = fastest)
const QUANT_SAMPLE_FACTOR: i32 = 10;
const PALETTE_SIZE: usize = 256;
/// GIF encoder speed used when re-encoding for size
const OPTIMIZE_GIF_SPEED: i32 = 1;

/// Size optimization of encoded renditions
pub struct ImageOptimizer;

impl ImageOptimizer {
    /// Optimize an encoded rendition. The smaller of input and output is returned.
    pub fn optimize(data: &[u8], kind: SourceKind) -> ProcessingResult<Vec<u8>> {
        let optimized = match kind {
            SourceKind::Static => Self::optimize_png(data)?,
            SourceKind::Animated => Self::optimize_gif(data)?,
        };

        tracing::debug!(
            before_bytes = data.len(),
            after_bytes = optimized.len(),
            kind = ?kind,
            "Rendition optimized"
        );

        if optimized.len() < data.len() {
            Ok(optimized)
        } else {
            Ok(data.to_vec())
        }
    }

    /// Quantize to a 256 color palette and re-encode with maximum compression
    pub fn optimize_png(data: &[u8]) -> ProcessingResult<Vec<u8>> {
        let img = image::load_from_memory(data)
            .map_err(|e| ProcessingError::Decode(e.to_string()))?
            .to_rgba8();
        let quantized = quantize(img);

        let mut out = Vec::new();
        PngEncoder::new_with_quality(
            Cursor::new(&mut out),
            CompressionType::Best,
            FilterType::Adaptive,
        )
        .write_image(
            quantized.as_raw(),
            quantized.width(),
            quantized.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        Ok(out)
    }

    /// Re-encode every frame with the slowest, highest quality palette search
    pub fn optimize_gif(data: &[u8]) -> ProcessingResult<Vec<u8>> {
        let frames = match DecodedSource::decode(data, SourceKind::Animated)? {
            DecodedSource::Animated(frames) => frames,
            DecodedSource::Static(_) => return Err(ProcessingError::EmptyAnimation),
        };

        let frames = frames.into_iter().map(|frame| {
            let delay = frame.delay();
            Frame::from_parts(frame.into_buffer(), 0, 0, delay)
        });
        encode_gif(frames, OPTIMIZE_GIF_SPEED)
    }
}

fn quantize(mut img: RgbaImage) -> RgbaImage {
    let quant = NeuQuant::new(QUANT_SAMPLE_FACTOR, PALETTE_SIZE, img.as_raw());
    let palette = quant.color_map_rgba();

    for pixel in img.pixels_mut() {
        let index = quant.index_of(&pixel.0) * 4;
        if let Some(color) = palette.get(index..index + 4) {
            pixel.0.copy_from_slice(color);
        }
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers as fixtures;

    #[test]
    fn test_optimize_png_keeps_dimensions() {
        let input = fixtures::png(256, 128);
        let output = ImageOptimizer::optimize(&input, SourceKind::Static).unwrap();
        assert!(output.len() <= input.len());
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (256, 128));
    }

    #[test]
    fn test_optimize_gif_keeps_frames() {
        let input = fixtures::gif(96, 32, 3);
        let output = ImageOptimizer::optimize(&input, SourceKind::Animated).unwrap();
        assert!(output.len() <= input.len());
        let decoded = DecodedSource::decode(&output, SourceKind::Animated).unwrap();
        assert_eq!(decoded.metadata().unwrap().frame_count, 3);
    }

    #[test]
    fn test_quantize_limits_palette() {
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            image::Rgba([(x * 4) as u8, (y * 4) as u8, ((x * y) % 256) as u8, 255])
        });
        let quantized = quantize(img);
        let colors: std::collections::HashSet<[u8; 4]> =
            quantized.pixels().map(|p| p.0).collect();
        assert!(colors.len() <= PALETTE_SIZE);
    }

    #[test]
    fn test_optimize_rejects_garbage() {
        assert!(ImageOptimizer::optimize(b"nope", SourceKind::Static).is_err());
    }
}
