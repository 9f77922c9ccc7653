use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, RgbaImage};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Largest size with the source's aspect ratio that fits in the box.
    ///
    /// `ratio = min(box_w / src_w, box_h / src_h)`, each side floored. The
    /// limiting side lands exactly on the box edge; both sides are at least 1.
    pub fn fit_within(src_width: u32, src_height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
        let (sw, sh) = (src_width.max(1) as u64, src_height.max(1) as u64);
        let (bw, bh) = (box_width as u64, box_height as u64);

        let (w, h) = if bw * sh <= bh * sw {
            (bw, sh * bw / sw)
        } else {
            (sw * bh / sh, bh)
        };

        (w.max(1) as u32, h.max(1) as u32)
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Resize one animation frame to exact dimensions
    pub fn resize_frame(frame: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        let (orig_width, orig_height) = frame.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        imageops::resize(frame, width, height, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotes_core::constants::RENDITION_BOXES;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_fit_within_wide_source_into_largest_box() {
        // ratio = min(384/400, 128/200) = 0.64
        assert_eq!(ImageResize::fit_within(400, 200, 384, 128), (256, 128));
    }

    #[test]
    fn test_fit_within_all_boxes_match_floor_formula() {
        let (sw, sh) = (400u32, 200u32);
        for b in RENDITION_BOXES {
            let ratio = (b.width as f64 / sw as f64).min(b.height as f64 / sh as f64);
            let expected_w = (sw as f64 * ratio).floor() as i64;
            let expected_h = (sh as f64 * ratio).floor() as i64;
            let (w, h) = ImageResize::fit_within(sw, sh, b.width, b.height);
            assert!((w as i64 - expected_w).abs() <= 1, "scope {} width", b.scope);
            assert!((h as i64 - expected_h).abs() <= 1, "scope {} height", b.scope);
        }
        assert_eq!(ImageResize::fit_within(400, 200, 228, 76), (152, 76));
        assert_eq!(ImageResize::fit_within(400, 200, 144, 48), (96, 48));
        assert_eq!(ImageResize::fit_within(400, 200, 96, 32), (64, 32));
    }

    #[test]
    fn test_fit_within_tall_source_is_height_limited() {
        assert_eq!(ImageResize::fit_within(100, 300, 384, 128), (42, 128));
    }

    #[test]
    fn test_fit_within_square_small_source_upscales() {
        assert_eq!(ImageResize::fit_within(32, 32, 96, 32), (32, 32));
        assert_eq!(ImageResize::fit_within(16, 16, 384, 128), (128, 128));
    }

    #[test]
    fn test_fit_within_never_returns_zero() {
        assert_eq!(ImageResize::fit_within(10_000, 1, 96, 32), (96, 1));
        assert_eq!(ImageResize::fit_within(0, 0, 96, 32), (32, 32));
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(
            ImageResize::select_filter(1000, 1000, 100, 100),
            FilterType::Triangle
        );
        assert_eq!(
            ImageResize::select_filter(175, 175, 100, 100),
            FilterType::CatmullRom
        );
        assert_eq!(
            ImageResize::select_filter(120, 120, 100, 100),
            FilterType::Lanczos3
        );
    }

    #[test]
    fn test_resize_frame_dimensions() {
        let frame = RgbaImage::from_pixel(40, 20, Rgba([1, 2, 3, 255]));
        let resized = ImageResize::resize_frame(&frame, 20, 10);
        assert_eq!(resized.dimensions(), (20, 10));
    }
}
