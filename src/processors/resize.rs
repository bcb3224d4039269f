//! Resizing strategies for the different model inputs.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Gray value used to pad letterboxed detector inputs.
pub const LETTERBOX_FILL: u8 = 114;

/// How a letterboxed image maps back to the source frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale applied to the source image.
    pub ratio: f32,
    /// Horizontal padding on the left.
    pub pad_x: f32,
    /// Vertical padding on the top.
    pub pad_y: f32,
}

impl LetterboxInfo {
    /// Maps a point from letterboxed space back to the source frame.
    #[inline]
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.ratio, (y - self.pad_y) / self.ratio)
    }
}

/// Scales `img` to fit a `size x size` square keeping the aspect ratio and
/// centers it on a gray canvas.
pub fn letterbox(img: &RgbImage, size: u32) -> (RgbImage, LetterboxInfo) {
    let (w, h) = img.dimensions();
    let ratio = (size as f32 / w.max(1) as f32).min(size as f32 / h.max(1) as f32);
    let new_w = ((w as f32 * ratio).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * ratio).round() as u32).clamp(1, size);

    let dw = (size - new_w) as f32 / 2.0;
    let dh = (size - new_h) as f32 / 2.0;
    let left = (dw - 0.1).round().max(0.0) as u32;
    let top = (dh - 0.1).round().max(0.0) as u32;

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    let resized = if (new_w, new_h) == (w, h) {
        img.clone()
    } else {
        imageops::resize(img, new_w, new_h, FilterType::Triangle)
    };
    imageops::replace(&mut canvas, &resized, i64::from(left), i64::from(top));

    (
        canvas,
        LetterboxInfo {
            ratio,
            pad_x: left as f32,
            pad_y: top as f32,
        },
    )
}

/// Resize for DB text detection: the shortest side is raised to at least
/// `limit_side_len`, the longest side capped at `max_side_limit`, and both
/// dimensions rounded to a multiple of 32.
///
/// Returns the resized image and the `(ratio_h, ratio_w)` applied.
pub fn resize_for_detection(
    img: &RgbImage,
    limit_side_len: u32,
    max_side_limit: u32,
) -> (RgbImage, (f32, f32)) {
    let (w, h) = img.dimensions();
    let (wf, hf) = (w.max(1) as f32, h.max(1) as f32);

    let mut ratio = if wf.min(hf) < limit_side_len as f32 {
        limit_side_len as f32 / wf.min(hf)
    } else {
        1.0
    };
    if wf.max(hf) * ratio > max_side_limit as f32 {
        ratio = max_side_limit as f32 / wf.max(hf);
    }

    let resize_w = round_to_32(wf * ratio);
    let resize_h = round_to_32(hf * ratio);
    let resized = imageops::resize(img, resize_w, resize_h, FilterType::Triangle);
    (resized, (resize_h as f32 / hf, resize_w as f32 / wf))
}

fn round_to_32(value: f32) -> u32 {
    (((value / 32.0).round() as u32) * 32).max(32)
}

/// Resize a text line crop to `target_h`, keeping its aspect ratio.
///
/// The returned width never exceeds `max_w`; the caller pads to `max_w`.
pub fn resize_for_recognition(img: &RgbImage, target_h: u32, max_w: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let ratio = w.max(1) as f32 / h.max(1) as f32;
    let resized_w = ((target_h as f32 * ratio).ceil() as u32).clamp(1, max_w);
    imageops::resize(img, resized_w, target_h, FilterType::Triangle)
}

/// Width a recognition batch is padded to for a crop of the given aspect.
pub fn recognition_width(target_h: u32, base_w: u32, img_w: u32, img_h: u32) -> u32 {
    let ratio = img_w.max(1) as f32 / img_h.max(1) as f32;
    base_w.max((target_h as f32 * ratio) as u32)
}

/// Scales the longest side to `target` keeping the aspect ratio.
///
/// Returns the resized image and the scale applied.
pub fn resize_long_side(img: &RgbImage, target: u32) -> (RgbImage, f32) {
    let (w, h) = img.dimensions();
    let ratio = target as f32 / w.max(h).max(1) as f32;
    let new_w = ((w as f32 * ratio) as u32).clamp(1, target);
    let new_h = ((h as f32 * ratio) as u32).clamp(1, target);
    (
        imageops::resize(img, new_w, new_h, FilterType::Triangle),
        ratio,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_wide_image() {
        let img = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        let (boxed, info) = letterbox(&img, 64);

        assert_eq!(boxed.dimensions(), (64, 64));
        assert!((info.ratio - 0.32).abs() < 1e-6);
        assert_eq!(info.pad_x, 0.0);
        assert_eq!(info.pad_y, 16.0);
        assert_eq!(boxed.get_pixel(0, 0), &Rgb([LETTERBOX_FILL; 3]));
        assert_eq!(boxed.get_pixel(32, 32), &Rgb([0, 0, 0]));

        let (x, y) = info.unmap(32.0, 32.0);
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_detection_resize_rounds_to_32() {
        let img = RgbImage::new(100, 40);
        let (resized, (rh, rw)) = resize_for_detection(&img, 64, 4000);
        assert_eq!(resized.dimensions(), (160, 64));
        assert!((rh - 1.6).abs() < 1e-6);
        assert!((rw - 1.6).abs() < 1e-6);

        let big = RgbImage::new(8000, 100);
        let (resized, _) = resize_for_detection(&big, 64, 4000);
        assert_eq!(resized.width(), 4000);
    }

    #[test]
    fn test_recognition_resize() {
        let img = RgbImage::new(96, 24);
        let resized = resize_for_recognition(&img, 48, 320);
        assert_eq!(resized.dimensions(), (192, 48));
        assert_eq!(recognition_width(48, 320, 96, 24), 320);
        assert_eq!(recognition_width(48, 320, 480, 24), 960);
    }

    #[test]
    fn test_resize_long_side() {
        let img = RgbImage::new(976, 488);
        let (resized, ratio) = resize_long_side(&img, 488);
        assert_eq!(resized.dimensions(), (488, 244));
        assert_eq!(ratio, 0.5);
    }
}
