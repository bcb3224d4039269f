//! Bounding box based image cropping.

use crate::core::errors::ImageProcessError;
use crate::processors::BoundingBox;
use image::{ImageFormat, RgbImage, imageops};
use std::io::Cursor;

/// Crops `bbox` out of `image` after clipping it to the image bounds.
///
/// A box that is empty after clipping yields a 0x0 image; callers decide
/// whether that is an error.
pub fn crop_region(image: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    let clipped = bbox.clip(image.width(), image.height());
    if clipped.is_empty() {
        return RgbImage::new(0, 0);
    }
    imageops::crop_imm(
        image,
        clipped.x1() as u32,
        clipped.y1() as u32,
        clipped.width() as u32,
        clipped.height() as u32,
    )
    .to_image()
}

/// Encodes an image as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ImageProcessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageProcessError::EmptyCrop {
            x1: 0,
            y1: 0,
            x2: image.width() as i32,
            y2: image.height() as i32,
        });
    }
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(ImageProcessError::Encode)?;
    Ok(bytes.into_inner())
}
