//! Utility functions: image loading, cropping, annotation and logging setup.

pub mod bbox_crop;
pub mod visualization;

pub use bbox_crop::{crop_region, encode_png};
pub use visualization::PageAnnotator;

use crate::core::errors::VesselResult;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

/// Initializes the tracing subscriber for logging.
///
/// The filter is read from `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Loads an image file as RGB, applying its EXIF orientation.
pub fn load_image(path: impl AsRef<Path>) -> VesselResult<RgbImage> {
    let reader = ImageReader::open(path.as_ref())?;
    decode_oriented(reader)
}

/// Decodes an in-memory image as RGB, applying its EXIF orientation.
pub fn load_image_from_bytes(bytes: &[u8]) -> VesselResult<RgbImage> {
    decode_oriented(ImageReader::new(Cursor::new(bytes)))
}

fn decode_oriented<R: BufRead + Seek>(reader: ImageReader<R>) -> VesselResult<RgbImage> {
    let mut decoder = reader.with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_load_image_from_png_bytes() {
        let mut page = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        page.put_pixel(3, 1, Rgb([0, 0, 0]));
        let png = encode_png(&page).unwrap();

        let loaded = load_image_from_bytes(&png).unwrap();
        assert_eq!(loaded.dimensions(), (4, 2));
        assert_eq!(loaded.get_pixel(3, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_load_image_rejects_garbage() {
        assert!(load_image_from_bytes(b"not an image").is_err());
        assert!(load_image("/nonexistent/page.png").is_err());
    }
}
