//! Image normalization into NCHW input tensors.

use crate::core::errors::{VesselError, VesselResult};
use crate::core::inference::Tensor4D;
use image::RgbImage;

/// Color channel order expected by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    #[default]
    RGB,
    BGR,
}

/// Normalizes images for model input.
///
/// Each output value is `pixel * alpha[c] + beta[c]`, with
/// `alpha = scale / std` and `beta = -mean / std` in the output channel order.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    pub beta: [f32; 3],
    /// Color channel order (RGB or BGR)
    pub color_order: ColorOrder,
}

impl NormalizeImage {
    /// Creates a normalizer; `mean` and `std` are given in the output channel order.
    ///
    /// # Errors
    ///
    /// Returns an error if `scale` or any std value is not positive.
    pub fn new(
        scale: f32,
        mean: [f32; 3],
        std: [f32; 3],
        color_order: ColorOrder,
    ) -> VesselResult<Self> {
        if scale <= 0.0 {
            return Err(VesselError::ConfigError {
                message: "Scale must be greater than 0".to_string(),
            });
        }
        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(VesselError::ConfigError {
                    message: format!(
                        "Standard deviation at index {i} must be greater than 0, got {s}"
                    ),
                });
            }
        }

        let alpha = [scale / std[0], scale / std[1], scale / std[2]];
        let beta = [-mean[0] / std[0], -mean[1] / std[1], -mean[2] / std[2]];
        Ok(Self {
            alpha,
            beta,
            color_order,
        })
    }

    /// Plain `[0, 1]` scaling in RGB order, as ultralytics exports expect.
    pub fn unit_rgb() -> VesselResult<Self> {
        Self::new(1.0 / 255.0, [0.0; 3], [1.0; 3], ColorOrder::RGB)
    }

    /// ImageNet statistics for BGR-input detectors (PP-OCR DB).
    pub fn imagenet_bgr() -> VesselResult<Self> {
        Self::new(
            1.0 / 255.0,
            [0.406, 0.456, 0.485],
            [0.225, 0.224, 0.229],
            ColorOrder::BGR,
        )
    }

    /// `[-1, 1]` scaling in BGR order for CRNN recognizers.
    pub fn for_ocr_recognition() -> VesselResult<Self> {
        Self::new(2.0 / 255.0, [1.0; 3], [1.0; 3], ColorOrder::BGR)
    }

    /// Normalizes one image into a `[1, 3, h, w]` tensor.
    pub fn normalize_to(&self, img: &RgbImage) -> VesselResult<Tensor4D> {
        let (width, height) = img.dimensions();
        self.normalize_padded(img, height, width)
    }

    /// Normalizes one image into the top-left corner of a zero-filled
    /// `[1, 3, target_h, target_w]` tensor.
    pub fn normalize_padded(
        &self,
        img: &RgbImage,
        target_h: u32,
        target_w: u32,
    ) -> VesselResult<Tensor4D> {
        let (width, height) = img.dimensions();
        if width > target_w || height > target_h {
            return Err(VesselError::InvalidInput {
                message: format!(
                    "image {width}x{height} does not fit into a {target_w}x{target_h} tensor"
                ),
            });
        }

        let mut tensor = Tensor4D::zeros((1, 3, target_h as usize, target_w as usize));
        for (x, y, pixel) in img.enumerate_pixels() {
            for c in 0..3 {
                let src_c = match self.color_order {
                    ColorOrder::RGB => c,
                    ColorOrder::BGR => 2 - c,
                };
                tensor[[0, c, y as usize, x as usize]] =
                    f32::from(pixel[src_c]) * self.alpha[c] + self.beta[c];
            }
        }
        Ok(tensor)
    }
}
