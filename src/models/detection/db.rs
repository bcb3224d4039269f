//! DB text detection model (PP-OCR export).

use crate::core::config::TextEngineConfig;
use crate::core::errors::{VesselError, VesselResult};
use crate::core::inference::{OrtInfer, Tensor4D};
use crate::processors::resize::resize_for_detection;
use crate::processors::{BoundingBox, DBPostProcess, NormalizeImage};
use image::RgbImage;
use ndarray::{Axis, Ix4};

/// Longest side the detector input is allowed to reach.
const MAX_SIDE_LIMIT: u32 = 4000;

/// DB (Differentiable Binarization) text line detector.
#[derive(Debug)]
pub struct DbTextDetector {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    postprocess: DBPostProcess,
    limit_side_len: u32,
}

impl DbTextDetector {
    pub fn new(inference: OrtInfer, config: &TextEngineConfig) -> VesselResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::imagenet_bgr()?,
            postprocess: DBPostProcess::new(
                Some(config.det_threshold),
                Some(config.det_box_threshold),
                Some(config.det_unclip_ratio),
            ),
            limit_side_len: config.det_limit_side_len,
        })
    }

    /// Resizes and normalizes; returns the tensor and `(ratio_h, ratio_w)`.
    pub fn preprocess(&self, image: &RgbImage) -> VesselResult<(Tensor4D, (f32, f32))> {
        let (resized, ratios) = resize_for_detection(image, self.limit_side_len, MAX_SIDE_LIMIT);
        Ok((self.normalizer.normalize_to(&resized)?, ratios))
    }

    /// Detects text lines; boxes are in `image` coordinates with their scores.
    pub fn forward(&self, image: &RgbImage) -> VesselResult<Vec<(BoundingBox, f32)>> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(Vec::new());
        }

        let (tensor, (ratio_h, ratio_w)) = self.preprocess(image)?;
        let output = self.inference.run_first(&tensor)?;
        let maps = output.view()?.into_dimensionality::<Ix4>().map_err(|_| {
            VesselError::malformed_output(
                self.inference.model_name(),
                format!("expected [1, 1, h, w] probability map, got {:?}", output.shape),
            )
        })?;
        let prob_map = maps.index_axis_move(Axis(0), 0).index_axis_move(Axis(0), 0);

        Ok(self.postprocess.apply(prob_map, ratio_h, ratio_w, w, h))
    }
}
