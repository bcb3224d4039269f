//! YOLO object detector (ultralytics ONNX export).
//!
//! Used for the three page detectors: notes/table regions, views and nozzle
//! call-outs. Input is a letterboxed square RGB image scaled to `[0, 1]`; the
//! requested square size comes from [`DetectionParams`] on every call, so one
//! loaded model serves any inference size the export allows.

use crate::core::errors::{VesselError, VesselResult};
use crate::core::inference::{OrtInfer, Tensor4D};
use crate::core::traits::{DetectionParams, ObjectDetector};
use crate::processors::{
    Detection, LetterboxInfo, NormalizeImage, YoloPostProcess, letterbox,
};
use image::RgbImage;
use ndarray::{Axis, Ix3};

/// Confidence used when the caller does not override it.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

#[derive(Debug)]
pub struct YoloDetector {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    postprocess: YoloPostProcess,
}

impl YoloDetector {
    pub fn new(inference: OrtInfer) -> VesselResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::unit_rgb()?,
            postprocess: YoloPostProcess {
                conf_threshold: DEFAULT_CONFIDENCE,
                ..Default::default()
            },
        })
    }

    /// Letterboxes and normalizes one image.
    pub fn preprocess(
        &self,
        image: &RgbImage,
        image_size: u32,
    ) -> VesselResult<(Tensor4D, LetterboxInfo)> {
        let (boxed, info) = letterbox(image, image_size);
        Ok((self.normalizer.normalize_to(&boxed)?, info))
    }

    /// Runs the forward pass and decodes detections in source coordinates.
    pub fn forward(&self, image: &RgbImage, params: &DetectionParams) -> VesselResult<Vec<Detection>> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(Vec::new());
        }

        let (tensor, info) = self.preprocess(image, params.image_size)?;
        let output = self.inference.run_first(&tensor)?;
        let preds = output.view()?.into_dimensionality::<Ix3>().map_err(|_| {
            VesselError::malformed_output(
                self.inference.model_name(),
                format!("expected [1, 4 + classes, anchors], got {:?}", output.shape),
            )
        })?;
        let preds = preds.index_axis_move(Axis(0), 0);

        // Some exports transpose the head to [anchors, 4 + classes].
        let preds = if preds.nrows() > preds.ncols() {
            preds.reversed_axes()
        } else {
            preds
        };

        let post = YoloPostProcess {
            conf_threshold: params.confidence.unwrap_or(self.postprocess.conf_threshold),
            ..self.postprocess
        };
        let detections = post.apply(preds, &info, w, h);
        tracing::debug!(
            model = self.inference.model_name(),
            image_size = params.image_size,
            count = detections.len(),
            "detections decoded"
        );
        Ok(detections)
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&self, image: &RgbImage, params: &DetectionParams) -> VesselResult<Vec<Detection>> {
        self.forward(image, params)
    }
}
