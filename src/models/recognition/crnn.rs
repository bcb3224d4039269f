//! CRNN text line recognizer (PP-OCR export) with greedy CTC decoding.

use crate::core::errors::{VesselError, VesselResult};
use crate::core::inference::{OrtInfer, Tensor4D};
use crate::processors::resize::{recognition_width, resize_for_recognition};
use crate::processors::{CtcLabelDecode, NormalizeImage};
use image::RgbImage;
use ndarray::{Axis, Ix3};

/// Input height of the recognizer.
pub const REC_IMAGE_HEIGHT: u32 = 48;
/// Minimum padded input width.
pub const REC_BASE_WIDTH: u32 = 320;

#[derive(Debug)]
pub struct CrnnRecognizer {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    decoder: CtcLabelDecode,
}

impl CrnnRecognizer {
    pub fn new(inference: OrtInfer, decoder: CtcLabelDecode) -> VesselResult<Self> {
        Ok(Self {
            inference,
            normalizer: NormalizeImage::for_ocr_recognition()?,
            decoder,
        })
    }

    /// Resizes to the recognizer height and pads on the right.
    pub fn preprocess(&self, line: &RgbImage) -> VesselResult<Tensor4D> {
        let (w, h) = line.dimensions();
        let target_w = recognition_width(REC_IMAGE_HEIGHT, REC_BASE_WIDTH, w, h);
        let resized = resize_for_recognition(line, REC_IMAGE_HEIGHT, target_w);
        self.normalizer
            .normalize_padded(&resized, REC_IMAGE_HEIGHT, target_w)
    }

    /// Recognizes one text line crop; returns the text and its mean confidence.
    pub fn forward(&self, line: &RgbImage) -> VesselResult<(String, f32)> {
        if line.width() == 0 || line.height() == 0 {
            return Ok((String::new(), 0.0));
        }

        let tensor = self.preprocess(line)?;
        let output = self.inference.run_first(&tensor)?;
        let probs = output.view()?.into_dimensionality::<Ix3>().map_err(|_| {
            VesselError::malformed_output(
                self.inference.model_name(),
                format!("expected [1, time, classes], got {:?}", output.shape),
            )
        })?;
        let probs = probs.index_axis_move(Axis(0), 0);

        if probs.ncols() != self.decoder.num_classes() {
            tracing::warn!(
                model = self.inference.model_name(),
                classes = probs.ncols(),
                dictionary = self.decoder.num_classes(),
                "recognizer class count does not match dictionary"
            );
        }
        Ok(self.decoder.decode(probs))
    }
}
