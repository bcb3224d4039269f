//! Two-stage OCR engine: DB line detection followed by CRNN recognition.

use crate::core::config::TextEngineConfig;
use crate::core::errors::{ProcessingStage, VesselError, VesselResult};
use crate::core::traits::TextRecognizer;
use crate::models::{CrnnRecognizer, DbTextDetector};
use crate::processors::BoundingBox;
use crate::processors::sorting::sort_reading_order;
use crate::utils::crop_region;
use image::RgbImage;
use tracing::debug;

/// PP-OCR style engine behind the [`TextRecognizer`] boundary.
#[derive(Debug)]
pub struct PpOcrEngine {
    detector: DbTextDetector,
    recognizer: CrnnRecognizer,
    score_threshold: f32,
}

impl PpOcrEngine {
    pub fn new(detector: DbTextDetector, recognizer: CrnnRecognizer, config: &TextEngineConfig) -> Self {
        Self {
            detector,
            recognizer,
            score_threshold: config.rec_score_threshold,
        }
    }

    /// Detects text lines and reads them in reading order.
    ///
    /// Lines below the score threshold or with no text are dropped.
    pub fn detect_and_recognize(&self, image: &RgbImage) -> VesselResult<Vec<(BoundingBox, String)>> {
        let lines = self
            .detector
            .forward(image)
            .map_err(|e| VesselError::stage(ProcessingStage::TextRecognition, "detect text lines", e))?;
        let lines = sort_reading_order(lines);

        let mut recognized = Vec::with_capacity(lines.len());
        for (bbox, _) in lines {
            let crop = crop_region(image, &bbox);
            let (text, score) = self.recognizer.forward(&crop)?;
            if score < self.score_threshold || text.trim().is_empty() {
                debug!("Dropping line {:?} ({:?}, score {:.3})", bbox, text, score);
                continue;
            }
            recognized.push((bbox, text));
        }
        Ok(recognized)
    }
}

impl TextRecognizer for PpOcrEngine {
    fn recognize(&self, image: &RgbImage) -> VesselResult<Vec<String>> {
        Ok(self
            .detect_and_recognize(image)?
            .into_iter()
            .map(|(_, text)| text)
            .collect())
    }
}
