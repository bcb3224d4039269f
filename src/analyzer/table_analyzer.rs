//! Table structure recognition with cell text filled in from OCR.

use crate::analyzer::ocr::PpOcrEngine;
use crate::core::errors::{ProcessingStage, VesselError, VesselResult};
use crate::core::traits::TableStructureRecognizer;
use crate::models::SlanetModel;
use crate::processors::table_structure_decode::{match_cells, render_table_html};
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;

/// SLANet structure tokens and cell boxes, OCR lines matched into the cells.
#[derive(Debug)]
pub struct SlanetTableRecognizer {
    model: SlanetModel,
    ocr: Arc<PpOcrEngine>,
}

impl SlanetTableRecognizer {
    pub fn new(model: SlanetModel, ocr: Arc<PpOcrEngine>) -> Self {
        Self { model, ocr }
    }
}

impl TableStructureRecognizer for SlanetTableRecognizer {
    fn recognize(&self, image: &RgbImage) -> VesselResult<Option<String>> {
        let decoded = self
            .model
            .forward(image)
            .map_err(|e| VesselError::stage(ProcessingStage::TableRecognition, "predict table structure", e))?;
        if decoded.tokens.is_empty() {
            return Ok(None);
        }

        let lines = self.ocr.detect_and_recognize(image)?;
        let cell_texts = match_cells(&decoded.cells, &lines);
        debug!(
            "Table structure: {} tokens, {} cells, {} text lines, score {:.3}",
            decoded.tokens.len(),
            decoded.cells.len(),
            lines.len(),
            decoded.score
        );

        Ok(Some(render_table_html(&decoded.tokens, &cell_texts)))
    }
}
