//! Service boundaries between the page pipeline and its models.
//!
//! The pipeline only talks to these traits. ONNX-backed implementations live
//! in `models` and `analyzer`; tests substitute in-memory fakes.
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌─────────────────────────┐   ┌──────────────┐
//! │ObjectDetector│   │TextRecognizer  │   │TableStructureRecognizer │   │NoteExtractor │
//! │• detect      │   │• recognize     │   │• recognize              │   │• extract     │
//! └──────────────┘   └────────────────┘   └─────────────────────────┘   └──────────────┘
//! ```

use crate::core::errors::{NoteServiceError, VesselResult};
use crate::processors::Detection;
use image::RgbImage;
use std::fmt::Debug;

/// Per-call detector settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Square inference size the image is letterboxed to.
    pub image_size: u32,
    /// Minimum confidence; `None` keeps the detector's own default.
    pub confidence: Option<f32>,
}

impl DetectionParams {
    pub fn new(image_size: u32, confidence: Option<f32>) -> Self {
        Self {
            image_size,
            confidence,
        }
    }
}

/// Bounding-box detector over a whole image.
pub trait ObjectDetector: Send + Sync + Debug {
    /// Returns detections in the coordinate frame of `image`, in detector
    /// output order.
    fn detect(&self, image: &RgbImage, params: &DetectionParams) -> VesselResult<Vec<Detection>>;
}

/// Line-level OCR engine.
pub trait TextRecognizer: Send + Sync + Debug {
    /// Returns one string per recognized text line, in reading order.
    fn recognize(&self, image: &RgbImage) -> VesselResult<Vec<String>>;
}

/// Table structure recognition producing HTML markup.
pub trait TableStructureRecognizer: Send + Sync + Debug {
    /// Returns the table markup, or `None` when no structure was found.
    fn recognize(&self, image: &RgbImage) -> VesselResult<Option<String>>;
}

/// Structured extraction of a note crop by an external service.
pub trait NoteExtractor: Send + Sync + Debug {
    /// Sends one PNG-encoded crop and returns the service's JSON payload.
    fn extract(&self, png: &[u8]) -> Result<serde_json::Value, NoteServiceError>;
}
