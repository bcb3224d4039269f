//! # vessel-ocr
//!
//! Extracts structured engineering data from scanned pressure-vessel drawing
//! pages: tables, nozzle call-outs and notes.
//!
//! A page is segmented into note and table regions by an object detector.
//! Tables go through table-structure recognition and are normalized into named
//! row lists. Views are detected on the whole page, classified from their own
//! text, and searched for nozzle call-outs whose OCR tokens are repaired with
//! drawing-specific rules. Notes are sent to an external extraction service.
//! Everything is merged into one JSON record per page, and an annotated copy of
//! the page can be written for visual checks.
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, ONNX Runtime engine and service traits
//! * [`domain`] - Regions, nozzle extraction, table normalization, notes
//! * [`analyzer`] - Page orchestration and the ONNX-backed OCR/table engines
//! * [`models`] - Detector and recognizer model wrappers
//! * [`processors`] - Geometry, resizing, normalization and decoders
//! * [`utils`] - Image loading, cropping, annotation and tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vessel_ocr::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let models = VesselModels::load(
//!     &ModelPaths::in_dir("models"),
//!     &OrtSessionConfig::default(),
//!     &AnalyzerConfig::default(),
//! )?;
//! let analyzer = PageAnalyzer::builder()
//!     .models(models)
//!     .config(AnalyzerConfig::default())
//!     .build()?;
//!
//! let result = analyzer.analyze_path("page-1.png", 1)?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod core;
pub mod domain;
pub mod models;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analyzer::{PageAnalyzer, PageAnalyzerBuilder, PageResult, VesselModels};
    pub use crate::core::{
        AnalyzerConfig, DetectionParams, ModelPaths, NoteExtractor, ObjectDetector,
        OrtSessionConfig, ParallelPolicy, TableStructureRecognizer, TextRecognizer, VesselError,
        VesselResult,
    };
    pub use crate::domain::{
        NoteEntry, NotePayload, Nozzle, OcrMode, RegionSet, TableEntry, TableResult, View,
        ViewType,
    };
    pub use crate::processors::{BoundingBox, Detection, XywhBox};
    pub use crate::utils::{init_tracing, load_image};
}
