//! Page orchestration and the ONNX-backed OCR and table engines.

pub mod ocr;
pub mod page;
pub mod result;
pub mod table_analyzer;

pub use ocr::PpOcrEngine;
pub use page::{PageAnalyzer, PageAnalyzerBuilder, VesselModels};
pub use result::PageResult;
pub use table_analyzer::SlanetTableRecognizer;
