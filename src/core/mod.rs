//! Core building blocks shared by every stage of page analysis:
//! configuration, errors, the ONNX Runtime engine and the service traits.

pub mod config;
pub mod errors;
pub mod inference;
pub mod traits;

pub use config::{AnalyzerConfig, ModelPaths, OrtSessionConfig, ParallelPolicy};
pub use errors::{
    ImageProcessError, NoteServiceError, ProcessingStage, VesselError, VesselResult,
};
pub use inference::{OrtInfer, OutputTensor, Tensor4D};
pub use traits::{
    DetectionParams, NoteExtractor, ObjectDetector, TableStructureRecognizer, TextRecognizer,
};
