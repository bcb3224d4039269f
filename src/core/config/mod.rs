//! Configuration for page analysis, model sessions and parallelism.

pub mod onnx;
pub mod parallel;
pub mod pipeline;

pub use onnx::*;
pub use parallel::ParallelPolicy;
pub use pipeline::{
    AnalyzerConfig, AnnotationConfig, ModelPaths, NoteServiceConfig, RegionConfig,
    TextEngineConfig, ViewConfig,
};
