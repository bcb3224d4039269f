//! Core error types for the extraction pipeline.
//!
//! [`VesselError`] is the page-level error: anything that surfaces through it
//! aborts analysis of the current page. Failures that must stay local to one
//! region (the note service) use [`NoteServiceError`] instead.

use thiserror::Error;

/// Errors raised while slicing or cropping image buffers.
#[derive(Debug, Error)]
pub enum ImageProcessError {
    /// The crop region has zero width or height after clipping.
    #[error("empty crop region ({x1}, {y1}) to ({x2}, {y2})")]
    EmptyCrop { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// Encoding an image buffer failed.
    #[error("image encoding failed")]
    Encode(#[source] image::ImageError),
}

/// Failures of the note extraction service.
#[derive(Debug, Error)]
pub enum NoteServiceError {
    /// The request could not be built or sent, or timed out.
    #[error("note service request failed")]
    Transport(#[source] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("note service returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body was not JSON.
    #[error("note service returned an undecodable body")]
    Decode(#[source] reqwest::Error),
}

/// Stage of the pipeline in which a processing error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Image resizing and tensor preparation.
    Preprocessing,
    /// Page region detection.
    RegionDetection,
    /// View and nozzle extraction.
    NozzleExtraction,
    /// Table structure recognition.
    TableRecognition,
    /// Text recognition.
    TextRecognition,
    /// Annotated image rendering.
    Annotation,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Preprocessing => write!(f, "preprocessing"),
            ProcessingStage::RegionDetection => write!(f, "region detection"),
            ProcessingStage::NozzleExtraction => write!(f, "nozzle extraction"),
            ProcessingStage::TableRecognition => write!(f, "table recognition"),
            ProcessingStage::TextRecognition => write!(f, "text recognition"),
            ProcessingStage::Annotation => write!(f, "annotation"),
        }
    }
}

/// Errors that abort analysis of a page.
#[derive(Error, Debug)]
pub enum VesselError {
    /// The page image could not be read or decoded.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A pipeline stage failed.
    #[error("{kind} failed: {context}")]
    Processing {
        /// Stage in which the failure happened.
        kind: ProcessingStage,
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A model forward pass failed.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// Name of the model (file stem of the ONNX artifact).
        model_name: String,
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Model output did not have the expected layout.
    #[error("model '{model_name}' produced unexpected output: {message}")]
    MalformedOutput {
        /// Name of the model.
        model_name: String,
        /// Description of the mismatch.
        message: String,
    },

    /// Invalid input to a pipeline component.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Tensor shape error.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// A model file could not be loaded.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load.
        model_path: String,
        /// Short reason string.
        reason: String,
        /// Optional suggestion, prefixed with '; ' when present.
        suggestion: String,
        /// Underlying source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<image::ImageError> for VesselError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<ImageProcessError> for VesselError {
    fn from(error: ImageProcessError) -> Self {
        Self::Processing {
            kind: ProcessingStage::Preprocessing,
            context: "image processing failed".to_string(),
            source: Box::new(error),
        }
    }
}

impl VesselError {
    /// Wraps an error raised inside a pipeline stage.
    pub fn stage(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wraps a failed forward pass.
    pub fn inference(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Reports a model output with an unexpected shape or type.
    pub fn malformed_output(model_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            model_name: model_name.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error for an invalid field value.
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ConfigError {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual.into()
            ),
        }
    }

    /// Creates a model load error with an optional recovery suggestion.
    pub fn model_load_error(
        path: &std::path::Path,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<ort::Error>,
    ) -> Self {
        Self::ModelLoad {
            model_path: path.display().to_string(),
            reason: reason.into(),
            suggestion: suggestion.map(|s| format!("; {s}")).unwrap_or_default(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

/// Result alias used across the crate.
pub type VesselResult<T> = Result<T, VesselError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_message() {
        let err = VesselError::stage(
            ProcessingStage::TableRecognition,
            "table 2",
            std::io::Error::other("boom"),
        );
        assert_eq!(err.to_string(), "table recognition failed: table 2");
    }

    #[test]
    fn test_model_load_suggestion_prefix() {
        let err = VesselError::model_load_error(
            std::path::Path::new("models/view.onnx"),
            "file not found",
            Some("check the model directory"),
            None,
        );
        assert_eq!(
            err.to_string(),
            "model load failed for 'models/view.onnx': file not found; check the model directory"
        );
    }

    #[test]
    fn test_note_service_status_message() {
        let err = NoteServiceError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "note service returned status 503: busy");
    }

    #[test]
    fn test_invalid_field_message() {
        let err = VesselError::invalid_field("views.margin", "a non-negative value", "-3");
        assert!(matches!(err, VesselError::ConfigError { .. }));
        assert!(err.to_string().contains("views.margin"));
    }
}
