//! Error handling for the extraction pipeline.

mod types;

pub use types::{
    ImageProcessError, NoteServiceError, ProcessingStage, VesselError, VesselResult,
};
