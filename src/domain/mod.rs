//! Page-level extraction logic on top of the model service traits.
//!
//! * [`regions`] - note/table segmentation
//! * [`nozzles`] - view classification and nozzle call-outs
//! * [`table`] - table markup normalization
//! * [`notes`] - note crops and the extraction service client
//! * [`text_recognition`] - label reading and nozzle token repair

pub mod notes;
pub mod nozzles;
pub mod regions;
pub mod table;
pub mod text_recognition;

pub use notes::{HttpNoteClient, NoteDispatcher, NoteEntry, NotePayload, NoteServiceError};
pub use nozzles::{Nozzle, View, ViewNozzleExtractor, ViewType, classify_view};
pub use regions::{RegionDetector, RegionSet};
pub use table::{TableEntry, TableNormalizer, TableResult};
pub use text_recognition::{OcrMode, TextRecognitionAdapter, repair_nozzle_tokens};
