//! Image processing, geometry and model output decoding.

pub mod ctc_decode;
pub mod db_postprocess;
pub mod geometry;
pub mod normalization;
pub mod resize;
pub mod sorting;
pub mod table_structure_decode;
pub mod yolo_postprocess;

pub use ctc_decode::CtcLabelDecode;
pub use db_postprocess::DBPostProcess;
pub use geometry::{BoundingBox, Detection, XywhBox};
pub use normalization::{ColorOrder, NormalizeImage};
pub use resize::{LetterboxInfo, letterbox};
pub use sorting::sort_reading_order;
pub use table_structure_decode::{
    DecodedTable, TableStructureDecode, match_cells, render_table_html,
};
pub use yolo_postprocess::YoloPostProcess;
