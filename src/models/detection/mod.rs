pub mod db;
pub mod yolo;

pub use db::DbTextDetector;
pub use yolo::YoloDetector;
