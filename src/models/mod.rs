//! ONNX model wrappers.
//!
//! Each model owns its [`OrtInfer`](crate::core::OrtInfer) engine and runs the
//! same three steps: preprocess an image into a tensor, run the forward pass,
//! decode the raw outputs.

pub mod detection;
pub mod recognition;

pub use detection::{DbTextDetector, YoloDetector};
pub use recognition::{CrnnRecognizer, SlanetModel};
