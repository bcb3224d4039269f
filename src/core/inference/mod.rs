//! ONNX Runtime inference engine with a pool of sessions per model.
//!
//! `Session::run` needs exclusive access, so each model keeps a small pool of
//! mutex-guarded sessions and hands them out round-robin. This lets the view
//! and nozzle fan-out call one shared detector from several rayon workers.

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{VesselError, VesselResult};
use ndarray::{Array4, ArrayViewD, IxDyn};
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

mod ort_infer_config;

/// Batched NCHW float input.
pub type Tensor4D = Array4<f32>;

/// One named output of a forward pass, copied out of the session.
#[derive(Debug, Clone)]
pub struct OutputTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    /// Views the flat data with its reported shape.
    pub fn view(&self) -> VesselResult<ArrayViewD<'_, f32>> {
        Ok(ArrayViewD::from_shape(IxDyn(&self.shape), &self.data)?)
    }
}

pub struct OrtInfer {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    input_name: String,
    output_names: Vec<String>,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl OrtInfer {
    /// Loads `model_path` into `cfg.get_session_pool_size()` sessions.
    ///
    /// The input name is taken from the model unless `input_name` overrides it.
    pub fn from_config(
        cfg: &OrtSessionConfig,
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
    ) -> VesselResult<Self> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(VesselError::model_load_error(
                path,
                "file not found",
                Some("check the model directory or the VESSEL_MODEL_DIR variable"),
                None,
            ));
        }

        let pool_size = cfg.get_session_pool_size();
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
            let builder = Self::apply_ort_config(builder, cfg)?;
            let session = builder.commit_from_file(path).map_err(|e| {
                VesselError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("check device/EP configuration and model file"),
                    Some(e),
                )
            })?;
            sessions.push(Mutex::new(session));
        }

        let (discovered_input, output_names) = match sessions.first() {
            Some(first) => {
                let session = first.lock().map_err(|_| lock_error(path))?;
                (
                    session.inputs.first().map(|input| input.name.clone()),
                    session
                        .outputs
                        .iter()
                        .map(|output| output.name.clone())
                        .collect::<Vec<_>>(),
                )
            }
            None => (None, Vec::new()),
        };

        let input_name = input_name
            .map(str::to_string)
            .or(discovered_input)
            .unwrap_or_else(|| "x".to_string());
        if output_names.is_empty() {
            return Err(VesselError::model_load_error(
                path,
                "model declares no outputs",
                None,
                None,
            ));
        }

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        tracing::debug!(
            model = %model_name,
            sessions = pool_size,
            input = %input_name,
            outputs = ?output_names,
            "loaded ONNX model"
        );

        Ok(Self {
            sessions,
            next_idx: AtomicUsize::new(0),
            input_name,
            output_names,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Runs one forward pass and copies out every output.
    pub fn run(&self, x: &Tensor4D) -> VesselResult<Vec<OutputTensor>> {
        let input_shape = x.shape().to_vec();
        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            VesselError::inference(
                &self.model_name,
                format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[idx]
            .lock()
            .map_err(|_| lock_error(&self.model_path))?;

        let outputs = session.run(inputs).map_err(|e| {
            VesselError::inference(
                &self.model_name,
                format!("forward pass failed for input shape {input_shape:?}"),
                e,
            )
        })?;

        let mut tensors = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let (shape, data) = outputs[name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    VesselError::inference(
                        &self.model_name,
                        format!("failed to extract output '{name}' as f32"),
                        e,
                    )
                })?;
            tensors.push(OutputTensor {
                name: name.clone(),
                shape: shape.iter().map(|&d| d.max(0) as usize).collect(),
                data: data.to_vec(),
            });
        }
        Ok(tensors)
    }

    /// Runs one forward pass and returns the first declared output.
    pub fn run_first(&self, x: &Tensor4D) -> VesselResult<OutputTensor> {
        self.run(x)?.into_iter().next().ok_or_else(|| {
            VesselError::malformed_output(&self.model_name, "forward pass produced no outputs")
        })
    }
}

fn lock_error(path: &Path) -> VesselError {
    VesselError::inference(
        path.display().to_string(),
        "failed to acquire session lock",
        std::io::Error::other("session mutex poisoned"),
    )
}
