//! ONNX Runtime session options shared by every model backend.

use crate::core::errors::VesselError;
use serde::{Deserialize, Serialize};

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Basic optimizations.
    #[default]
    Level1,
    /// Extended optimizations.
    Level2,
    /// All optimizations.
    Level3,
}

/// Execution providers the detectors and OCR engines can run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    #[default]
    Cpu,
    /// NVIDIA CUDA execution provider (requires the `cuda` feature)
    Cuda {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
        /// Memory limit in bytes
        gpu_mem_limit: Option<usize>,
    },
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrtSessionConfig {
    /// Threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Execution providers in order of preference
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
    /// Number of sessions kept per model for concurrent inference
    pub session_pool_size: Option<usize>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Sets the execution providers.
    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = Some(providers);
        self
    }

    /// Sets how many sessions each model keeps for concurrent callers.
    pub fn with_session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = Some(size);
        self
    }

    /// Effective session pool size (at least one).
    pub fn get_session_pool_size(&self) -> usize {
        self.session_pool_size.unwrap_or(1).max(1)
    }

    /// Builds a config from a device string: `cpu`, `cuda` or `cuda:N`.
    pub fn from_device(device: &str) -> Result<Self, VesselError> {
        let device_lower = device.trim().to_lowercase();

        if device_lower == "cpu" {
            return Ok(Self::new());
        }

        let device_id = if device_lower == "cuda" {
            0
        } else if let Some(id) = device_lower.strip_prefix("cuda:") {
            id.parse::<i32>().map_err(|_| {
                VesselError::invalid_field("device", "'cuda:N' with numeric N", device)
            })?
        } else {
            return Err(VesselError::invalid_field(
                "device",
                "'cpu', 'cuda' or 'cuda:N'",
                device,
            ));
        };

        Ok(Self::new().with_execution_providers(vec![
            OrtExecutionProvider::Cuda {
                device_id: Some(device_id),
                gpu_mem_limit: None,
            },
            OrtExecutionProvider::Cpu,
        ]))
    }
}
