//! Settings resolution for the command line.

use std::path::PathBuf;
use vessel_ocr::core::{AnalyzerConfig, ModelPaths, OrtSessionConfig, VesselResult};

/// Values given on the command line or through the environment.
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub model_dir: PathBuf,
    pub device: String,
    pub notes_url: Option<String>,
    pub workers: Option<usize>,
    pub annotate: Option<PathBuf>,
}

/// Everything needed to build an analyzer.
pub struct RunConfig {
    pub analyzer: AnalyzerConfig,
    pub models: ModelPaths,
    pub session: OrtSessionConfig,
}

impl RunConfig {
    /// Starts from the config file (or defaults) and applies the overrides.
    ///
    /// The annotated image is only written when `--annotate` is given.
    pub fn resolve(overrides: Overrides) -> VesselResult<Self> {
        let mut analyzer = match &overrides.config_file {
            Some(path) => AnalyzerConfig::from_file(path)?,
            None => AnalyzerConfig::default(),
        };

        if let Some(url) = overrides.notes_url {
            analyzer.notes.url = url;
        }
        if overrides.workers.is_some() {
            analyzer.parallel.max_threads = overrides.workers;
        }
        analyzer.annotation.output_path = overrides.annotate;
        analyzer.validate()?;

        let session = OrtSessionConfig::from_device(&overrides.device)?;

        Ok(Self {
            analyzer,
            models: ModelPaths::in_dir(&overrides.model_dir),
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides() -> Overrides {
        Overrides {
            config_file: None,
            model_dir: PathBuf::from("m"),
            device: "cpu".to_string(),
            notes_url: None,
            workers: None,
            annotate: None,
        }
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let run = RunConfig::resolve(Overrides {
            notes_url: Some("http://localhost:9000/infer".to_string()),
            workers: Some(3),
            annotate: Some(PathBuf::from("out.png")),
            ..overrides()
        })
        .unwrap();
        assert_eq!(run.analyzer.notes.url, "http://localhost:9000/infer");
        assert_eq!(run.analyzer.parallel.max_threads, Some(3));
        assert_eq!(run.analyzer.annotation.output_path, Some(PathBuf::from("out.png")));
        assert_eq!(run.models.regions, PathBuf::from("m").join("sections.onnx"));
    }

    #[test]
    fn test_resolve_rejects_unknown_device() {
        assert!(
            RunConfig::resolve(Overrides {
                device: "tpu".to_string(),
                ..overrides()
            })
            .is_err()
        );
    }
}
