//! Page analysis settings and model artifact locations.
//!
//! Every field has a default, so a partial JSON file (or `{}`) is a valid
//! configuration. Defaults reproduce the tuning of the drawing template the
//! detectors were trained on.

use crate::core::config::ParallelPolicy;
use crate::core::errors::{VesselError, VesselResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Region (notes/table) detection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    /// Square inference size of the region detector.
    pub image_size: u32,
    /// Minimum detection confidence.
    pub confidence: f32,
    /// Margin added around table boxes before cropping.
    pub table_margin: i32,
    /// Margin added around note boxes before cropping.
    pub note_margin: i32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            image_size: 1536,
            confidence: 0.5,
            table_margin: 10,
            note_margin: 15,
        }
    }
}

/// View and nozzle detection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Square inference size of the view detector.
    pub image_size: u32,
    /// Confidence override for the view detector; `None` keeps the detector default.
    pub confidence: Option<f32>,
    /// Margin added around each view box.
    pub margin: i32,
    /// Square inference size of the nozzle detector.
    pub nozzle_image_size: u32,
    /// Minimum nozzle detection confidence.
    pub nozzle_confidence: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            image_size: 1536,
            confidence: None,
            margin: 30,
            nozzle_image_size: 1024,
            nozzle_confidence: 0.25,
        }
    }
}

/// Note extraction service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoteServiceConfig {
    /// Endpoint receiving the multipart note crop.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NoteServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://donut_api:8000/infer".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Annotated page output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Where to write the annotated page; `None` disables annotation.
    pub output_path: Option<PathBuf>,
    /// TrueType font for box labels; a system font is tried when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            output_path: Some(PathBuf::from("annotated.png")),
            font_path: None,
        }
    }
}

/// Text detection and recognition tuning for the OCR engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextEngineConfig {
    /// Shortest side of the detector input is raised to at least this.
    pub det_limit_side_len: u32,
    /// Probability map binarization threshold.
    pub det_threshold: f32,
    /// Minimum mean probability inside a text box.
    pub det_box_threshold: f32,
    /// Box expansion ratio.
    pub det_unclip_ratio: f32,
    /// Recognized lines scoring below this are dropped.
    pub rec_score_threshold: f32,
}

impl Default for TextEngineConfig {
    fn default() -> Self {
        Self {
            det_limit_side_len: 64,
            det_threshold: 0.3,
            det_box_threshold: 0.6,
            det_unclip_ratio: 1.5,
            rec_score_threshold: 0.5,
        }
    }
}

/// Complete page analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub regions: RegionConfig,
    pub views: ViewConfig,
    pub notes: NoteServiceConfig,
    pub annotation: AnnotationConfig,
    pub text: TextEngineConfig,
    pub parallel: ParallelPolicy,
}

impl AnalyzerConfig {
    /// Reads a JSON configuration file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> VesselResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| VesselError::ConfigError {
            message: format!("failed to parse '{}': {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> VesselResult<()> {
        validate_image_size("regions.image_size", self.regions.image_size)?;
        validate_image_size("views.image_size", self.views.image_size)?;
        validate_image_size("views.nozzle_image_size", self.views.nozzle_image_size)?;

        validate_unit("regions.confidence", self.regions.confidence)?;
        if let Some(conf) = self.views.confidence {
            validate_unit("views.confidence", conf)?;
        }
        validate_unit("views.nozzle_confidence", self.views.nozzle_confidence)?;
        validate_unit("text.det_threshold", self.text.det_threshold)?;
        validate_unit("text.det_box_threshold", self.text.det_box_threshold)?;
        validate_unit("text.rec_score_threshold", self.text.rec_score_threshold)?;

        for (field, margin) in [
            ("regions.table_margin", self.regions.table_margin),
            ("regions.note_margin", self.regions.note_margin),
            ("views.margin", self.views.margin),
        ] {
            if margin < 0 {
                return Err(VesselError::invalid_field(
                    field,
                    "a non-negative margin",
                    margin.to_string(),
                ));
            }
        }

        if self.text.det_unclip_ratio <= 0.0 {
            return Err(VesselError::invalid_field(
                "text.det_unclip_ratio",
                "a positive ratio",
                self.text.det_unclip_ratio.to_string(),
            ));
        }
        if self.text.det_limit_side_len < 32 {
            return Err(VesselError::invalid_field(
                "text.det_limit_side_len",
                "at least 32",
                self.text.det_limit_side_len.to_string(),
            ));
        }
        if self.notes.url.trim().is_empty() {
            return Err(VesselError::invalid_field(
                "notes.url",
                "a non-empty URL",
                "\"\"",
            ));
        }
        if self.notes.timeout_secs == 0 {
            return Err(VesselError::invalid_field(
                "notes.timeout_secs",
                "a positive timeout",
                "0",
            ));
        }
        Ok(())
    }
}

fn validate_image_size(field: &str, size: u32) -> VesselResult<()> {
    if size == 0 || size % 32 != 0 {
        return Err(VesselError::invalid_field(
            field,
            "a positive multiple of 32",
            size.to_string(),
        ));
    }
    Ok(())
}

fn validate_unit(field: &str, value: f32) -> VesselResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(VesselError::invalid_field(
            field,
            "a value in [0, 1]",
            value.to_string(),
        ));
    }
    Ok(())
}

/// Locations of the ONNX models and dictionaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPaths {
    /// Two-class notes/table detector.
    pub regions: PathBuf,
    /// View detector.
    pub views: PathBuf,
    /// Nozzle call-out detector.
    pub nozzles: PathBuf,
    /// DB text detector.
    pub text_detection: PathBuf,
    /// CRNN text recognizer.
    pub text_recognition: PathBuf,
    /// Character dictionary of the text recognizer.
    pub text_dict: PathBuf,
    /// SLANet table structure model.
    pub table_structure: PathBuf,
    /// Structure token dictionary.
    pub table_dict: PathBuf,
}

impl ModelPaths {
    /// Conventional file names inside one model directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            regions: dir.join("sections.onnx"),
            views: dir.join("views.onnx"),
            nozzles: dir.join("nozzles.onnx"),
            text_detection: dir.join("text_det.onnx"),
            text_recognition: dir.join("text_rec.onnx"),
            text_dict: dir.join("text_dict.txt"),
            table_structure: dir.join("table_structure.onnx"),
            table_dict: dir.join("table_structure_dict.txt"),
        }
    }

    /// All paths paired with a short label.
    pub fn entries(&self) -> [(&'static str, &Path); 8] {
        [
            ("regions", self.regions.as_path()),
            ("views", self.views.as_path()),
            ("nozzles", self.nozzles.as_path()),
            ("text_detection", self.text_detection.as_path()),
            ("text_recognition", self.text_recognition.as_path()),
            ("text_dict", self.text_dict.as_path()),
            ("table_structure", self.table_structure.as_path()),
            ("table_dict", self.table_dict.as_path()),
        ]
    }

    /// Labels and paths of files that do not exist.
    pub fn missing(&self) -> Vec<(&'static str, PathBuf)> {
        self.entries()
            .into_iter()
            .filter(|(_, path)| !path.is_file())
            .map(|(label, path)| (label, path.to_path_buf()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_template_tuning() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.regions.image_size, 1536);
        assert_eq!(config.regions.confidence, 0.5);
        assert_eq!(config.regions.table_margin, 10);
        assert_eq!(config.regions.note_margin, 15);
        assert_eq!(config.views.confidence, None);
        assert_eq!(config.views.margin, 30);
        assert_eq!(config.views.nozzle_image_size, 1024);
        assert_eq!(config.views.nozzle_confidence, 0.25);
        assert_eq!(config.notes.url, "http://donut_api:8000/infer");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"views": {"margin": 40}, "annotation": {"output_path": null}}"#)
                .unwrap();
        assert_eq!(config.views.margin, 40);
        assert_eq!(config.views.image_size, 1536);
        assert_eq!(config.annotation.output_path, None);
        assert_eq!(config.regions, RegionConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalyzerConfig::default();
        config.views.nozzle_image_size = 1000;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.regions.note_margin = -1;
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.views.confidence = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = AnalyzerConfig::default();
        config.notes.url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("vessel-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AnalyzerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, VesselError::ConfigError { .. }));

        std::fs::write(&path, r#"{"regions": {"confidence": 0.6}}"#).unwrap();
        let config = AnalyzerConfig::from_file(&path).unwrap();
        assert_eq!(config.regions.confidence, 0.6);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_model_paths_in_dir() {
        let paths = ModelPaths::in_dir("/nonexistent-models");
        assert_eq!(paths.views, PathBuf::from("/nonexistent-models/views.onnx"));
        assert_eq!(paths.missing().len(), 8);
    }
}
