//! End-to-end page analysis with in-memory model services.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use serde_json::json;

use vessel_ocr::core::{
    AnalyzerConfig, DetectionParams, NoteExtractor, ObjectDetector, TableStructureRecognizer,
    TextRecognizer, VesselError, VesselResult,
};
use vessel_ocr::domain::{NotePayload, NoteServiceError, ViewType};
use vessel_ocr::prelude::{BoundingBox, Detection, PageAnalyzer, XywhBox};

#[derive(Debug)]
struct FixedDetector(Vec<Detection>);

impl ObjectDetector for FixedDetector {
    fn detect(&self, _image: &RgbImage, _params: &DetectionParams) -> VesselResult<Vec<Detection>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
struct FailingDetector;

impl ObjectDetector for FailingDetector {
    fn detect(&self, _image: &RgbImage, _params: &DetectionParams) -> VesselResult<Vec<Detection>> {
        Err(VesselError::InvalidInput {
            message: "detector offline".to_string(),
        })
    }
}

/// Wide crops are views, narrow ones nozzle labels.
#[derive(Debug)]
struct SizeText;

impl TextRecognizer for SizeText {
    fn recognize(&self, image: &RgbImage) -> VesselResult<Vec<String>> {
        let lines: &[&str] = if image.width() > 60 {
            &["FRONT ELEVATION"]
        } else {
            &["N1", "6", "\""]
        };
        Ok(lines.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug)]
struct FixedTable;

impl TableStructureRecognizer for FixedTable {
    fn recognize(&self, _image: &RgbImage) -> VesselResult<Option<String>> {
        Ok(Some(
            "<table><tr><td colspan=\"2\">NOZZLE SCHEDULE</td></tr>\
             <tr><td>N1</td><td>6\"</td></tr></table>"
                .to_string(),
        ))
    }
}

/// Accepts crops up to 80 px wide.
#[derive(Debug)]
struct NarrowNotes;

impl NoteExtractor for NarrowNotes {
    fn extract(&self, png: &[u8]) -> Result<serde_json::Value, NoteServiceError> {
        let crop = vessel_ocr::utils::load_image_from_bytes(png).unwrap();
        if crop.width() > 80 {
            return Err(NoteServiceError::Status {
                status: 503,
                body: "busy".to_string(),
            });
        }
        Ok(json!({"notes": ["1. ALL DIMENSIONS IN MM"]}))
    }
}

fn det(x1: i32, y1: i32, x2: i32, y2: i32, class_id: usize) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2), class_id, 0.9)
}

fn config() -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.annotation.output_path = None;
    config
}

fn analyzer(config: AnalyzerConfig, regions: Arc<dyn ObjectDetector>) -> PageAnalyzer {
    PageAnalyzer::builder()
        .config(config)
        .region_detector(regions)
        .view_detector(Arc::new(FixedDetector(vec![det(100, 120, 200, 220, 0)])))
        .nozzle_detector(Arc::new(FixedDetector(vec![
            det(10, 10, 30, 20, 0),
            det(50, 60, 70, 70, 0),
        ])))
        .text_recognizer(Arc::new(SizeText))
        .table_recognizer(Arc::new(FixedTable))
        .note_extractor(Arc::new(NarrowNotes))
        .build()
        .unwrap()
}

fn page_regions() -> Arc<dyn ObjectDetector> {
    Arc::new(FixedDetector(vec![
        det(10, 10, 60, 40, 0),
        det(100, 10, 200, 60, 1),
        det(0, 0, 5, 5, 5),
        det(300, 250, 390, 290, 0),
    ]))
}

fn page() -> RgbImage {
    RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]))
}

#[test]
fn test_full_page_record() {
    let result = analyzer(config(), page_regions()).analyze(&page(), 4).unwrap();

    assert_eq!(result.page, 4);
    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.tables[0].table.name, "NOZZLE SCHEDULE");
    assert_eq!(result.tables[0].bbox, XywhBox([100, 10, 100, 50]));

    // View box (100,120)-(200,220) grows by 30 px, so nozzles shift by (70, 90).
    assert_eq!(result.nozzles.len(), 2);
    assert_eq!(result.nozzles[0].bbox, XywhBox([80, 100, 20, 10]));
    assert_eq!(result.nozzles[1].bbox, XywhBox([120, 150, 20, 10]));
    assert!(result.nozzles.iter().all(|n| n.view == ViewType::ElevationView));
    assert!(result.nozzles.iter().all(|n| n.text == "N1 6\""));

    assert_eq!(result.notes.len(), 2);
    assert!(matches!(result.notes[0].notes, NotePayload::Structured(_)));
    assert!(matches!(result.notes[1].notes, NotePayload::Unavailable { .. }));

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(
        value["tables"][0],
        json!({"name": "NOZZLE SCHEDULE", "rows": [["N1", "6\""]], "bbox": [100, 10, 100, 50]})
    );
    assert_eq!(value["nozzles"][0]["view"], "Elevation View");
    assert_eq!(value["notes"][1]["notes"], serde_json::Value::Null);
    assert!(value["notes"][1]["error"].as_str().unwrap().contains("503"));
    assert!(value["time"].as_str().unwrap().ends_with(" Seconds"));
}

#[test]
fn test_bounded_pool_gives_same_record() {
    let mut bounded = config();
    bounded.parallel.max_threads = Some(2);

    let a = analyzer(config(), page_regions()).analyze(&page(), 1).unwrap();
    let b = analyzer(bounded, page_regions()).analyze(&page(), 1).unwrap();
    assert_eq!(a.tables, b.tables);
    assert_eq!(a.nozzles, b.nozzles);
    assert_eq!(a.notes, b.notes);
}

#[test]
fn test_detector_failure_fails_page() {
    let result = analyzer(config(), Arc::new(FailingDetector)).analyze(&page(), 1);
    assert!(result.is_err());
}

#[test]
fn test_annotated_page_written() {
    let path = std::env::temp_dir().join(format!("vessel-ocr-annotated-{}.png", std::process::id()));
    let mut config = config();
    config.annotation.output_path = Some(path.clone());

    analyzer(config, page_regions()).analyze(&page(), 1).unwrap();

    let written = image::open(&path).unwrap().to_rgb8();
    assert_eq!(written.dimensions(), (400, 300));
    // Bottom edge of the table box; labels sit at the top.
    assert_eq!(written.get_pixel(150, 59), &Rgb([0, 0, 255]));
    let _ = std::fs::remove_file(&path);
}
