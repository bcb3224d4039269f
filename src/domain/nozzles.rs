//! View detection, view classification and nozzle call-out extraction.
//!
//! Views are found on the whole page, grown by a margin and cropped. Each
//! view crop is read once to decide its [`ViewType`], then searched for nozzle
//! call-outs whose labels are read in [`OcrMode::Nozzle`]. Nozzle boxes are
//! mapped back to the page frame by the expanded view's top-left corner.

use crate::core::config::{ParallelPolicy, ViewConfig};
use crate::core::errors::{ProcessingStage, VesselError, VesselResult};
use crate::core::traits::{DetectionParams, ObjectDetector};
use crate::domain::text_recognition::{OcrMode, TextRecognitionAdapter};
use crate::processors::{BoundingBox, Detection, XywhBox};
use crate::utils::crop_region;
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Drawing view a nozzle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViewType {
    #[serde(rename = "Elevation View")]
    ElevationView,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "Setting Bolt Orientation")]
    SettingBoltOrientation,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::ElevationView => "Elevation View",
            ViewType::A => "A",
            ViewType::SettingBoltOrientation => "Setting Bolt Orientation",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a view from the text read inside it. First match wins.
pub fn classify_view(text: &str) -> ViewType {
    let text = text.to_lowercase();
    if text.contains("elevation") {
        ViewType::ElevationView
    } else if text.contains("a\"") || text.contains("a\u{201d}") {
        ViewType::A
    } else if text.contains("orientation") {
        ViewType::SettingBoltOrientation
    } else {
        // Unlabeled views on this drawing family are elevations.
        ViewType::ElevationView
    }
}

/// One nozzle call-out in page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nozzle {
    pub bbox: XywhBox,
    pub view: ViewType,
    pub text: String,
}

/// A detected view with its nozzles.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Expanded and clipped view box, page frame.
    pub bbox: BoundingBox,
    pub view_type: ViewType,
    pub nozzles: Vec<Nozzle>,
}

/// Finds views on a page and the nozzle call-outs inside them.
#[derive(Debug, Clone)]
pub struct ViewNozzleExtractor {
    view_detector: Arc<dyn ObjectDetector>,
    nozzle_detector: Arc<dyn ObjectDetector>,
    reader: TextRecognitionAdapter,
    config: ViewConfig,
    policy: ParallelPolicy,
}

impl ViewNozzleExtractor {
    pub fn new(
        view_detector: Arc<dyn ObjectDetector>,
        nozzle_detector: Arc<dyn ObjectDetector>,
        reader: TextRecognitionAdapter,
        config: ViewConfig,
        policy: ParallelPolicy,
    ) -> Self {
        Self {
            view_detector,
            nozzle_detector,
            reader,
            config,
            policy,
        }
    }

    /// Detects and reads every view, in detection order.
    pub fn extract_views(&self, page: &RgbImage) -> VesselResult<Vec<View>> {
        let params = DetectionParams::new(self.config.image_size, self.config.confidence);
        let detections = self
            .view_detector
            .detect(page, &params)
            .map_err(|e| VesselError::stage(ProcessingStage::NozzleExtraction, "detect views", e))?;
        debug!("Detected {} views", detections.len());

        self.policy
            .map_ordered(&detections, |view| self.read_view(page, view))
            .into_iter()
            .collect()
    }

    /// All nozzles of the page, per view then per nozzle in detection order.
    pub fn extract(&self, page: &RgbImage) -> VesselResult<Vec<Nozzle>> {
        let views = self.extract_views(page)?;
        Ok(views.into_iter().flat_map(|view| view.nozzles).collect())
    }

    fn read_view(&self, page: &RgbImage, detection: &Detection) -> VesselResult<View> {
        let bbox = detection
            .bbox
            .expand(self.config.margin, page.width(), page.height());
        let crop = crop_region(page, &bbox);

        let label = self.reader.read(&crop, OcrMode::Normal)?;
        let view_type = classify_view(&label);
        debug!("View at {:?} read as {:?}: {}", bbox, label, view_type);

        if crop.width() == 0 || crop.height() == 0 {
            return Ok(View {
                bbox,
                view_type,
                nozzles: Vec::new(),
            });
        }

        let params =
            DetectionParams::new(self.config.nozzle_image_size, Some(self.config.nozzle_confidence));
        let detections = self.nozzle_detector.detect(&crop, &params).map_err(|e| {
            VesselError::stage(ProcessingStage::NozzleExtraction, "detect nozzles", e)
        })?;

        let nozzles = self
            .policy
            .map_ordered(&detections, |nozzle| {
                let patch = crop_region(&crop, &nozzle.bbox);
                let text = self.reader.read(&patch, OcrMode::Nozzle)?;
                Ok(Nozzle {
                    bbox: nozzle.bbox.translate(bbox.x1(), bbox.y1()).to_xywh(),
                    view: view_type,
                    text,
                })
            })
            .into_iter()
            .collect::<VesselResult<Vec<_>>>()?;

        Ok(View {
            bbox,
            view_type,
            nozzles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::TextRecognizer;
    use image::Rgb;

    /// Returns a fixed detection list per inference size.
    #[derive(Debug)]
    struct SizedDetector {
        size: u32,
        boxes: Vec<BoundingBox>,
    }

    impl ObjectDetector for SizedDetector {
        fn detect(&self, _image: &RgbImage, params: &DetectionParams) -> VesselResult<Vec<Detection>> {
            assert_eq!(params.image_size, self.size);
            Ok(self.boxes.iter().map(|b| Detection::new(*b, 0, 0.9)).collect())
        }
    }

    /// Reads the red channel of the patch's top-left pixel as a lookup key.
    #[derive(Debug)]
    struct PixelKeyedEngine;

    impl TextRecognizer for PixelKeyedEngine {
        fn recognize(&self, image: &RgbImage) -> VesselResult<Vec<String>> {
            let key = image.get_pixel(0, 0)[0];
            let lines: &[&str] = match key {
                10 => &["SECTION", "A\u{201d}"],
                20 => &["SETTING BOLT ORIENTATION"],
                100 => &["N1", "6", "\""],
                110 => &["N", "2", "4", "\""],
                _ => &[],
            };
            Ok(lines.iter().map(|s| s.to_string()).collect())
        }
    }

    fn fill(page: &mut RgbImage, bbox: BoundingBox, value: u8) {
        for y in bbox.y1()..bbox.y2() {
            for x in bbox.x1()..bbox.x2() {
                page.put_pixel(x as u32, y as u32, Rgb([value, 0, 0]));
            }
        }
    }

    #[test]
    fn test_classify_view_first_match() {
        assert_eq!(classify_view("FRONT ELEVATION"), ViewType::ElevationView);
        assert_eq!(classify_view("view a\""), ViewType::A);
        assert_eq!(classify_view("VIEW A\u{201d}"), ViewType::A);
        // Only the closing curly quote marks a section view.
        assert_eq!(classify_view("VIEW A\u{201c}"), ViewType::ElevationView);
        assert_eq!(classify_view("Setting Bolt Orientation"), ViewType::SettingBoltOrientation);
        assert_eq!(classify_view("elevation a\" orientation"), ViewType::ElevationView);
        assert_eq!(classify_view("a\" orientation"), ViewType::A);
        assert_eq!(classify_view(""), ViewType::ElevationView);
    }

    #[test]
    fn test_opening_quote_reaches_orientation_rule() {
        assert_eq!(
            classify_view("DETAIL A\u{201c} SETTING BOLT ORIENTATION"),
            ViewType::SettingBoltOrientation
        );
    }

    #[test]
    fn test_view_type_serializes_display_string() {
        assert_eq!(
            serde_json::to_string(&ViewType::SettingBoltOrientation).unwrap(),
            "\"Setting Bolt Orientation\""
        );
        assert_eq!(ViewType::ElevationView.to_string(), "Elevation View");
    }

    #[test]
    fn test_extract_maps_nozzles_to_page_frame() {
        let mut page = RgbImage::new(400, 300);
        // Expanded views start at (70, 70) and (170, 70); their corners key the view label.
        fill(&mut page, BoundingBox::new(70, 70, 75, 75), 10);
        fill(&mut page, BoundingBox::new(170, 70, 175, 75), 20);
        // Nozzle patches at (5, 5) inside each view crop.
        fill(&mut page, BoundingBox::new(75, 75, 80, 80), 100);
        fill(&mut page, BoundingBox::new(175, 75, 180, 80), 110);

        let views = Arc::new(SizedDetector {
            size: 1536,
            boxes: vec![
                BoundingBox::new(100, 100, 140, 140),
                BoundingBox::new(200, 100, 240, 140),
            ],
        });
        let nozzles = Arc::new(SizedDetector {
            size: 1024,
            boxes: vec![BoundingBox::new(5, 5, 15, 12)],
        });
        let extractor = ViewNozzleExtractor::new(
            views,
            nozzles,
            TextRecognitionAdapter::new(Arc::new(PixelKeyedEngine)),
            ViewConfig::default(),
            ParallelPolicy::default(),
        );

        let found = extractor.extract_views(&page).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].bbox, BoundingBox::new(70, 70, 170, 170));
        assert_eq!(found[0].view_type, ViewType::A);
        assert_eq!(found[1].view_type, ViewType::SettingBoltOrientation);

        let flat = extractor.extract(&page).unwrap();
        assert_eq!(
            flat,
            vec![
                Nozzle {
                    bbox: XywhBox([75, 75, 10, 7]),
                    view: ViewType::A,
                    text: "N1 6\"".to_string(),
                },
                Nozzle {
                    bbox: XywhBox([175, 75, 10, 7]),
                    view: ViewType::SettingBoltOrientation,
                    text: "N2 4\"".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_view_clipped_at_page_edge() {
        let page = RgbImage::new(50, 50);
        let extractor = ViewNozzleExtractor::new(
            Arc::new(SizedDetector {
                size: 1536,
                boxes: vec![BoundingBox::new(10, 10, 45, 45)],
            }),
            Arc::new(SizedDetector {
                size: 1024,
                boxes: Vec::new(),
            }),
            TextRecognitionAdapter::new(Arc::new(PixelKeyedEngine)),
            ViewConfig::default(),
            ParallelPolicy::default(),
        );

        let views = extractor.extract_views(&page).unwrap();
        assert_eq!(views[0].bbox, BoundingBox::new(0, 0, 50, 50));
        assert_eq!(views[0].view_type, ViewType::ElevationView);
        assert!(views[0].nozzles.is_empty());
    }
}
