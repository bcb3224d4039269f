//! Page segmentation into note and table regions.

use crate::core::config::RegionConfig;
use crate::core::errors::{ProcessingStage, VesselError, VesselResult};
use crate::core::traits::{DetectionParams, ObjectDetector};
use crate::processors::BoundingBox;
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;

/// Detector class id for note regions.
pub const NOTES_CLASS: usize = 0;
/// Detector class id for table regions.
pub const TABLE_CLASS: usize = 1;

/// Note and table boxes of one page, in detector output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSet {
    notes: Vec<BoundingBox>,
    tables: Vec<BoundingBox>,
}

impl RegionSet {
    pub fn new(notes: Vec<BoundingBox>, tables: Vec<BoundingBox>) -> Self {
        Self { notes, tables }
    }

    pub fn notes(&self) -> &[BoundingBox] {
        &self.notes
    }

    pub fn tables(&self) -> &[BoundingBox] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.tables.is_empty()
    }
}

/// Splits the two-class region detector output into a [`RegionSet`].
#[derive(Debug, Clone)]
pub struct RegionDetector {
    detector: Arc<dyn ObjectDetector>,
    params: DetectionParams,
}

impl RegionDetector {
    pub fn new(detector: Arc<dyn ObjectDetector>, config: &RegionConfig) -> Self {
        Self {
            detector,
            params: DetectionParams::new(config.image_size, Some(config.confidence)),
        }
    }

    pub fn detect(&self, page: &RgbImage) -> VesselResult<RegionSet> {
        let detections = self
            .detector
            .detect(page, &self.params)
            .map_err(|e| VesselError::stage(ProcessingStage::RegionDetection, "detect regions", e))?;

        let mut notes = Vec::new();
        let mut tables = Vec::new();
        for detection in detections {
            match detection.class_id {
                NOTES_CLASS => notes.push(detection.bbox),
                TABLE_CLASS => tables.push(detection.bbox),
                other => debug!("Ignoring region of unknown class {}", other),
            }
        }

        debug!("Detected {} note and {} table regions", notes.len(), tables.len());
        Ok(RegionSet::new(notes, tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::Detection;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeDetector {
        detections: Vec<Detection>,
        seen: Mutex<Vec<DetectionParams>>,
    }

    impl ObjectDetector for FakeDetector {
        fn detect(&self, _image: &RgbImage, params: &DetectionParams) -> VesselResult<Vec<Detection>> {
            self.seen.lock().unwrap().push(*params);
            Ok(self.detections.clone())
        }
    }

    #[test]
    fn test_regions_split_by_class_in_order() {
        let b = |x: i32| BoundingBox::new(x, 0, x + 10, 10);
        let fake = Arc::new(FakeDetector {
            detections: vec![
                Detection::new(b(0), 1, 0.9),
                Detection::new(b(20), 0, 0.8),
                Detection::new(b(40), 2, 0.99),
                Detection::new(b(60), 1, 0.7),
            ],
            ..Default::default()
        });
        let detector = RegionDetector::new(fake.clone(), &RegionConfig::default());

        let regions = detector.detect(&RgbImage::new(100, 20)).unwrap();
        assert_eq!(regions.notes(), &[b(20)]);
        assert_eq!(regions.tables(), &[b(0), b(60)]);

        let seen = fake.seen.lock().unwrap();
        assert_eq!(seen[0], DetectionParams::new(1536, Some(0.5)));
    }

    #[test]
    fn test_empty_page_yields_empty_set() {
        let detector = RegionDetector::new(Arc::new(FakeDetector::default()), &RegionConfig::default());
        assert!(detector.detect(&RgbImage::new(8, 8)).unwrap().is_empty());
    }
}
