//! Post-processing for DB (Differentiable Binarization) text detection models.
//!
//! [`DBPostProcess`] turns the probability map into axis-aligned text boxes:
//! binarize, label connected components, score each component's bounding
//! rectangle on the probability map, then unclip (expand) the survivors and map
//! them back to the source image.

use crate::processors::geometry::BoundingBox;
use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use ndarray::ArrayView2;

/// Post-processor for DB text detection models.
#[derive(Debug, Clone)]
pub struct DBPostProcess {
    /// Threshold for binarizing the prediction map (default: 0.3).
    pub thresh: f32,
    /// Threshold for filtering boxes by their mean probability (default: 0.6).
    pub box_thresh: f32,
    /// Maximum number of candidate components to consider (default: 1000).
    pub max_candidates: usize,
    /// Ratio for unclipping (expanding) boxes (default: 1.5).
    pub unclip_ratio: f32,
    /// Minimum side length for detected boxes.
    pub min_size: f32,
}

impl Default for DBPostProcess {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    x_min: u32,
    y_min: u32,
    x_max: u32,
    y_max: u32,
}

impl DBPostProcess {
    /// Creates a new `DBPostProcess` instance with optional overrides.
    pub fn new(thresh: Option<f32>, box_thresh: Option<f32>, unclip_ratio: Option<f32>) -> Self {
        Self {
            thresh: thresh.unwrap_or(0.3),
            box_thresh: box_thresh.unwrap_or(0.6),
            max_candidates: 1000,
            unclip_ratio: unclip_ratio.unwrap_or(1.5),
            min_size: 3.0,
        }
    }

    /// Extracts text boxes from one probability map.
    ///
    /// `ratio_h`/`ratio_w` are the scales that took the source image to the
    /// detector input; boxes are returned in source coordinates with their
    /// scores, in component label order (top-to-bottom scan order).
    pub fn apply(
        &self,
        pred: ArrayView2<f32>,
        ratio_h: f32,
        ratio_w: f32,
        src_w: u32,
        src_h: u32,
    ) -> Vec<(BoundingBox, f32)> {
        let (height, width) = (pred.nrows() as u32, pred.ncols() as u32);
        if height == 0 || width == 0 {
            return Vec::new();
        }

        let mut mask = GrayImage::new(width, height);
        for ((y, x), &p) in pred.indexed_iter() {
            if p > self.thresh {
                mask.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }

        let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
        let mut extents: Vec<Option<Extent>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if extents.len() < label {
                extents.resize(label, None);
            }
            let slot = &mut extents[label - 1];
            *slot = Some(match *slot {
                None => Extent {
                    x_min: x,
                    y_min: y,
                    x_max: x,
                    y_max: y,
                },
                Some(e) => Extent {
                    x_min: e.x_min.min(x),
                    y_min: e.y_min.min(y),
                    x_max: e.x_max.max(x),
                    y_max: e.y_max.max(y),
                },
            });
        }

        tracing::debug!(
            "DBPostProcess: pred {}x{}, {} components",
            width,
            height,
            extents.len()
        );

        let mut boxes = Vec::new();
        for extent in extents.into_iter().flatten().take(self.max_candidates) {
            let w = (extent.x_max - extent.x_min + 1) as f32;
            let h = (extent.y_max - extent.y_min + 1) as f32;
            if w.min(h) < self.min_size {
                continue;
            }

            let score = Self::box_score(&pred, &extent);
            if score < self.box_thresh {
                continue;
            }

            let distance = w * h * self.unclip_ratio / (2.0 * (w + h));
            let (uw, uh) = (w + 2.0 * distance, h + 2.0 * distance);
            if uw.min(uh) < self.min_size + 2.0 {
                continue;
            }

            let x1 = (extent.x_min as f32 - distance) / ratio_w;
            let y1 = (extent.y_min as f32 - distance) / ratio_h;
            let x2 = (extent.x_max as f32 + 1.0 + distance) / ratio_w;
            let y2 = (extent.y_max as f32 + 1.0 + distance) / ratio_h;
            let bbox = BoundingBox::new(
                x1.round() as i32,
                y1.round() as i32,
                x2.round() as i32,
                y2.round() as i32,
            )
            .clip(src_w, src_h);
            if !bbox.is_empty() {
                boxes.push((bbox, score));
            }
        }
        boxes
    }

    /// Mean probability inside the component's bounding rectangle.
    fn box_score(pred: &ArrayView2<f32>, extent: &Extent) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for y in extent.y_min..=extent.y_max {
            for x in extent.x_min..=extent.x_max {
                sum += pred[[y as usize, x as usize]];
                count += 1;
            }
        }
        if count == 0 { 0.0 } else { sum / count as f32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_single_component_unclipped() {
        let mut pred = Array2::<f32>::zeros((40, 100));
        for y in 10..20 {
            for x in 20..60 {
                pred[[y, x]] = 0.9;
            }
        }

        let boxes = DBPostProcess::default().apply(pred.view(), 1.0, 1.0, 100, 40);
        assert_eq!(boxes.len(), 1);
        let (bbox, score) = boxes[0];
        assert!((score - 0.9).abs() < 1e-5);
        // 40x10 component: distance = 400 * 1.5 / 100 = 6
        assert_eq!(bbox, BoundingBox::new(14, 4, 66, 26));
    }

    #[test]
    fn test_small_and_faint_components_dropped() {
        let mut pred = Array2::<f32>::zeros((40, 100));
        // 2px tall line: below min size
        for x in 10..50 {
            pred[[5, x]] = 0.9;
            pred[[6, x]] = 0.9;
        }
        // above thresh but below box_thresh
        for y in 20..30 {
            for x in 60..90 {
                pred[[y, x]] = 0.4;
            }
        }
        let boxes = DBPostProcess::default().apply(pred.view(), 1.0, 1.0, 100, 40);
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_boxes_scaled_to_source() {
        let mut pred = Array2::<f32>::zeros((64, 64));
        for y in 16..32 {
            for x in 16..48 {
                pred[[y, x]] = 1.0;
            }
        }
        let boxes = DBPostProcess::default().apply(pred.view(), 2.0, 2.0, 32, 32);
        assert_eq!(boxes.len(), 1);
        let (bbox, _) = boxes[0];
        assert!(bbox.x1() >= 0 && bbox.x2() <= 32);
        assert!(bbox.y1() < 8 && bbox.y2() > 16);
    }
}
