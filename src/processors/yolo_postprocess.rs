//! Decoding of ultralytics-style detector outputs.
//!
//! The exported head produces `[1, 4 + num_classes, num_anchors]`: box center,
//! size, then one score per class, all in letterboxed input coordinates.

use crate::processors::geometry::{BoundingBox, Detection};
use crate::processors::resize::LetterboxInfo;
use ndarray::ArrayView2;

/// Post-processing settings for one detector call.
#[derive(Debug, Clone, Copy)]
pub struct YoloPostProcess {
    /// Minimum class score to keep a candidate.
    pub conf_threshold: f32,
    /// Overlap above which a lower-scored box of the same class is dropped.
    pub iou_threshold: f32,
    /// Maximum detections returned.
    pub max_detections: usize,
}

impl Default for YoloPostProcess {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    class_id: usize,
    score: f32,
}

impl Candidate {
    fn iou(&self, other: &Candidate) -> f32 {
        let iw = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let ih = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = iw * ih;
        let area_a = (self.x2 - self.x1) * (self.y2 - self.y1);
        let area_b = (other.x2 - other.x1) * (other.y2 - other.y1);
        let union = area_a + area_b - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

impl YoloPostProcess {
    /// Decodes one image's prediction matrix laid out as `[4 + nc, anchors]`.
    ///
    /// Boxes are mapped back through `letterbox` and clipped to
    /// `src_w x src_h`. Results are sorted by descending score.
    pub fn apply(
        &self,
        preds: ArrayView2<f32>,
        letterbox: &LetterboxInfo,
        src_w: u32,
        src_h: u32,
    ) -> Vec<Detection> {
        let rows = preds.nrows();
        if rows <= 4 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for anchor in preds.columns() {
            let (class_id, score) = anchor
                .iter()
                .skip(4)
                .copied()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (idx, s)| {
                    if s > best.1 { (idx, s) } else { best }
                });
            if score < self.conf_threshold {
                continue;
            }

            let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
            let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
            candidates.push(Candidate {
                x1: x1.clamp(0.0, src_w as f32),
                y1: y1.clamp(0.0, src_h as f32),
                x2: x2.clamp(0.0, src_w as f32),
                y2: y2.clamp(0.0, src_h as f32),
                class_id,
                score,
            });
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut kept: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.max_detections {
                break;
            }
            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id && k.iou(&candidate) > self.iou_threshold
            });
            if !suppressed {
                kept.push(candidate);
            }
        }

        kept.into_iter()
            .map(|c| {
                Detection::new(
                    BoundingBox::from_f32(c.x1, c.y1, c.x2, c.y2),
                    c.class_id,
                    c.score,
                )
            })
            .collect()
    }
}
