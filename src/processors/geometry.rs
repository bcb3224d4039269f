//! Geometric primitives shared by detectors, extractors and the annotator.
//!
//! All page-level geometry is integer pixel geometry. Detector outputs are
//! truncated to integers once, when a [`Detection`] is built, and every later
//! step (margin expansion, clipping, frame remapping) stays exact.

use serde::{Deserialize, Serialize};

/// Axis-aligned box with integer corners, `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl BoundingBox {
    /// Creates a box from two corners, swapping coordinates if needed.
    #[inline]
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Creates a box from floating-point corners, truncating toward zero.
    pub fn from_f32(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    #[inline]
    pub fn x1(&self) -> i32 {
        self.x1
    }

    #[inline]
    pub fn y1(&self) -> i32 {
        self.y1
    }

    #[inline]
    pub fn x2(&self) -> i32 {
        self.x2
    }

    #[inline]
    pub fn y2(&self) -> i32 {
        self.y2
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// True when the box covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width()) * i64::from(self.height())
    }

    /// Grows every side by `margin`, then clips to `[0, width] x [0, height]`.
    pub fn expand(&self, margin: i32, width: u32, height: u32) -> Self {
        Self::new(
            self.x1 - margin,
            self.y1 - margin,
            self.x2 + margin,
            self.y2 + margin,
        )
        .clip(width, height)
    }

    /// Shifts the box by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Clamps all corners to `[0, width] x [0, height]`.
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    /// Converts to `[x, y, width, height]`.
    pub fn to_xywh(&self) -> XywhBox {
        XywhBox([self.x1, self.y1, self.width(), self.height()])
    }

    /// Overlapping region, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        (x2 > x1 && y2 > y1).then(|| Self::new(x1, y1, x2, y2))
    }

    /// Intersection over union.
    pub fn iou(&self, other: &Self) -> f32 {
        let inter = self.intersection(other).map_or(0, |b| b.area());
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            0.0
        } else {
            inter as f32 / union as f32
        }
    }
}

/// `[x, y, width, height]`, serialized as a four-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XywhBox(pub [i32; 4]);

impl XywhBox {
    /// Converts back to corner form.
    pub fn to_bbox(&self) -> BoundingBox {
        let [x, y, w, h] = self.0;
        BoundingBox::new(x, y, x + w, y + h)
    }
}

/// One detector hit in the coordinate frame of the image given to the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: usize, score: f32) -> Self {
        Self {
            bbox,
            class_id,
            score,
        }
    }
}
