//! Reading-order sorting for detected text boxes.

use crate::processors::geometry::BoundingBox;

/// Boxes whose top edges differ by less than this are on the same line.
const SAME_LINE_TOLERANCE: i32 = 10;

/// Sorts items from top to bottom, then left to right.
///
/// After the primary (y, x) sort, adjacent boxes whose top edges are within
/// 10 px are treated as one line and reordered by their left edge.
pub fn sort_reading_order<T>(mut items: Vec<(BoundingBox, T)>) -> Vec<(BoundingBox, T)> {
    items.sort_by_key(|(bbox, _)| (bbox.y1(), bbox.x1()));

    let n = items.len();
    for i in 0..n.saturating_sub(1) {
        for j in (0..=i).rev() {
            let (curr, next) = (&items[j].0, &items[j + 1].0);
            if (next.y1() - curr.y1()).abs() < SAME_LINE_TOLERANCE && next.x1() < curr.x1() {
                items.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
    items
}
