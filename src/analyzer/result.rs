//! The per-page output record.

use crate::domain::{NoteEntry, Nozzle, TableEntry};
use serde::Serialize;
use std::time::Duration;

/// Everything extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// Elapsed analysis time, e.g. `"3.42 Seconds"`.
    pub time: String,
    pub page: u32,
    pub tables: Vec<TableEntry>,
    /// Nozzles of all views, flattened.
    pub nozzles: Vec<Nozzle>,
    pub notes: Vec<NoteEntry>,
}

/// Formats a duration as seconds with two decimals.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2} Seconds", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NotePayload, TableResult, ViewType};
    use crate::processors::XywhBox;
    use serde_json::json;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(3421)), "3.42 Seconds");
        assert_eq!(format_elapsed(Duration::ZERO), "0.00 Seconds");
    }

    #[test]
    fn test_page_result_json_shape() {
        let result = PageResult {
            time: "1.00 Seconds".to_string(),
            page: 2,
            tables: vec![TableEntry {
                table: TableResult {
                    name: "DESIGN DATA".to_string(),
                    rows: vec![vec!["P".to_string(), "10".to_string()]],
                },
                bbox: XywhBox([0, 0, 10, 10]),
            }],
            nozzles: vec![Nozzle {
                bbox: XywhBox([1, 1, 2, 2]),
                view: ViewType::ElevationView,
                text: "N1 6\"".to_string(),
            }],
            notes: vec![NoteEntry {
                notes: NotePayload::Structured(json!(["note"])),
                bbox: XywhBox([5, 5, 5, 5]),
            }],
        };

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "time": "1.00 Seconds",
                "page": 2,
                "tables": [{"name": "DESIGN DATA", "rows": [["P", "10"]], "bbox": [0, 0, 10, 10]}],
                "nozzles": [{"bbox": [1, 1, 2, 2], "view": "Elevation View", "text": "N1 6\""}],
                "notes": [{"notes": ["note"], "bbox": [5, 5, 5, 5]}]
            })
        );
    }
}
