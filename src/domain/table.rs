//! Conversion of recognized table markup into a named list of rows.
//!
//! The drawing tables carry their title in a cell spanning the table width.
//! The widest cell's row is taken as the header row and removed; if the title
//! it yields is unusable, up to two leading data rows are promoted instead.

use crate::processors::XywhBox;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};

/// Leading data rows that may be promoted to the table name.
const MAX_HEADER_ATTEMPTS: usize = 2;

/// A normalized table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableResult {
    pub name: String,
    /// Data rows, header and all-empty rows excluded.
    pub rows: Vec<Vec<String>>,
}

impl TableResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A normalized table with its region box on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    #[serde(flatten)]
    pub table: TableResult,
    pub bbox: XywhBox,
}

struct Cell {
    text: String,
    span: usize,
}

/// Stateless table markup normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableNormalizer;

impl TableNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalizes table markup; `None` means the engine produced no table.
    pub fn normalize(&self, markup: Option<&str>) -> TableResult {
        let Some(markup) = markup else {
            return TableResult::empty();
        };

        let rows = match parse_rows(markup) {
            Some(rows) => rows,
            None => {
                warn!("Failed to build table selectors");
                return TableResult::empty();
            }
        };

        // Widest cell wins, first one on ties.
        let mut max_span = 0;
        let mut header = String::new();
        let mut header_row = None;
        for (row_idx, row) in rows.iter().enumerate() {
            for cell in row {
                if cell.span > max_span {
                    max_span = cell.span;
                    header = cell.text.clone();
                    header_row = Some(row_idx);
                }
            }
        }

        let mut data: Vec<Vec<String>> = rows
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != header_row)
            .map(|(_, row)| row.into_iter().map(|cell| cell.text).collect::<Vec<_>>())
            .filter(|row: &Vec<String>| row.iter().any(|text| !text.is_empty()))
            .collect();

        let mut attempts = 0;
        while header.chars().count() <= 1 {
            if attempts >= MAX_HEADER_ATTEMPTS || data.is_empty() {
                header.clear();
                break;
            }
            header = data.remove(0).join(" ").trim().to_string();
            attempts += 1;
        }

        debug!("Normalized table {:?} with {} rows", header, data.len());
        TableResult { name: header, rows: data }
    }
}

fn parse_rows(markup: &str) -> Option<Vec<Vec<Cell>>> {
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("td, th").ok()?;

    let document = if markup.to_ascii_lowercase().contains("<table") {
        Html::parse_document(markup)
    } else {
        Html::parse_document(&format!("<table>{markup}</table>"))
    };

    let rows = document
        .select(&row_selector)
        .map(|row| row.select(&cell_selector).map(read_cell).collect())
        .collect();
    Some(rows)
}

fn read_cell(cell: ElementRef<'_>) -> Cell {
    let span = cell
        .value()
        .attr("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1);
    let text = cell
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<String>();
    Cell { text, span }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(markup: &str) -> TableResult {
        TableNormalizer::new().normalize(Some(markup))
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_none_is_empty() {
        assert_eq!(TableNormalizer::new().normalize(None), TableResult::empty());
    }

    #[test]
    fn test_colspan_header_row_removed() {
        let html = "<table>\
            <tr><td>a</td><td>b</td></tr>\
            <tr><td colspan=\"2\">NOZZLE SCHEDULE</td></tr>\
            <tr><td>N1</td><td>6\"</td></tr>\
            </table>";
        let table = normalize(html);
        assert_eq!(table.name, "NOZZLE SCHEDULE");
        assert_eq!(table.rows, vec![row(&["a", "b"]), row(&["N1", "6\""])]);
    }

    #[test]
    fn test_first_widest_cell_wins_and_bad_colspan_is_one() {
        let html = "<table>\
            <tr><td colspan=\"x\">skip</td></tr>\
            <tr><td colspan=\"3\">FIRST</td></tr>\
            <tr><td colspan=\"3\">SECOND</td></tr>\
            </table>";
        let table = normalize(html);
        assert_eq!(table.name, "FIRST");
        assert_eq!(table.rows, vec![row(&["skip"]), row(&["SECOND"])]);
    }

    #[test]
    fn test_fallback_promotes_up_to_two_rows() {
        // Header row is the first span-1 cell, which is empty.
        let html = "<tr><td></td><td>x</td></tr>\
            <tr><td>-</td></tr>\
            <tr><td>DESIGN</td><td>DATA</td></tr>\
            <tr><td>P</td><td>10</td></tr>";
        let table = normalize(html);
        assert_eq!(table.name, "DESIGN DATA");
        assert_eq!(table.rows, vec![row(&["P", "10"])]);
    }

    #[test]
    fn test_fallback_gives_up_after_two_attempts() {
        let html = "<tr><td>a</td></tr><tr><td>b</td></tr><tr><td>c</td></tr><tr><td>d</td></tr>";
        let table = normalize(html);
        assert_eq!(table.name, "");
        assert_eq!(table.rows, vec![row(&["d"])]);
    }

    #[test]
    fn test_empty_rows_dropped_and_fragments_joined() {
        let html = "<table>\
            <tr><th colspan=\"2\"> TITLE </th></tr>\
            <tr><td> </td><td></td></tr>\
            <tr></tr>\
            <tr><td><b> 12 </b> <i>mm</i></td><td>ok</td></tr>\
            </table>";
        let table = normalize(html);
        assert_eq!(table.name, "TITLE");
        assert_eq!(table.rows, vec![row(&["12mm", "ok"])]);
    }

    #[test]
    fn test_header_only_table() {
        let table = normalize("<tr><td colspan=\"3\">HEAD</td></tr>");
        assert_eq!(
            table,
            TableResult {
                name: "HEAD".to_string(),
                rows: Vec::new(),
            }
        );
    }

    #[test]
    fn test_no_cells_gives_empty_name() {
        let table = normalize("<table></table>");
        assert_eq!(table, TableResult::empty());
    }

    #[test]
    fn test_normalize_is_repeatable() {
        let html = "<html><body><table><tr><td colspan=\"2\">T</td></tr><tr><td>1</td><td>2</td></tr></table></body></html>";
        assert_eq!(normalize(html), normalize(html));
    }

    #[test]
    fn test_entry_serializes_flat() {
        let entry = TableEntry {
            table: TableResult {
                name: "T".to_string(),
                rows: vec![row(&["1"])],
            },
            bbox: XywhBox([1, 2, 3, 4]),
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"name":"T","rows":[["1"]],"bbox":[1,2,3,4]}"#
        );
    }
}
