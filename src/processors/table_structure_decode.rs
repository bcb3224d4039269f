//! Table structure decoding.
//!
//! Turns SLANet-style structure logits and cell box regressions into HTML
//! structure tokens and cell rectangles, and renders the tokens back into
//! HTML markup with recognized cell text filled in.

use crate::core::errors::{VesselError, VesselResult};
use crate::processors::geometry::BoundingBox;
use ndarray::{ArrayView1, ArrayView2};
use std::path::Path;

/// Decoded structure of one table image.
#[derive(Debug, Clone, Default)]
pub struct DecodedTable {
    /// HTML structure tokens without the document wrapper.
    pub tokens: Vec<String>,
    /// One box per cell token, in token order, in source image coordinates.
    pub cells: Vec<BoundingBox>,
    /// Mean probability of the emitted tokens.
    pub score: f32,
}

/// Converts structure model outputs to HTML tokens and cell boxes.
#[derive(Debug, Clone)]
pub struct TableStructureDecode {
    /// `["sos", <dict...>, "eos"]`
    character_dict: Vec<String>,
    /// Token indices that carry a cell box (`<td>`, `<td`, `<td></td>`).
    td_token_indices: Vec<usize>,
    end_idx: usize,
}

impl TableStructureDecode {
    /// Builds the decoder from raw dictionary entries.
    ///
    /// `<td></td>` is added and `<td>` removed, then `sos`/`eos` wrap the list.
    pub fn new<S: AsRef<str>>(entries: impl IntoIterator<Item = S>) -> Self {
        let mut dict: Vec<String> = entries
            .into_iter()
            .map(|s| s.as_ref().trim_end().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if !dict.iter().any(|s| s == "<td></td>") {
            dict.push("<td></td>".to_string());
        }
        if let Some(pos) = dict.iter().position(|s| s == "<td>") {
            dict.remove(pos);
        }

        let mut character_dict = Vec::with_capacity(dict.len() + 2);
        character_dict.push("sos".to_string());
        character_dict.extend(dict);
        character_dict.push("eos".to_string());

        let td_token_indices = ["<td>", "<td", "<td></td>"]
            .iter()
            .filter_map(|&token| character_dict.iter().position(|s| s == token))
            .collect();
        let end_idx = character_dict.len() - 1;

        Self {
            character_dict,
            td_token_indices,
            end_idx,
        }
    }

    /// Reads the structure dictionary (one token per line).
    ///
    /// Leading spaces are kept: attribute tokens such as ` colspan="2"` need them.
    pub fn from_dict_path(path: impl AsRef<Path>) -> VesselResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| VesselError::ConfigError {
            message: format!("Failed to open dictionary file '{}': {}", path.display(), e),
        })?;
        Ok(Self::new(raw.lines()))
    }

    /// Vocabulary size the structure head must produce.
    pub fn vocab_size(&self) -> usize {
        self.character_dict.len()
    }

    /// Decodes one image.
    ///
    /// * `structure_probs` - `[seq_len, vocab]`
    /// * `bbox_preds` - `[seq_len, 4 | 8]`, normalized to the padded square input
    /// * `long_side` - longest side of the source image
    pub fn decode(
        &self,
        structure_probs: ArrayView2<f32>,
        bbox_preds: ArrayView2<f32>,
        long_side: f32,
        src_w: u32,
        src_h: u32,
    ) -> DecodedTable {
        let mut decoded = DecodedTable::default();
        let mut probs = Vec::new();

        for (seq_idx, step) in structure_probs.rows().into_iter().enumerate() {
            let (token_idx, prob) = step
                .iter()
                .copied()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (i, p)| {
                    if p > best.1 { (i, p) } else { best }
                });

            if seq_idx > 0 && token_idx == self.end_idx {
                break;
            }
            if token_idx == 0 || token_idx == self.end_idx {
                continue;
            }
            let Some(token) = self.character_dict.get(token_idx) else {
                continue;
            };

            decoded.tokens.push(token.clone());
            probs.push(prob);

            if self.td_token_indices.contains(&token_idx) && seq_idx < bbox_preds.nrows() {
                let coords = bbox_preds.row(seq_idx);
                decoded
                    .cells
                    .push(cell_box(coords, long_side, src_w, src_h));
            }
        }

        decoded.score = if probs.is_empty() {
            0.0
        } else {
            probs.iter().sum::<f32>() / probs.len() as f32
        };
        tracing::debug!(
            tokens = decoded.tokens.len(),
            cells = decoded.cells.len(),
            score = decoded.score,
            "decoded table structure"
        );
        decoded
    }
}

/// Axis-aligned cell box from 4 (`x1,y1,x2,y2`) or 8 (quad) normalized values.
fn cell_box(
    coords: ArrayView1<f32>,
    long_side: f32,
    src_w: u32,
    src_h: u32,
) -> BoundingBox {
    let values: Vec<f32> = coords.iter().map(|v| v * long_side).collect();
    let xs = values.iter().step_by(2).copied();
    let ys = values.iter().skip(1).step_by(2).copied();
    let (x_min, x_max) = xs.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (y_min, y_max) = ys.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !x_min.is_finite() || !y_min.is_finite() {
        return BoundingBox::default();
    }
    BoundingBox::from_f32(x_min, y_min, x_max, y_max).clip(src_w, src_h)
}

/// Assigns each OCR line to the cell it overlaps best.
///
/// Lines are ranked against cells by `(1 - IoU, corner distance)`; a cell's
/// text is its lines joined with spaces in OCR order.
pub fn match_cells(cells: &[BoundingBox], lines: &[(BoundingBox, String)]) -> Vec<Option<String>> {
    let mut texts: Vec<Vec<&str>> = vec![Vec::new(); cells.len()];

    for (line_box, text) in lines {
        let best = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| (idx, 1.0 - line_box.iou(cell), corner_distance(line_box, cell)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));
        if let Some((idx, _, _)) = best {
            texts[idx].push(text.as_str());
        }
    }

    texts
        .into_iter()
        .map(|parts| (!parts.is_empty()).then(|| parts.join(" ")))
        .collect()
}

fn corner_distance(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let all = (a.x1() - b.x1()).abs()
        + (a.y1() - b.y1()).abs()
        + (a.x2() - b.x2()).abs()
        + (a.y2() - b.y2()).abs();
    let top_left = (a.x1() - b.x1()).abs() + (a.y1() - b.y1()).abs();
    let bottom_right = (a.x2() - b.x2()).abs() + (a.y2() - b.y2()).abs();
    (all + top_left.min(bottom_right)) as f32
}

/// Renders structure tokens into `<table>` markup, filling cells in order.
pub fn render_table_html(tokens: &[String], cell_texts: &[Option<String>]) -> String {
    let mut html = String::from("<html><body>");
    let has_table_tag = tokens.first().is_some_and(|t| t.contains("<table"));
    if !has_table_tag {
        html.push_str("<table>");
    }

    let mut td_index = 0usize;
    let mut idx = 0usize;
    while idx < tokens.len() {
        let tag = tokens[idx].as_str();

        if tag == "<td></td>" || tag.starts_with("<td") {
            let (attrs, next_index) = if tag == "<td></td>" {
                (String::new(), idx + 1)
            } else {
                parse_td_tag(tokens, idx)
            };
            html.push_str("<td");
            html.push_str(&attrs);
            html.push('>');
            if let Some(Some(text)) = cell_texts.get(td_index) {
                html.push_str(&escape_html(text));
            }
            html.push_str("</td>");
            td_index += 1;
            idx = next_index;
            continue;
        }

        html.push_str(tag);
        idx += 1;
    }

    if !has_table_tag {
        html.push_str("</table>");
    }
    html.push_str("</body></html>");
    html
}

/// Gathers a `<td ...>` opening tag split across tokens, e.g.
/// `["<td", " colspan=\"2\"", ">", "</td>"]`.
///
/// Returns the attribute text and the index after the cell's closing token.
fn parse_td_tag(tokens: &[String], start_idx: usize) -> (String, usize) {
    let mut attrs = String::new();
    if let Some(stripped) = tokens[start_idx].strip_prefix("<td")
        && let Some(before_gt) = stripped.split('>').next()
    {
        attrs.push_str(before_gt);
    }

    let mut idx = start_idx + 1;
    while idx < tokens.len() {
        let token = tokens[idx].as_str();
        if matches!(token, ">" | "</td>" | "<tr>" | "</tr>") || token.starts_with("<td") {
            break;
        }
        attrs.push_str(token);
        idx += 1;
    }

    while idx < tokens.len() {
        let token = tokens[idx].as_str();
        if token == "</td>" {
            idx += 1;
            break;
        }
        if token.starts_with("<td") || token == "<tr>" || token == "</tr>" {
            break;
        }
        idx += 1;
    }

    (attrs, idx.max(start_idx + 1))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dictionary_layout() {
        let decoder = TableStructureDecode::new(["<tr>", "<td>", "</tr>", "<td", ">", "</td>"]);
        // sos, <tr>, </tr>, <td, >, </td>, <td></td>, eos
        assert_eq!(decoder.vocab_size(), 8);
        assert_eq!(decoder.end_idx, 7);
        assert_eq!(decoder.td_token_indices, vec![3, 6]);
    }

    #[test]
    fn test_decode_stops_at_eos_and_collects_cells() {
        let decoder = TableStructureDecode::new(["<tr>", "</tr>"]);
        // sos=0, <tr>=1, </tr>=2, <td></td>=3, eos=4
        let sequence = [0usize, 1, 3, 3, 2, 4, 1];
        let mut probs = Array2::<f32>::zeros((sequence.len(), 5));
        for (t, &i) in sequence.iter().enumerate() {
            probs[[t, i]] = 0.8;
        }
        let mut boxes = Array2::<f32>::zeros((sequence.len(), 4));
        boxes.row_mut(2).assign(&ndarray::arr1(&[0.0, 0.0, 0.5, 0.25]));
        boxes.row_mut(3).assign(&ndarray::arr1(&[0.5, 0.0, 1.0, 0.25]));

        let decoded = decoder.decode(probs.view(), boxes.view(), 200.0, 200, 100);
        assert_eq!(decoded.tokens, tokens(&["<tr>", "<td></td>", "<td></td>", "</tr>"]));
        assert_eq!(
            decoded.cells,
            vec![BoundingBox::new(0, 0, 100, 50), BoundingBox::new(100, 0, 200, 50)]
        );
        assert!((decoded.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_render_with_spans_and_escaping() {
        let toks = tokens(&[
            "<tr>", "<td", " colspan=\"2\"", ">", "</td>", "</tr>", "<tr>", "<td></td>",
            "<td></td>", "</tr>",
        ]);
        let texts = vec![
            Some("NOZZLE SCHEDULE".to_string()),
            Some("A<B".to_string()),
            None,
        ];
        let html = render_table_html(&toks, &texts);
        assert_eq!(
            html,
            "<html><body><table><tr><td colspan=\"2\">NOZZLE SCHEDULE</td></tr>\
             <tr><td>A&lt;B</td><td></td></tr></table></body></html>"
        );
    }

    #[test]
    fn test_match_cells_prefers_overlap() {
        let cells = vec![BoundingBox::new(0, 0, 100, 40), BoundingBox::new(100, 0, 200, 40)];
        let lines = vec![
            (BoundingBox::new(110, 5, 180, 30), "6\"".to_string()),
            (BoundingBox::new(5, 5, 60, 30), "N1".to_string()),
            (BoundingBox::new(120, 8, 190, 35), "RF".to_string()),
        ];
        let texts = match_cells(&cells, &lines);
        assert_eq!(texts, vec![Some("N1".to_string()), Some("6\" RF".to_string())]);
        assert_eq!(match_cells(&cells, &[]), vec![None, None]);
    }
}
