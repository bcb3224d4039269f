//! Annotated page rendering for visual checks of a [`PageResult`].
//!
//! Tables and nozzles are outlined in blue, notes in red. When a font is
//! available each box gets a filled label: the table name, `"{text} | {view}"`
//! for nozzles, and the note payload as compact JSON.

use crate::analyzer::PageResult;
use crate::core::errors::{ProcessingStage, VesselError, VesselResult};
use crate::processors::BoundingBox;
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info, warn};

const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Labels longer than this are cut and end with "...".
const MAX_LABEL_CHARS: usize = 120;

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct PageAnnotator {
    font: Option<FontVec>,
    font_scale: f32,
    thickness: i32,
}

impl std::fmt::Debug for PageAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageAnnotator")
            .field("font", &self.font.is_some())
            .field("font_scale", &self.font_scale)
            .field("thickness", &self.thickness)
            .finish()
    }
}

impl Default for PageAnnotator {
    fn default() -> Self {
        Self::without_font()
    }
}

impl PageAnnotator {
    /// Boxes only, no labels.
    pub fn without_font() -> Self {
        Self {
            font: None,
            font_scale: 18.0,
            thickness: 2,
        }
    }

    /// Loads `font_path` if given, otherwise the first usable system font.
    ///
    /// Falls back to unlabeled boxes when no font can be loaded.
    pub fn new(font_path: Option<&Path>) -> Self {
        let candidates: Vec<&Path> = match font_path {
            Some(path) => vec![path],
            None => SYSTEM_FONTS.iter().map(Path::new).collect(),
        };

        for path in candidates {
            match std::fs::read(path).map(FontVec::try_from_vec) {
                Ok(Ok(font)) => {
                    info!("Loaded annotation font: {}", path.display());
                    return Self {
                        font: Some(font),
                        ..Self::without_font()
                    };
                }
                Ok(Err(_)) => warn!("Failed to parse font file: {}", path.display()),
                Err(e) if font_path.is_some() => {
                    warn!("Failed to read font file {}: {}", path.display(), e)
                }
                Err(_) => {}
            }
        }

        debug!("No font found, annotation labels will be skipped");
        Self::without_font()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draws the result onto a copy of `page`.
    pub fn render(&self, page: &RgbImage, result: &PageResult) -> RgbImage {
        let mut canvas = page.clone();

        for table in &result.tables {
            let bbox = table.bbox.to_bbox();
            self.draw_box(&mut canvas, &bbox, BLUE);
            if !table.table.name.is_empty() {
                self.draw_label(&mut canvas, &bbox, &table.table.name, BLUE);
            }
        }

        for nozzle in &result.nozzles {
            let bbox = nozzle.bbox.to_bbox();
            self.draw_box(&mut canvas, &bbox, BLUE);
            let label = format!("{} | {}", nozzle.text, nozzle.view);
            self.draw_label(&mut canvas, &bbox, &label, BLUE);
        }

        for note in &result.notes {
            let bbox = note.bbox.to_bbox();
            self.draw_box(&mut canvas, &bbox, RED);
            let label = serde_json::to_string(&note.notes).unwrap_or_default();
            self.draw_label(&mut canvas, &bbox, &label, RED);
        }

        canvas
    }

    /// Renders and writes the annotated page; the format follows the extension.
    pub fn save(&self, page: &RgbImage, result: &PageResult, path: &Path) -> VesselResult<()> {
        let canvas = self.render(page, result);
        canvas.save(path).map_err(|e| {
            VesselError::stage(
                ProcessingStage::Annotation,
                format!("failed to write {}", path.display()),
                e,
            )
        })?;
        info!("Annotated page written to {}", path.display());
        Ok(())
    }

    fn draw_box(&self, canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
        for t in 0..self.thickness {
            let w = bbox.width() + 2 * t;
            let h = bbox.height() + 2 * t;
            if w <= 0 || h <= 0 {
                continue;
            }
            let rect = Rect::at(bbox.x1() - t, bbox.y1() - t).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }

    fn draw_label(&self, canvas: &mut RgbImage, bbox: &BoundingBox, text: &str, color: Rgb<u8>) {
        let Some(ref font) = self.font else { return };
        if text.is_empty() {
            return;
        }

        let text = truncate_label(text);
        let scale = PxScale::from(self.font_scale);
        let (text_w, text_h) = text_size(scale, font, &text);
        let pad = 2;
        let label_h = text_h as i32 + 2 * pad;

        // Above the box when there is room, otherwise inside its top edge.
        let y = if bbox.y1() - label_h >= 0 {
            bbox.y1() - label_h
        } else {
            bbox.y1()
        };
        let background = Rect::at(bbox.x1(), y).of_size(text_w + 2 * pad as u32, label_h as u32);
        draw_filled_rect_mut(canvas, background, color);
        draw_text_mut(canvas, WHITE, bbox.x1() + pad, y + pad, scale, font, &text);
    }
}

fn truncate_label(text: &str) -> String {
    if text.chars().count() <= MAX_LABEL_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_LABEL_CHARS).collect();
    out.push_str("...");
    out
}
