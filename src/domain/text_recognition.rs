//! Label reading on top of a line-level [`TextRecognizer`].
//!
//! Nozzle call-outs are short labels like `N1 6"`. The OCR engine tends to
//! split them into the wrong number of lines and to misread the trailing inch
//! mark, so [`OcrMode::Nozzle`] applies a fixed token repair table before the
//! tokens are joined.

use crate::core::errors::VesselResult;
use crate::core::traits::TextRecognizer;
use image::RgbImage;
use std::sync::Arc;

/// How recognized tokens are turned into a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrMode {
    /// Tokens joined with single spaces.
    #[default]
    Normal,
    /// Tokens repaired with [`repair_nozzle_tokens`], then joined.
    Nozzle,
}

/// Applies the nozzle token repair table.
///
/// | tokens | result |
/// |---|---|
/// | 0 | unchanged |
/// | 1 | the token is replaced by `"` |
/// | 2 | unchanged |
/// | 3 | `[a, b, c]` becomes `[a, bc]` |
/// | 4 | `[a, b, c, d]` becomes `[ab, cd]` |
/// | 5+ | the last token is replaced by `"` |
pub fn repair_nozzle_tokens(mut tokens: Vec<String>) -> Vec<String> {
    match tokens.len() {
        0 | 2 => tokens,
        3 => {
            let c = tokens.remove(2);
            tokens[1].push_str(&c);
            tokens
        }
        4 => {
            let d = tokens.remove(3);
            let c = tokens.remove(2);
            let b = tokens.remove(1);
            tokens[0].push_str(&b);
            tokens.push(c + &d);
            tokens
        }
        _ => {
            if let Some(last) = tokens.last_mut() {
                *last = "\"".to_string();
            }
            tokens
        }
    }
}

/// Reads one image patch into a single label string.
#[derive(Debug, Clone)]
pub struct TextRecognitionAdapter {
    engine: Arc<dyn TextRecognizer>,
}

impl TextRecognitionAdapter {
    pub fn new(engine: Arc<dyn TextRecognizer>) -> Self {
        Self { engine }
    }

    /// Recognizes `patch` and joins the tokens with single spaces.
    ///
    /// A patch with zero width or height reads as the empty string without
    /// calling the engine.
    pub fn read(&self, patch: &RgbImage, mode: OcrMode) -> VesselResult<String> {
        let tokens = self.tokens(patch)?;
        let tokens = match mode {
            OcrMode::Normal => tokens,
            OcrMode::Nozzle => repair_nozzle_tokens(tokens),
        };
        Ok(tokens.join(" "))
    }

    fn tokens(&self, patch: &RgbImage) -> VesselResult<Vec<String>> {
        if patch.width() == 0 || patch.height() == 0 {
            return Ok(Vec::new());
        }
        self.engine.recognize(patch)
    }
}
