//! Greedy CTC decoding for CRNN text recognizers.

use crate::core::errors::{VesselError, VesselResult};
use ndarray::ArrayView2;
use std::path::Path;

/// Maps recognizer class indices to characters.
///
/// Index 0 is the CTC blank; indices `1..=dict.len()` are the dictionary
/// entries, followed by a space.
#[derive(Debug, Clone)]
pub struct CtcLabelDecode {
    character: Vec<String>,
}

impl CtcLabelDecode {
    /// Builds the label table from dictionary entries, one per line.
    pub fn new<S: AsRef<str>>(entries: impl IntoIterator<Item = S>) -> Self {
        let mut character = vec![String::new()];
        character.extend(
            entries
                .into_iter()
                .map(|s| s.as_ref().trim_end_matches(['\r', '\n']).to_string()),
        );
        character.push(" ".to_string());
        Self { character }
    }

    /// Reads a dictionary file with one character per line.
    pub fn from_file(path: impl AsRef<Path>) -> VesselResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VesselError::model_load_error(
                path,
                format!("failed to read character dictionary: {e}"),
                None,
                None,
            )
        })?;
        Ok(Self::new(raw.lines()))
    }

    /// Number of classes including the blank and the space.
    pub fn num_classes(&self) -> usize {
        self.character.len()
    }

    /// Decodes one `[time, classes]` probability matrix.
    ///
    /// Repeated indices collapse, blanks are dropped, and the score is the
    /// mean probability of the emitted characters.
    pub fn decode(&self, probs: ArrayView2<f32>) -> (String, f32) {
        let mut text = String::new();
        let mut confidences = Vec::new();
        let mut previous = None;

        for step in probs.rows() {
            let (idx, prob) = step
                .iter()
                .copied()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (i, p)| {
                    if p > best.1 { (i, p) } else { best }
                });

            if idx != 0 && previous != Some(idx) {
                if let Some(ch) = self.character.get(idx) {
                    text.push_str(ch);
                    confidences.push(prob);
                }
            }
            previous = Some(idx);
        }

        let score = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };
        (text, score)
    }
}
