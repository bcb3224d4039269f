//! Note regions: cropping, upload to the extraction service, result records.
//!
//! A note that the service cannot handle does not fail the page. It is logged
//! and reported as [`NotePayload::Unavailable`], which serializes as
//! `"notes": null` with an `"error"` field.

use crate::core::config::{NoteServiceConfig, ParallelPolicy};
pub use crate::core::errors::NoteServiceError;
use crate::core::traits::NoteExtractor;
use crate::processors::{BoundingBox, XywhBox};
use crate::utils::{crop_region, encode_png};
use image::RgbImage;
use reqwest::blocking::{Client, multipart};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of extracting one note.
#[derive(Debug, Clone, PartialEq)]
pub enum NotePayload {
    /// The service's JSON, passed through untouched.
    Structured(serde_json::Value),
    /// The service failed for this note.
    Unavailable { reason: String },
}

/// One note region and its extraction result.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEntry {
    pub notes: NotePayload,
    /// Unexpanded region box.
    pub bbox: XywhBox,
}

impl Serialize for NoteEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.notes {
            NotePayload::Structured(value) => {
                let mut state = serializer.serialize_struct("NoteEntry", 2)?;
                state.serialize_field("notes", value)?;
                state.serialize_field("bbox", &self.bbox)?;
                state.end()
            }
            NotePayload::Unavailable { reason } => {
                let mut state = serializer.serialize_struct("NoteEntry", 3)?;
                state.serialize_field("notes", &Option::<()>::None)?;
                state.serialize_field("bbox", &self.bbox)?;
                state.serialize_field("error", reason)?;
                state.end()
            }
        }
    }
}

impl Serialize for NotePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NotePayload::Structured(value) => value.serialize(serializer),
            NotePayload::Unavailable { .. } => serializer.serialize_none(),
        }
    }
}

/// Blocking HTTP client for the note extraction service.
///
/// Each crop is posted as a multipart form with a single `file` part.
#[derive(Debug, Clone)]
pub struct HttpNoteClient {
    client: Client,
    url: String,
}

impl HttpNoteClient {
    pub fn new(config: &NoteServiceConfig) -> Result<Self, NoteServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(NoteServiceError::Transport)?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl NoteExtractor for HttpNoteClient {
    fn extract(&self, png: &[u8]) -> Result<serde_json::Value, NoteServiceError> {
        let part = multipart::Part::bytes(png.to_vec())
            .file_name("crop.png")
            .mime_str("image/png")
            .map_err(NoteServiceError::Transport)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .map_err(NoteServiceError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NoteServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().map_err(NoteServiceError::Decode)
    }
}

/// Crops note regions and sends them to a [`NoteExtractor`].
#[derive(Debug, Clone)]
pub struct NoteDispatcher {
    extractor: Arc<dyn NoteExtractor>,
    margin: i32,
    policy: ParallelPolicy,
}

impl NoteDispatcher {
    pub fn new(extractor: Arc<dyn NoteExtractor>, margin: i32, policy: ParallelPolicy) -> Self {
        Self {
            extractor,
            margin,
            policy,
        }
    }

    /// Extracts every note region, in input order. Never fails.
    pub fn dispatch(&self, page: &RgbImage, regions: &[BoundingBox]) -> Vec<NoteEntry> {
        self.policy
            .map_ordered(regions, |bbox| NoteEntry {
                notes: self.extract_one(page, bbox),
                bbox: bbox.to_xywh(),
            })
    }

    fn extract_one(&self, page: &RgbImage, bbox: &BoundingBox) -> NotePayload {
        let expanded = bbox.expand(self.margin, page.width(), page.height());
        let png = match encode_png(&crop_region(page, &expanded)) {
            Ok(png) => png,
            Err(e) => {
                warn!("Skipping note at {:?}: {}", bbox, e);
                return NotePayload::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        match self.extractor.extract(&png) {
            Ok(value) => {
                debug!("Note at {:?} extracted", bbox);
                NotePayload::Structured(value)
            }
            Err(e) => {
                warn!("Note extraction failed for {:?}: {}", bbox, e);
                NotePayload::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
