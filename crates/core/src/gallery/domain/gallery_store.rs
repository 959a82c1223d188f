use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::image_codec::CodecError;
use crate::pipeline::frame_analyzer::FaceAnalysis;
use crate::shared::constants::NO_FACE_LABEL;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("gallery I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata file is malformed: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid gallery filename {0:?}")]
    InvalidFilename(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Per-capture analysis values as persisted. `None` marks a value that was
/// never measured, as opposed to a real zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureMetadata {
    pub smile_prob: Option<f64>,
    pub age_label: String,
    pub age_conf: Option<f64>,
    pub gender_label: String,
    pub gender_conf: Option<f64>,
    pub emotion_label: String,
    pub emotion_conf: Option<f64>,
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub w: Option<u32>,
    pub h: Option<u32>,
}

impl Default for CaptureMetadata {
    fn default() -> Self {
        Self {
            smile_prob: None,
            age_label: NO_FACE_LABEL.to_string(),
            age_conf: None,
            gender_label: NO_FACE_LABEL.to_string(),
            gender_conf: None,
            emotion_label: NO_FACE_LABEL.to_string(),
            emotion_conf: None,
            x: None,
            y: None,
            w: None,
            h: None,
        }
    }
}

impl From<&FaceAnalysis> for CaptureMetadata {
    fn from(face: &FaceAnalysis) -> Self {
        Self {
            smile_prob: Some(f64::from(face.smile_probability)),
            age_label: face.age.label.clone(),
            age_conf: Some(f64::from(face.age.confidence)),
            gender_label: face.gender.label.clone(),
            gender_conf: Some(f64::from(face.gender.confidence)),
            emotion_label: face.emotion.label.clone(),
            emotion_conf: Some(f64::from(face.emotion.confidence)),
            x: Some(face.bbox.x()),
            y: Some(face.bbox.y()),
            w: Some(face.bbox.width()),
            h: Some(face.bbox.height()),
        }
    }
}

/// One listed capture. `image` is only filled when images were requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryEntry {
    pub filename: String,
    pub timestamp: String,
    pub metadata: CaptureMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedCapture {
    pub filename: String,
    pub path: PathBuf,
    /// `YYYYmmdd_HHMMSS` capture time, the stem of the generated filename.
    pub timestamp: String,
}

/// Durable store of captured frames keyed by filename.
pub trait GalleryStore: Send + Sync {
    fn save(&self, frame: &Frame, metadata: &CaptureMetadata) -> Result<SavedCapture, GalleryError>;

    /// Entries in insertion order whose image file still exists.
    fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError>;

    /// Remove the image and its metadata row. Other rows keep their order.
    fn delete(&self, filename: &str) -> Result<(), GalleryError>;

    /// Remove every capture, leaving a header-only metadata file.
    fn clear(&self) -> Result<(), GalleryError>;
}
