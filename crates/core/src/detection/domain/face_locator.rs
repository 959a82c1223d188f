use std::sync::Arc;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::bounding_box::{BoundingBox, Rect};
use crate::shared::frame::Frame;

pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;
pub const DEFAULT_MIN_FACE_SIZE: u32 = 80;

/// Tuning for multi-scale sliding-window detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Growth of the search window between scales (must exceed 1.0).
    pub scale_factor: f64,
    /// Minimum raw hits a merged detection needs to be reported.
    pub min_neighbors: usize,
    /// Faces smaller than this (pixels, both sides) are not reported.
    pub min_face_size: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidParams {
    #[error("scale factor must be greater than 1.0, got {0}")]
    ScaleFactor(f64),
    #[error("minimum face size must be positive")]
    MinFaceSize,
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), InvalidParams> {
        if !(self.scale_factor > 1.0) {
            return Err(InvalidParams::ScaleFactor(self.scale_factor));
        }
        if self.min_face_size == 0 {
            return Err(InvalidParams::MinFaceSize);
        }
        Ok(())
    }
}

/// Domain interface for a face-detection engine.
///
/// Engines are loaded once and shared read-only between concurrent
/// callers, hence `&self` and `Send + Sync`.
pub trait FaceEngine: Send + Sync {
    /// Detect faces in a luminance image. Rectangles may be unclamped.
    fn detect(
        &self,
        gray: &GrayImage,
        params: &DetectorParams,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>>;
}

/// Wraps an optional [`FaceEngine`] and enforces the bounding-box invariant.
///
/// A missing engine yields no faces rather than an error, so partial
/// deployments still answer with a zero face count.
pub struct FaceLocator {
    engine: Option<Arc<dyn FaceEngine>>,
    params: DetectorParams,
    sort: bool,
}

impl FaceLocator {
    pub fn new(engine: Option<Arc<dyn FaceEngine>>, params: DetectorParams, sort: bool) -> Self {
        Self {
            engine,
            params,
            sort,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Locate faces in `frame`.
    ///
    /// Every returned box lies fully inside the frame. When sorting is on,
    /// boxes are ordered by top-left corner (row, then column); otherwise
    /// engine order is kept.
    pub fn locate(&self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let Some(engine) = self.engine.as_ref() else {
            log::debug!("Face engine not loaded; reporting no faces");
            return Ok(Vec::new());
        };
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let gray = frame.luminance();
        let rects = engine.detect(&gray, &self.params)?;

        let mut boxes: Vec<BoundingBox> = rects
            .into_iter()
            .filter_map(|r| BoundingBox::clamped(r, frame.width(), frame.height()))
            .collect();

        if self.sort {
            boxes.sort_by_key(|b| (b.y(), b.x()));
        }
        Ok(boxes)
    }
}
