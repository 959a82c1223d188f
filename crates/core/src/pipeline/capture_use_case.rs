use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::gallery::domain::gallery_store::{CaptureMetadata, GalleryError, GalleryStore};
use crate::pipeline::frame_analyzer::{AnalysisError, FrameAnalyzer};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Capture failed: {0}")]
    Gallery(#[from] GalleryError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureResult {
    pub filename: String,
    pub path: PathBuf,
    pub timestamp: String,
    /// What was persisted: the first face's analysis, or the fallback.
    pub metadata: CaptureMetadata,
}

/// Analyze a frame and persist it with the first face's results.
///
/// Faces after the first are not persisted. When no face is found, the
/// caller-supplied fallback metadata is stored instead.
pub struct CaptureUseCase<'a> {
    analyzer: &'a FrameAnalyzer,
    gallery: &'a dyn GalleryStore,
}

impl<'a> CaptureUseCase<'a> {
    pub fn new(analyzer: &'a FrameAnalyzer, gallery: &'a dyn GalleryStore) -> Self {
        Self { analyzer, gallery }
    }

    pub fn execute(
        &self,
        frame: &Frame,
        fallback: CaptureMetadata,
    ) -> Result<CaptureResult, CaptureError> {
        let analysis = self.analyzer.analyze(frame)?;
        let metadata = match analysis.faces.first() {
            Some(face) => CaptureMetadata::from(face),
            None => fallback,
        };
        if analysis.face_count() > 1 {
            log::debug!(
                "Capture keeps the first of {} faces",
                analysis.face_count()
            );
        }

        let saved = self.gallery.save(frame, &metadata)?;
        Ok(CaptureResult {
            filename: saved.filename,
            path: saved.path,
            timestamp: saved.timestamp,
            metadata,
        })
    }
}
