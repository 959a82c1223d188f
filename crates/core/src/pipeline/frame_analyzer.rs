use std::time::Instant;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::classification::domain::classifier::{ClassifierAdapter, ClassifierResult};
use crate::classification::infrastructure::age_gender_classifier::AgeGenderClassifier;
use crate::classification::infrastructure::emotion_classifier::EmotionClassifier;
use crate::detection::domain::face_locator::{DetectorParams, FaceLocator};
use crate::pipeline::engine_registry::EngineRegistry;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("face box {bbox:?} lies outside the {width}x{height} frame")]
    RegionOutOfBounds {
        bbox: [u32; 4],
        width: u32,
        height: u32,
    },
}

/// Everything known about one detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnalysis {
    pub bbox: BoundingBox,
    pub emotion: ClassifierResult,
    /// Probability of the "happiness" category, whatever label won.
    pub smile_probability: f32,
    pub age: ClassifierResult,
    pub gender: ClassifierResult,
}

#[derive(Debug, Clone)]
pub struct FrameAnalysisResult {
    /// One entry per detected face, in detection order.
    pub faces: Vec<FaceAnalysis>,
    pub timestamp: DateTime<Local>,
}

impl FrameAnalysisResult {
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Locate faces, then run all three classifiers on every face region.
///
/// Every detected box yields exactly one [`FaceAnalysis`]; no confidence
/// filtering happens here.
pub struct FrameAnalyzer {
    locator: FaceLocator,
    emotion: EmotionClassifier,
    age: AgeGenderClassifier,
    gender: AgeGenderClassifier,
}

impl FrameAnalyzer {
    pub fn new(
        locator: FaceLocator,
        emotion: EmotionClassifier,
        age: AgeGenderClassifier,
        gender: AgeGenderClassifier,
    ) -> Self {
        Self {
            locator,
            emotion,
            age,
            gender,
        }
    }

    pub fn from_registry(registry: &EngineRegistry, params: DetectorParams, sort: bool) -> Self {
        Self::new(
            FaceLocator::new(registry.face.clone(), params, sort),
            EmotionClassifier::new(registry.emotion.clone()),
            AgeGenderClassifier::age(registry.age.clone()),
            AgeGenderClassifier::gender(registry.gender.clone()),
        )
    }

    pub fn analyze(&self, frame: &Frame) -> Result<FrameAnalysisResult, AnalysisError> {
        let timestamp = Local::now();

        let t0 = Instant::now();
        let boxes = self
            .locator
            .locate(frame)
            .map_err(|e| AnalysisError::Detection(e.to_string()))?;
        let detect_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        let faces = boxes
            .into_iter()
            .map(|bbox| self.analyze_face(frame, bbox))
            .collect::<Result<Vec<_>, _>>()?;
        let classify_ms = t1.elapsed().as_secs_f64() * 1000.0;

        log::debug!(
            "{} faces in {}x{} frame (detect {detect_ms:.1}ms, classify {classify_ms:.1}ms)",
            faces.len(),
            frame.width(),
            frame.height()
        );

        Ok(FrameAnalysisResult { faces, timestamp })
    }

    fn analyze_face(&self, frame: &Frame, bbox: BoundingBox) -> Result<FaceAnalysis, AnalysisError> {
        let region = frame
            .region(&bbox)
            .ok_or(AnalysisError::RegionOutOfBounds {
                bbox: bbox.to_array(),
                width: frame.width(),
                height: frame.height(),
            })?;

        let emotion = self.emotion.classify(&region);
        Ok(FaceAnalysis {
            bbox,
            smile_probability: EmotionClassifier::smile_probability(&emotion),
            emotion: emotion.result,
            age: self.age.classify(&region).result,
            gender: self.gender.classify(&region).result,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classification::domain::classifier::InferenceEngine;
    use crate::detection::domain::face_locator::FaceEngine;
    use crate::shared::bounding_box::Rect;
    use crate::shared::constants::{AGE_BUCKETS, SMILE_INDEX, UNKNOWN_LABEL};
    use image::GrayImage;
    use ndarray::Array4;
    use std::sync::Arc;

    pub(crate) struct StubFaces(pub Vec<Rect>);

    impl FaceEngine for StubFaces {
        fn detect(
            &self,
            _gray: &GrayImage,
            _params: &DetectorParams,
        ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct FailingFaces;

    impl FaceEngine for FailingFaces {
        fn detect(
            &self,
            _gray: &GrayImage,
            _params: &DetectorParams,
        ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
            Err("cascade corrupted".into())
        }
    }

    pub(crate) struct StubScores(pub Vec<f32>);

    impl InferenceEngine for StubScores {
        fn infer(&self, _input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    pub(crate) fn engines(rects: Vec<Rect>) -> EngineRegistry {
        EngineRegistry {
            face: Some(Arc::new(StubFaces(rects))),
            emotion: Some(Arc::new(StubScores(vec![
                0.5, 3.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0,
            ]))),
            age: Some(Arc::new(StubScores(vec![
                0.0, 0.0, 0.1, 0.2, 0.6, 0.1, 0.0, 0.0,
            ]))),
            gender: Some(Arc::new(StubScores(vec![0.8, 0.2]))),
        }
    }

    pub(crate) fn frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![120; (w * h * 3) as usize], w, h)
    }

    fn analyzer(registry: &EngineRegistry) -> FrameAnalyzer {
        FrameAnalyzer::from_registry(registry, DetectorParams::default(), true)
    }

    #[test]
    fn test_no_faces_is_not_an_error() {
        let result = analyzer(&engines(vec![])).analyze(&frame(100, 100)).unwrap();
        assert_eq!(result.face_count(), 0);
        assert!(result.faces.is_empty());
    }

    #[test]
    fn test_missing_face_engine_reports_zero_faces() {
        let mut registry = engines(vec![Rect::new(0, 0, 10, 10)]);
        registry.face = None;
        let result = analyzer(&registry).analyze(&frame(50, 50)).unwrap();
        assert_eq!(result.face_count(), 0);
    }

    #[test]
    fn test_every_box_yields_one_analysis() {
        let registry = engines(vec![Rect::new(10, 10, 30, 30), Rect::new(60, 5, 30, 30)]);
        let result = analyzer(&registry).analyze(&frame(120, 80)).unwrap();
        assert_eq!(result.face_count(), 2);

        let first = &result.faces[0];
        assert_eq!(first.bbox.to_array(), [60, 5, 30, 30]);
        assert_eq!(first.emotion.label, "happiness");
        assert_eq!(first.age.label, "(25-32)");
        assert_eq!(first.gender.label, "Male");
        assert!((0.0..=1.0).contains(&first.smile_probability));
        assert_eq!(first.smile_probability, first.emotion.confidence);
    }

    #[test]
    fn test_boxes_are_clamped_before_classification() {
        let registry = engines(vec![Rect::new(-5, 70, 40, 40)]);
        let result = analyzer(&registry).analyze(&frame(100, 100)).unwrap();
        assert_eq!(result.faces[0].bbox.to_array(), [0, 70, 35, 30]);
    }

    #[test]
    fn test_emotion_unavailable_leaves_age_and_gender_intact() {
        let mut registry = engines(vec![Rect::new(10, 10, 40, 40)]);
        registry.emotion = None;
        let result = analyzer(&registry).analyze(&frame(100, 100)).unwrap();
        let face = &result.faces[0];
        assert_eq!(face.emotion, ClassifierResult::fallback("neutral"));
        assert_eq!(face.smile_probability, 0.0);
        assert_eq!(face.age.label, "(25-32)");
        assert!(AGE_BUCKETS.contains(&face.age.label.as_str()));
        assert_eq!(face.gender.label, "Male");
    }

    #[test]
    fn test_malformed_classifier_output_degrades_one_classifier_only() {
        let mut registry = engines(vec![Rect::new(10, 10, 40, 40)]);
        registry.gender = Some(Arc::new(StubScores(vec![1.0, 0.0, 0.0])));
        let result = analyzer(&registry).analyze(&frame(100, 100)).unwrap();
        let face = &result.faces[0];
        assert_eq!(face.gender, ClassifierResult::fallback(UNKNOWN_LABEL));
        assert_eq!(face.emotion.label, "happiness");
        assert_eq!(face.age.label, "(25-32)");
    }

    #[test]
    fn test_smile_probability_matches_happiness_mass() {
        let mut registry = engines(vec![Rect::new(0, 0, 20, 20)]);
        registry.emotion = Some(Arc::new(StubScores(vec![
            4.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        ])));
        let result = analyzer(&registry).analyze(&frame(40, 40)).unwrap();
        let face = &result.faces[0];
        assert_eq!(face.emotion.label, "neutral");
        let expected = crate::shared::numeric::softmax(&[4.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!((face.smile_probability - expected[SMILE_INDEX]).abs() < 1e-6);
    }

    #[test]
    fn test_detection_failure_escalates() {
        let mut registry = engines(vec![]);
        registry.face = Some(Arc::new(FailingFaces));
        let err = analyzer(&registry).analyze(&frame(30, 30)).unwrap_err();
        assert!(matches!(err, AnalysisError::Detection(ref m) if m.contains("corrupted")));
    }
}
