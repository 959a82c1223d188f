//! Serialisable response shapes. Scores are rounded to three decimals here
//! and nowhere else.
use serde::Serialize;

use crate::pipeline::engine_registry::EngineStatus;
use crate::pipeline::frame_analyzer::{FaceAnalysis, FrameAnalysisResult};
use crate::shared::numeric::round3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceReport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub emotion: String,
    pub emotion_confidence: f64,
    pub smile_probability: f64,
    pub age: String,
    pub age_confidence: f64,
    pub gender: String,
    pub gender_confidence: f64,
}

impl From<&FaceAnalysis> for FaceReport {
    fn from(face: &FaceAnalysis) -> Self {
        let score = |v: f32| round3(f64::from(v));
        Self {
            x: face.bbox.x(),
            y: face.bbox.y(),
            width: face.bbox.width(),
            height: face.bbox.height(),
            emotion: face.emotion.label.clone(),
            emotion_confidence: score(face.emotion.confidence),
            smile_probability: score(face.smile_probability),
            age: face.age.label.clone(),
            age_confidence: score(face.age.confidence),
            gender: face.gender.label.clone(),
            gender_confidence: score(face.gender.confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub faces: Vec<FaceReport>,
    pub face_count: usize,
    /// RFC 3339 local time.
    pub timestamp: String,
}

impl From<&FrameAnalysisResult> for AnalysisReport {
    fn from(result: &FrameAnalysisResult) -> Self {
        Self {
            faces: result.faces.iter().map(FaceReport::from).collect(),
            face_count: result.face_count(),
            timestamp: result.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub models: EngineStatus,
}

impl HealthReport {
    /// The service counts as healthy whenever it runs, whichever engines
    /// loaded.
    pub fn new(models: EngineStatus) -> Self {
        Self {
            status: "healthy",
            models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::classifier::ClassifierResult;
    use crate::shared::bounding_box::{BoundingBox, Rect};
    use chrono::Local;

    fn face() -> FaceAnalysis {
        FaceAnalysis {
            bbox: BoundingBox::clamped(Rect::new(12, 34, 56, 78), 640, 480).unwrap(),
            emotion: ClassifierResult::new("happiness", 0.876_54),
            smile_probability: 0.876_54,
            age: ClassifierResult::new("(25-32)", 0.41239),
            gender: ClassifierResult::new("Female", 0.9996),
        }
    }

    #[test]
    fn test_face_report_rounds_scores() {
        let report = FaceReport::from(&face());
        assert_eq!((report.x, report.y, report.width, report.height), (12, 34, 56, 78));
        assert_eq!(report.emotion_confidence, 0.877);
        assert_eq!(report.smile_probability, 0.877);
        assert_eq!(report.age_confidence, 0.412);
        assert_eq!(report.gender_confidence, 1.0);
    }

    #[test]
    fn test_analysis_report_json_shape() {
        let result = FrameAnalysisResult {
            faces: vec![face()],
            timestamp: Local::now(),
        };
        let json = serde_json::to_value(AnalysisReport::from(&result)).unwrap();
        assert_eq!(json["face_count"], 1);
        assert_eq!(json["faces"][0]["emotion"], "happiness");
        assert_eq!(json["faces"][0]["gender"], "Female");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_empty_analysis_report() {
        let result = FrameAnalysisResult {
            faces: vec![],
            timestamp: Local::now(),
        };
        let report = AnalysisReport::from(&result);
        assert_eq!(report.face_count, 0);
        assert!(report.faces.is_empty());
    }

    #[test]
    fn test_health_report_json() {
        let status = EngineStatus {
            emotion: true,
            age: false,
            gender: true,
            face_detection: false,
        };
        let json = serde_json::to_value(HealthReport::new(status)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["models"]["emotion"], true);
        assert_eq!(json["models"]["face_detection"], false);
    }
}
