use std::sync::Arc;

use crate::classification::domain::classifier::{
    decode_scores, Classification, ClassifierAdapter, ClassifyError, InferenceEngine, ScoreKind,
};
use crate::shared::constants::{AGE_BUCKETS, GENDER_LABELS};
use crate::shared::frame::Frame;

use super::preprocessing;

/// Classifier for the 227×227 age and gender networks.
///
/// Both share preprocessing and emit probabilities directly; they differ
/// only in vocabulary.
pub struct AgeGenderClassifier {
    name: &'static str,
    labels: &'static [&'static str],
    engine: Option<Arc<dyn InferenceEngine>>,
}

impl AgeGenderClassifier {
    pub fn age(engine: Option<Arc<dyn InferenceEngine>>) -> Self {
        Self {
            name: "age",
            labels: AGE_BUCKETS,
            engine,
        }
    }

    pub fn gender(engine: Option<Arc<dyn InferenceEngine>>) -> Self {
        Self {
            name: "gender",
            labels: GENDER_LABELS,
            engine,
        }
    }
}

impl ClassifierAdapter for AgeGenderClassifier {
    fn name(&self) -> &'static str {
        self.name
    }

    fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    fn predict(&self, region: &Frame) -> Result<Classification, ClassifyError> {
        let engine = self.engine.as_ref().ok_or(ClassifyError::Unavailable)?;
        let input = preprocessing::age_gender_tensor(region)?;
        let scores = engine
            .infer(input)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        decode_scores(scores, self.labels(), ScoreKind::Probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::UNKNOWN_LABEL;
    use approx::assert_relative_eq;
    use ndarray::Array4;
    use rstest::rstest;

    struct FixedEngine(Vec<f32>);

    impl InferenceEngine for FixedEngine {
        fn infer(&self, input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            assert_eq!(input.shape(), &[1, 3, 227, 227]);
            Ok(self.0.clone())
        }
    }

    struct BrokenEngine;

    impl InferenceEngine for BrokenEngine {
        fn infer(&self, _input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Err("device lost".into())
        }
    }

    fn face() -> Frame {
        Frame::new(vec![100; 60 * 80 * 3], 60, 80)
    }

    #[rstest]
    #[case(vec![0.05, 0.05, 0.1, 0.1, 0.6, 0.05, 0.03, 0.02], "(25-32)", 0.6)]
    #[case(vec![0.9, 0.02, 0.02, 0.02, 0.01, 0.01, 0.01, 0.01], "(0-2)", 0.9)]
    #[case(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.3, 0.7], "(60-100)", 0.7)]
    fn test_age_bucket_is_argmax(
        #[case] scores: Vec<f32>,
        #[case] label: &str,
        #[case] confidence: f32,
    ) {
        let classifier = AgeGenderClassifier::age(Some(Arc::new(FixedEngine(scores))));
        let c = classifier.classify(&face());
        assert_eq!(c.result.label, label);
        assert_relative_eq!(c.result.confidence, confidence);
    }

    #[test]
    fn test_gender_scores_are_not_renormalised() {
        let classifier = AgeGenderClassifier::gender(Some(Arc::new(FixedEngine(vec![0.2, 0.3]))));
        let c = classifier.classify(&face());
        assert_eq!(c.result.label, "Female");
        assert_relative_eq!(c.result.confidence, 0.3);
    }

    #[test]
    fn test_vocabulary_sizes_match_model_outputs() {
        assert_eq!(AgeGenderClassifier::age(None).labels().len(), 8);
        assert_eq!(AgeGenderClassifier::gender(None).labels(), &["Male", "Female"]);
    }

    #[test]
    fn test_engine_error_yields_unknown() {
        let classifier = AgeGenderClassifier::gender(Some(Arc::new(BrokenEngine)));
        let c = classifier.classify(&face());
        assert_eq!(c.result.label, UNKNOWN_LABEL);
        assert_eq!(c.result.confidence, 0.0);
    }

    #[test]
    fn test_unavailable_engine() {
        let classifier = AgeGenderClassifier::age(None);
        assert!(!classifier.is_available());
        assert!(matches!(
            classifier.predict(&face()),
            Err(ClassifyError::Unavailable)
        ));
        assert_eq!(classifier.classify(&face()).result.label, UNKNOWN_LABEL);
    }
}
