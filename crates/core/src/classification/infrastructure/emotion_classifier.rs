use std::sync::Arc;

use crate::classification::domain::classifier::{
    decode_scores, Classification, ClassifierAdapter, ClassifyError, InferenceEngine, ScoreKind,
};
use crate::shared::constants::{EMOTION_FALLBACK_LABEL, EMOTION_LABELS, SMILE_INDEX};
use crate::shared::frame::Frame;

use super::preprocessing;

/// Eight-way facial expression classifier over raw logits.
pub struct EmotionClassifier {
    engine: Option<Arc<dyn InferenceEngine>>,
}

impl EmotionClassifier {
    pub fn new(engine: Option<Arc<dyn InferenceEngine>>) -> Self {
        Self { engine }
    }

    /// Probability mass at the "happiness" index, independent of which
    /// label won. 0.0 for fallback values.
    pub fn smile_probability(classification: &Classification) -> f32 {
        classification.probability(SMILE_INDEX)
    }
}

impl ClassifierAdapter for EmotionClassifier {
    fn name(&self) -> &'static str {
        "emotion"
    }

    fn labels(&self) -> &'static [&'static str] {
        EMOTION_LABELS
    }

    fn fallback_label(&self) -> &'static str {
        EMOTION_FALLBACK_LABEL
    }

    fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    fn predict(&self, region: &Frame) -> Result<Classification, ClassifyError> {
        let engine = self.engine.as_ref().ok_or(ClassifyError::Unavailable)?;
        let input = preprocessing::emotion_tensor(region)?;
        let logits = engine
            .infer(input)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        decode_scores(logits, self.labels(), ScoreKind::Logits)
    }
}
