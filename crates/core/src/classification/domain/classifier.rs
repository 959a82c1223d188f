use ndarray::Array4;
use serde::Serialize;
use thiserror::Error;

use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::frame::Frame;
use crate::shared::numeric::{argmax, clamp_unit, softmax};

/// A winning label and its score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierResult {
    pub label: String,
    pub confidence: f32,
}

impl ClassifierResult {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn fallback(label: &str) -> Self {
        Self::new(label, 0.0)
    }
}

/// Decoded classifier output: the winning label plus the full score vector
/// in vocabulary order. `probabilities` is empty for fallback values.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub result: ClassifierResult,
    pub probabilities: Vec<f32>,
}

impl Classification {
    pub fn fallback(label: &str) -> Self {
        Self {
            result: ClassifierResult::fallback(label),
            probabilities: Vec::new(),
        }
    }

    /// Score at `index`, or 0.0 when absent.
    pub fn probability(&self, index: usize) -> f32 {
        self.probabilities.get(index).copied().unwrap_or(0.0)
    }
}

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("engine not loaded")]
    Unavailable,
    #[error("face region is empty")]
    EmptyRegion,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("expected {expected} scores, got {actual}")]
    OutputShape { expected: usize, actual: usize },
    #[error("model produced non-finite scores")]
    NonFinite,
}

/// Domain interface for a tensor-in, scores-out inference engine.
///
/// Engines are loaded once and shared between concurrent callers; an
/// implementation that needs exclusive access must serialise internally.
pub trait InferenceEngine: Send + Sync {
    fn infer(&self, input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}

/// One face-attribute classifier with a fixed label vocabulary.
///
/// Implementors provide [`predict`](Self::predict); callers use
/// [`classify`](Self::classify), which never fails.
pub trait ClassifierAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn labels(&self) -> &'static [&'static str];

    fn fallback_label(&self) -> &'static str {
        UNKNOWN_LABEL
    }

    fn is_available(&self) -> bool;

    fn predict(&self, region: &Frame) -> Result<Classification, ClassifyError>;

    /// Classify `region`, degrading to the fallback value on any failure.
    fn classify(&self, region: &Frame) -> Classification {
        match self.predict(region) {
            Ok(classification) => classification,
            Err(ClassifyError::Unavailable) => Classification::fallback(self.fallback_label()),
            Err(e) => {
                log::warn!("{} classifier failed: {e}", self.name());
                Classification::fallback(self.fallback_label())
            }
        }
    }
}

/// How raw engine output maps to probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    /// Unnormalised logits; softmax is applied.
    Logits,
    /// Already a distribution; used as-is.
    Probabilities,
}

/// Turn a raw score vector into a [`Classification`] over `labels`.
pub fn decode_scores(
    raw: Vec<f32>,
    labels: &[&str],
    kind: ScoreKind,
) -> Result<Classification, ClassifyError> {
    if raw.len() != labels.len() {
        return Err(ClassifyError::OutputShape {
            expected: labels.len(),
            actual: raw.len(),
        });
    }
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(ClassifyError::NonFinite);
    }

    let probabilities = match kind {
        ScoreKind::Logits => softmax(&raw),
        ScoreKind::Probabilities => raw,
    };
    let (index, score) = argmax(&probabilities).ok_or(ClassifyError::NonFinite)?;

    Ok(Classification {
        result: ClassifierResult::new(labels[index], clamp_unit(score)),
        probabilities,
    })
}
