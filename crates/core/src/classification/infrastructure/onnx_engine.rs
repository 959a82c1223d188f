/// ONNX Runtime backed [`InferenceEngine`].
///
/// `Session::run` needs exclusive access, so the session sits behind a
/// mutex and concurrent callers are serialised per engine.
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::classification::domain::classifier::InferenceEngine;
use crate::shared::model_resolver::ModelLoadError;

pub struct OnnxEngine {
    session: Mutex<ort::session::Session>,
}

impl OnnxEngine {
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        let session = build_session(model_path).map_err(|e| ModelLoadError::Session {
            path: model_path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

impl InferenceEngine for OnnxEngine {
    fn infer(&self, input: Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
