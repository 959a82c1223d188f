use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::classification::domain::classifier::InferenceEngine;
use crate::classification::infrastructure::onnx_engine::OnnxEngine;
use crate::detection::domain::face_locator::FaceEngine;
use crate::detection::infrastructure::haar_cascade::HaarCascadeEngine;
use crate::shared::constants::{
    AGE_MODEL_NAME, EMOTION_MODEL_NAME, FACE_CASCADE_NAME, GENDER_MODEL_NAME,
};
use crate::shared::model_resolver::{self, ModelLoadError};

/// Per-engine "loaded" flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub emotion: bool,
    pub age: bool,
    pub gender: bool,
    pub face_detection: bool,
}

/// The process-wide set of inference engines.
///
/// Every slot loads independently; a failed load leaves the slot empty and
/// the capability degrades to its fallback at the point of use.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    pub face: Option<Arc<dyn FaceEngine>>,
    pub emotion: Option<Arc<dyn InferenceEngine>>,
    pub age: Option<Arc<dyn InferenceEngine>>,
    pub gender: Option<Arc<dyn InferenceEngine>>,
}

impl EngineRegistry {
    pub fn load(models_dir: &Path) -> Self {
        let face = load_engine("face detection", FACE_CASCADE_NAME, models_dir, |p| {
            HaarCascadeEngine::load(p)
        })
        .map(|e| Arc::new(e) as Arc<dyn FaceEngine>);

        let onnx = |what: &str, name: &str| {
            load_engine(what, name, models_dir, OnnxEngine::load)
                .map(|e| Arc::new(e) as Arc<dyn InferenceEngine>)
        };

        Self {
            face,
            emotion: onnx("emotion", EMOTION_MODEL_NAME),
            age: onnx("age", AGE_MODEL_NAME),
            gender: onnx("gender", GENDER_MODEL_NAME),
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            emotion: self.emotion.is_some(),
            age: self.age.is_some(),
            gender: self.gender.is_some(),
            face_detection: self.face.is_some(),
        }
    }
}

fn load_engine<T>(
    what: &str,
    file_name: &str,
    models_dir: &Path,
    load: impl FnOnce(&Path) -> Result<T, ModelLoadError>,
) -> Option<T> {
    match model_resolver::resolve(file_name, models_dir).and_then(|path| load(&path)) {
        Ok(engine) => {
            log::info!("Loaded {what} model ({file_name})");
            Some(engine)
        }
        Err(e) => {
            log::error!("Failed to load {what} model: {e}");
            None
        }
    }
}
