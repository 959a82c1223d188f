pub mod age_gender_classifier;
pub mod emotion_classifier;
pub mod onnx_engine;
pub mod preprocessing;
