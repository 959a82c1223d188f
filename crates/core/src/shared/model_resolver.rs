use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model file {name} not found in {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to create inference session from {path}: {message}")]
    Session { path: PathBuf, message: String },
    #[error("failed to load cascade from {path}: {message}")]
    Cascade { path: PathBuf, message: String },
}

/// Resolve a model artifact by file name.
///
/// Resolution order:
/// 1. The configured models directory
/// 2. User cache directory (platform-specific)
pub fn resolve(name: &str, models_dir: &Path) -> Result<PathBuf, ModelLoadError> {
    let mut searched = vec![models_dir.to_path_buf()];
    let local = models_dir.join(name);
    if local.is_file() {
        return Ok(local);
    }

    if let Some(cache_dir) = model_cache_dir() {
        let cached = cache_dir.join(name);
        if cached.is_file() {
            return Ok(cached);
        }
        searched.push(cache_dir);
    }

    Err(ModelLoadError::NotFound {
        name: name.to_string(),
        searched,
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceLens/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceLens/models/` or `~/.cache/FaceLens/models/`
/// - Windows: `%LOCALAPPDATA%/FaceLens/models/`
pub fn model_cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir().map(|d| d.join("FaceLens").join("models"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir().map(|d| d.join("FaceLens").join("models"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_finds_file_in_models_dir() {
        let tmp = TempDir::new().unwrap();
        let model_path = tmp.path().join("test_model.onnx");
        fs::write(&model_path, b"fake model data").unwrap();

        let resolved = resolve("test_model.onnx", tmp.path()).unwrap();
        assert_eq!(resolved, model_path);
    }

    #[test]
    fn test_resolve_missing_file_reports_searched_dirs() {
        let tmp = TempDir::new().unwrap();
        let err = resolve("definitely_missing_facelens_model.onnx", tmp.path()).unwrap_err();
        match err {
            ModelLoadError::NotFound { name, searched } => {
                assert_eq!(name, "definitely_missing_facelens_model.onnx");
                assert_eq!(searched[0], tmp.path());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_ignores_directories_with_model_name() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("definitely_missing_facelens_dir.onnx")).unwrap();
        assert!(resolve("definitely_missing_facelens_dir.onnx", tmp.path()).is_err());
    }

    #[test]
    fn test_model_cache_dir_mentions_app() {
        if let Some(path) = model_cache_dir() {
            assert!(path.to_string_lossy().contains("FaceLens"));
            assert!(path.to_string_lossy().contains("models"));
        }
    }
}
