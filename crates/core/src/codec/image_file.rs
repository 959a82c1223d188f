use std::fs;
use std::path::Path;

use crate::codec::image_codec::{self, CodecError};
use crate::shared::frame::Frame;

/// Reads and decodes an image file.
pub fn read_frame(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    Ok(image_codec::decode(&bytes)?)
}

/// Writes a frame to `path`; the format follows the file extension.
///
/// `.jpg` / `.jpeg` use the codec's JPEG settings so gallery captures match
/// transport-encoded frames.
pub fn write_frame(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"));

    if is_jpeg {
        fs::write(path, image_codec::encode_jpeg(frame)?)?;
    } else {
        frame
            .to_rgb_image()
            .save(path)
            .map_err(CodecError::Encode)?;
    }
    Ok(())
}
