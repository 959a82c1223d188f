//! Conversion between transport payloads and in-memory frames.
//!
//! Payloads are standard raster encodings (JPEG, PNG, ...), optionally
//! base64-wrapped and prefixed with a `data:<mime>;base64,` scheme marker.
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

use crate::shared::frame::Frame;

/// JPEG quality used for every encoded frame.
pub const JPEG_QUALITY: u8 = 95;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("image payload is empty")]
    EmptyPayload,
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decodes an encoded image into an RGB frame.
///
/// Malformed input is rejected; a partially decoded buffer is never
/// returned.
pub fn decode(bytes: &[u8]) -> Result<Frame, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    let image = image::load_from_memory(bytes).map_err(CodecError::Decode)?;
    Ok(Frame::from_rgb_image(image.to_rgb8()))
}

/// Decodes a base64 payload, with or without a `data:` URL prefix.
pub fn decode_base64(payload: &str) -> Result<Frame, CodecError> {
    let bytes = STANDARD.decode(strip_scheme(payload))?;
    decode(&bytes)
}

/// Encodes a frame as JPEG.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, CodecError> {
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .write_image(
            frame.data(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(CodecError::Encode)?;
    Ok(out.into_inner())
}

/// Encodes a frame as a `data:image/jpeg;base64,` URL.
pub fn encode_data_url(frame: &Frame) -> Result<String, CodecError> {
    Ok(jpeg_data_url(&encode_jpeg(frame)?))
}

/// Wraps already-encoded JPEG bytes in a data URL.
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("{DATA_URL_PREFIX}{}", STANDARD.encode(jpeg))
}

/// Drops an optional `scheme,` prefix and all ASCII whitespace.
fn strip_scheme(payload: &str) -> String {
    let body = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    body.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
