//! Region-to-tensor conversion for the classifier networks.
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::classification::domain::classifier::ClassifyError;
use crate::shared::constants::{AGE_GENDER_INPUT_SIZE, AGE_GENDER_MEAN, EMOTION_INPUT_SIZE};
use crate::shared::frame::Frame;

/// Luminance, resized to 64×64 and scaled to `[0, 1]`, as `1×1×64×64`.
pub fn emotion_tensor(region: &Frame) -> Result<Array4<f32>, ClassifyError> {
    if region.is_empty() {
        return Err(ClassifyError::EmptyRegion);
    }
    let size = EMOTION_INPUT_SIZE;
    let gray = imageops::resize(&region.luminance(), size, size, FilterType::Triangle);
    let n = size as usize;
    Ok(Array4::from_shape_fn((1, 1, n, n), |(_, _, y, x)| {
        f32::from(gray.get_pixel(x as u32, y as u32).0[0]) / 255.0
    }))
}

/// Color region resized to 227×227 as `1×3×227×227` mean-subtracted planes.
///
/// The age and gender networks were trained on blue-green-red planes, so
/// plane 0 is blue and the mean offsets apply in that order.
pub fn age_gender_tensor(region: &Frame) -> Result<Array4<f32>, ClassifyError> {
    if region.is_empty() {
        return Err(ClassifyError::EmptyRegion);
    }
    let size = AGE_GENDER_INPUT_SIZE;
    let rgb = imageops::resize(&region.to_rgb_image(), size, size, FilterType::Triangle);
    let n = size as usize;
    Ok(Array4::from_shape_fn((1, 3, n, n), |(_, c, y, x)| {
        let px = rgb.get_pixel(x as u32, y as u32).0;
        f32::from(px[2 - c]) - AGE_GENDER_MEAN[c]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        Frame::new(rgb.repeat((w * h) as usize), w, h)
    }

    #[test]
    fn test_emotion_tensor_shape_and_range() {
        let t = emotion_tensor(&solid(120, 90, [255, 255, 255])).unwrap();
        assert_eq!(t.shape(), &[1, 1, 64, 64]);
        assert!(t.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_relative_eq!(t[[0, 0, 10, 10]], 1.0);
    }

    #[test]
    fn test_emotion_tensor_black_is_zero() {
        let t = emotion_tensor(&solid(30, 30, [0, 0, 0])).unwrap();
        assert!(t.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_age_gender_tensor_plane_order_and_mean() {
        // Pure red input: only the last (red) plane carries signal.
        let t = age_gender_tensor(&solid(50, 40, [200, 0, 0])).unwrap();
        assert_eq!(t.shape(), &[1, 3, 227, 227]);
        assert_relative_eq!(t[[0, 0, 100, 100]], -78.4, epsilon = 1e-3);
        assert_relative_eq!(t[[0, 1, 100, 100]], -87.7, epsilon = 1e-3);
        assert_relative_eq!(t[[0, 2, 100, 100]], 200.0 - 114.9, epsilon = 1e-3);
    }

    #[test]
    fn test_empty_region_is_rejected() {
        let empty = Frame::new(Vec::new(), 0, 0);
        assert!(matches!(emotion_tensor(&empty), Err(ClassifyError::EmptyRegion)));
        assert!(matches!(age_gender_tensor(&empty), Err(ClassifyError::EmptyRegion)));
    }
}
