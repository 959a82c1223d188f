use image::{GrayImage, RgbImage};
use ndarray::{s, ArrayView3};

use crate::shared::bounding_box::BoundingBox;

/// Number of interleaved color channels in every frame (R, G, B).
pub const FRAME_CHANNELS: u8 = 3;

/// A single decoded image: contiguous RGB bytes in row-major order.
///
/// Frames are immutable once built. Format conversion happens at the codec
/// boundary; detection and classification only read pixel data.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (FRAME_CHANNELS as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        FRAME_CHANNELS
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel luminance using ITU-R BT.601 weights.
    pub fn luminance(&self) -> GrayImage {
        let pixels = self
            .data
            .chunks_exact(FRAME_CHANNELS as usize)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();
        GrayImage::from_raw(self.width, self.height, pixels)
            .expect("luminance buffer must match frame dimensions")
    }

    /// Copies the pixels under `bbox` into a new frame.
    ///
    /// Returns `None` when the box does not lie fully inside this frame.
    pub fn region(&self, bbox: &BoundingBox) -> Option<Frame> {
        if !bbox.fits_within(self.width, self.height) {
            return None;
        }
        let (x, y) = (bbox.x() as usize, bbox.y() as usize);
        let (w, h) = (bbox.width() as usize, bbox.height() as usize);
        let view = self.as_ndarray();
        let crop = view.slice(s![y..y + h, x..x + w, ..]);
        Some(Frame::new(
            crop.iter().copied().collect(),
            bbox.width(),
            bbox.height(),
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            FRAME_CHANNELS as usize,
        )
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}
