use serde::Serialize;

use crate::detection::domain::face_locator::FaceLocator;
use crate::pipeline::engine_registry::EngineStatus;
use crate::pipeline::frame_analyzer::AnalysisError;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::{Frame, FRAME_CHANNELS};

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugFace {
    /// 1-based, in detection order.
    pub id: usize,
    pub bbox: [u32; 4],
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugFacesResult {
    #[serde(skip)]
    pub annotated: Frame,
    pub faces: Vec<DebugFace>,
    pub face_count: usize,
    pub models: EngineStatus,
}

/// Detection-only pass that outlines every face on a copy of the frame.
pub struct DebugFacesUseCase {
    locator: FaceLocator,
    status: EngineStatus,
}

impl DebugFacesUseCase {
    pub fn new(locator: FaceLocator, status: EngineStatus) -> Self {
        Self { locator, status }
    }

    pub fn execute(&self, frame: &Frame) -> Result<DebugFacesResult, AnalysisError> {
        let boxes = self
            .locator
            .locate(frame)
            .map_err(|e| AnalysisError::Detection(e.to_string()))?;

        let mut pixels = frame.data().to_vec();
        for bbox in &boxes {
            draw_outline(&mut pixels, frame.width(), bbox);
        }

        let faces: Vec<DebugFace> = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| DebugFace {
                id: i + 1,
                bbox: b.to_array(),
            })
            .collect();
        log::debug!("Outlined {} faces", faces.len());

        Ok(DebugFacesResult {
            annotated: Frame::new(pixels, frame.width(), frame.height()),
            face_count: faces.len(),
            faces,
            models: self.status,
        })
    }
}

/// Paints a border of `BOX_THICKNESS` pixels just inside `bbox`.
fn draw_outline(pixels: &mut [u8], frame_width: u32, bbox: &BoundingBox) {
    let channels = FRAME_CHANNELS as usize;
    let fw = frame_width as usize;
    let (bx, by) = (bbox.x() as usize, bbox.y() as usize);
    let (bw, bh) = (bbox.width() as usize, bbox.height() as usize);
    let t = BOX_THICKNESS as usize;

    for row in 0..bh {
        let on_edge_row = row < t || row + t >= bh;
        for col in 0..bw {
            if on_edge_row || col < t || col + t >= bw {
                let offset = ((by + row) * fw + bx + col) * channels;
                pixels[offset..offset + channels].copy_from_slice(&BOX_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_locator::DetectorParams;
    use crate::pipeline::frame_analyzer::tests::{frame, StubFaces};
    use crate::shared::bounding_box::Rect;
    use std::sync::Arc;

    fn status() -> EngineStatus {
        EngineStatus {
            emotion: false,
            age: false,
            gender: false,
            face_detection: true,
        }
    }

    fn use_case(rects: Vec<Rect>) -> DebugFacesUseCase {
        let locator = FaceLocator::new(
            Some(Arc::new(StubFaces(rects))),
            DetectorParams::default(),
            true,
        );
        DebugFacesUseCase::new(locator, status())
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let o = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[o], frame.data()[o + 1], frame.data()[o + 2]]
    }

    #[test]
    fn test_faces_are_numbered_from_one() {
        let result = use_case(vec![Rect::new(40, 30, 10, 10), Rect::new(5, 5, 10, 10)])
            .execute(&frame(60, 60))
            .unwrap();
        assert_eq!(result.face_count, 2);
        assert_eq!(
            result.faces,
            vec![
                DebugFace {
                    id: 1,
                    bbox: [5, 5, 10, 10]
                },
                DebugFace {
                    id: 2,
                    bbox: [40, 30, 10, 10]
                },
            ]
        );
        assert_eq!(result.models, status());
    }

    #[test]
    fn test_outline_is_two_pixels_and_interior_untouched() {
        let input = frame(30, 30);
        let result = use_case(vec![Rect::new(10, 10, 10, 10)]).execute(&input).unwrap();
        let out = &result.annotated;

        assert_eq!(pixel(out, 10, 10), BOX_COLOR);
        assert_eq!(pixel(out, 11, 15), BOX_COLOR);
        assert_eq!(pixel(out, 19, 19), BOX_COLOR);
        assert_eq!(pixel(out, 18, 12), BOX_COLOR);
        assert_eq!(pixel(out, 12, 12), [120, 120, 120]);
        assert_eq!(pixel(out, 9, 9), [120, 120, 120]);
        // The input frame is never modified.
        assert_eq!(pixel(&input, 10, 10), [120, 120, 120]);
    }

    #[test]
    fn test_only_the_outline_is_painted() {
        let input = frame(30, 30);
        let result = use_case(vec![Rect::new(10, 10, 10, 10)]).execute(&input).unwrap();
        let changed = result
            .annotated
            .data()
            .chunks(3)
            .zip(input.data().chunks(3))
            .filter(|(out, orig)| out != orig)
            .count();
        // 10x10 box minus its untouched 6x6 interior; no caption above it.
        assert_eq!(changed, 64);
    }

    #[test]
    fn test_no_faces_returns_unmodified_copy() {
        let input = frame(20, 20);
        let result = use_case(vec![]).execute(&input).unwrap();
        assert_eq!(result.face_count, 0);
        assert_eq!(result.annotated, input);
    }

    #[test]
    fn test_result_json_omits_image() {
        let result = use_case(vec![Rect::new(0, 0, 4, 4)])
            .execute(&frame(8, 8))
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("annotated").is_none());
        assert_eq!(json["faces"][0]["bbox"], serde_json::json!([0, 0, 4, 4]));
        assert_eq!(json["models"]["face_detection"], true);
    }
}
