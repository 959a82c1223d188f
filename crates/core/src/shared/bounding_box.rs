use serde::Serialize;

/// Unvalidated rectangle as produced by a detection engine.
///
/// Coordinates may be negative or extend past the frame; convert to a
/// [`BoundingBox`] with [`BoundingBox::clamped`] before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A face box in frame pixel coordinates, top-left origin.
///
/// Always fully inside the frame it was clamped against, with positive
/// width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl BoundingBox {
    /// Clips `rect` to a `frame_w` × `frame_h` frame.
    ///
    /// Returns `None` if nothing of the rectangle remains inside the frame.
    pub fn clamped(rect: Rect, frame_w: u32, frame_h: u32) -> Option<Self> {
        let fw = i64::from(frame_w);
        let fh = i64::from(frame_h);
        let x0 = i64::from(rect.x).max(0);
        let y0 = i64::from(rect.y).max(0);
        let x1 = (i64::from(rect.x) + i64::from(rect.width)).min(fw);
        let y1 = (i64::from(rect.y) + i64::from(rect.height)).min(fh);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `[x, y, width, height]`, the order used in reports.
    pub fn to_array(&self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(frame_w)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(frame_h)
    }
}
