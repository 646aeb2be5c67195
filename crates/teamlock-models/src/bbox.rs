//! Axis-aligned bounding boxes as produced by the upstream tracker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bounding box in pixel coordinates, corner form `(x1, y1, x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f64,
    /// Top edge
    pub y1: f64,
    /// Right edge (exclusive)
    pub x2: f64,
    /// Bottom edge (exclusive)
    pub y2: f64,
}

/// Integer crop rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// True when the crop contains no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width (may be negative for inverted boxes).
    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Box height (may be negative for inverted boxes).
    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Resolve the box to an integer crop inside a `frame_width` x `frame_height` frame.
    ///
    /// Coordinates are truncated toward zero and clamped to the frame. Inverted,
    /// non-finite or fully clipped boxes produce an empty rectangle.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let clamp = |v: f64, max: u32| -> u32 {
            if !v.is_finite() || v <= 0.0 {
                0
            } else {
                (v.trunc() as u64).min(max as u64) as u32
            }
        };

        let x1 = clamp(self.x1, frame_width);
        let y1 = clamp(self.y1, frame_height);
        let x2 = clamp(self.x2, frame_width);
        let y2 = clamp(self.y2, frame_height);

        PixelRect {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }
}
