//! RGB color samples.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An RGB color with floating point channels in `[0, 255]`.
///
/// Samples are means over many pixels, so channels are not integral.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Create a new color.
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Build from 8-bit channels.
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0] as f64, bytes[1] as f64, bytes[2] as f64)
    }

    /// Channels as an array.
    #[inline]
    pub fn to_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// True if any channel is NaN.
    #[inline]
    pub fn has_nan(&self) -> bool {
        self.r.is_nan() || self.g.is_nan() || self.b.is_nan()
    }

    /// True if every channel is strictly below `threshold`.
    #[inline]
    pub fn is_near_black(&self, threshold: f64) -> bool {
        self.r < threshold && self.g < threshold && self.b < threshold
    }

    /// Squared Euclidean distance in RGB space.
    #[inline]
    pub fn distance_sq(&self, other: &Rgb) -> f64 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        dr * dr + dg * dg + db * db
    }

    /// Euclidean distance in RGB space.
    #[inline]
    pub fn distance(&self, other: &Rgb) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Round and clamp to 8-bit channels.
    pub fn to_bytes(&self) -> [u8; 3] {
        let q = |v: f64| -> u8 {
            if v.is_nan() {
                0
            } else {
                v.round().clamp(0.0, 255.0) as u8
            }
        };
        [q(self.r), q(self.g), q(self.b)]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(bytes: [u8; 3]) -> Self {
        Self::from_bytes(bytes)
    }
}
