//! Color space conversions used by sampling and calibration.
//!
//! - HSV hue, for ordering team prototypes
//! - CIE L*a*b* (sRGB, D65 white), for luminance-only contrast normalization

use teamlock_models::Rgb;

/// Color in CIE L*a*b*. `l` is in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

// D65 reference white
const WHITE_X: f64 = 0.950_47;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.088_83;

const DELTA: f64 = 6.0 / 29.0;

/// HSV hue of an RGB color, in `[0, 1)`. Achromatic colors have hue 0.
pub fn hue(color: &Rgb) -> f64 {
    let r = color.r / 255.0;
    let g = color.g / 255.0;
    let b = color.b / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return 0.0;
    }

    let span = max - min;
    let rc = (max - r) / span;
    let gc = (max - g) / span;
    let bc = (max - b) / span;

    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    (h / 6.0).rem_euclid(1.0)
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f64) -> f64 {
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

fn lab_f_inv(t: f64) -> f64 {
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

/// Convert 8-bit sRGB to L*a*b*.
pub fn rgb_to_lab(rgb: [u8; 3]) -> Lab {
    let r = srgb_to_linear(rgb[0] as f64 / 255.0);
    let g = srgb_to_linear(rgb[1] as f64 / 255.0);
    let b = srgb_to_linear(rgb[2] as f64 / 255.0);

    let x = 0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b;
    let z = 0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b;

    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y / WHITE_Y);
    let fz = lab_f(z / WHITE_Z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Convert L*a*b* back to 8-bit sRGB, clamping out-of-gamut values.
pub fn lab_to_rgb(lab: Lab) -> [u8; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = fy + lab.a / 500.0;
    let fz = fy - lab.b / 200.0;

    let x = WHITE_X * lab_f_inv(fx);
    let y = WHITE_Y * lab_f_inv(fy);
    let z = WHITE_Z * lab_f_inv(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    let q = |c: f64| -> u8 { (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0).round().clamp(0.0, 255.0) as u8 };
    [q(r), q(g), q(b)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_primaries() {
        assert!(hue(&Rgb::new(255.0, 0.0, 0.0)).abs() < 1e-9);
        assert!((hue(&Rgb::new(0.0, 255.0, 0.0)) - 1.0 / 3.0).abs() < 1e-9);
        assert!((hue(&Rgb::new(0.0, 0.0, 255.0)) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_hue_wraps_magenta() {
        let h = hue(&Rgb::new(255.0, 0.0, 128.0));
        assert!(h > 0.9 && h < 1.0, "hue {h}");
    }

    #[test]
    fn test_gray_has_zero_hue() {
        assert_eq!(hue(&Rgb::new(90.0, 90.0, 90.0)), 0.0);
    }

    #[test]
    fn test_lab_extremes() {
        let black = rgb_to_lab([0, 0, 0]);
        let white = rgb_to_lab([255, 255, 255]);
        assert!(black.l.abs() < 1e-6);
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);
    }

    #[test]
    fn test_lab_round_trip_is_close() {
        for rgb in [[12, 200, 90], [255, 0, 0], [30, 30, 160], [240, 240, 10]] {
            let back = lab_to_rgb(rgb_to_lab(rgb));
            for i in 0..3 {
                assert!((back[i] as i32 - rgb[i] as i32).abs() <= 1, "{rgb:?} -> {back:?}");
            }
        }
    }
}
