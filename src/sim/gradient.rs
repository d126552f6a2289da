//! Linear RGB colors and the piecewise-linear gradient used to tint spheres

use serde::{Deserialize, Serialize};

/// Linear-space RGB color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// From a 0xRRGGBB sRGB hex value, converted to linear
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Component-wise blend; `t = 0` is `self`, `t = 1` is `other`
    #[inline]
    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color::new(
            self.r + t * (other.r - self.r),
            self.g + t * (other.g - self.g),
            self.b + t * (other.b - self.b),
        )
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

/// Evenly spaced color stops sampled over [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradient {
    stops: Vec<Color>,
}

impl ColorGradient {
    /// Needs at least two stops; fewer means "no gradient"
    pub fn new(stops: &[Color]) -> Option<Self> {
        (stops.len() >= 2).then(|| Self {
            stops: stops.to_vec(),
        })
    }

    /// Sample at `ratio` (clamped to [0, 1])
    ///
    /// The ratio is scaled by `stops - 1`; its integer part picks the segment
    /// and the fraction blends across it.
    pub fn color_at(&self, ratio: f32) -> Color {
        let last = self.stops.len() - 1;
        let scaled = ratio.clamp(0.0, 1.0) * last as f32;
        let idx = scaled.floor() as usize;
        let start = self.stops[idx.min(last)];
        if idx >= last {
            return start;
        }
        start.lerp(self.stops[idx + 1], scaled - idx as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C0: Color = Color::new(1.0, 0.0, 0.0);
    const C1: Color = Color::new(0.0, 1.0, 0.0);
    const C2: Color = Color::new(0.0, 0.0, 1.0);

    #[test]
    fn test_needs_two_stops() {
        assert!(ColorGradient::new(&[]).is_none());
        assert!(ColorGradient::new(&[C0]).is_none());
        assert!(ColorGradient::new(&[C0, C1]).is_some());
    }

    #[test]
    fn test_three_stop_sampling() {
        let gradient = ColorGradient::new(&[C0, C1, C2]).unwrap();

        assert_eq!(gradient.color_at(0.0), C0);
        // 0.5 * 2 = 1.0 lands exactly on the middle stop
        assert_eq!(gradient.color_at(0.5), C1);
        assert_eq!(gradient.color_at(1.0), C2);

        // 0.25 * 2 = 0.5: halfway between C0 and C1
        assert_eq!(gradient.color_at(0.25), Color::new(0.5, 0.5, 0.0));
        // 0.75 * 2 = 1.5: halfway between C1 and C2
        assert_eq!(gradient.color_at(0.75), Color::new(0.0, 0.5, 0.5));
    }

    #[test]
    fn test_two_stop_midpoint() {
        let gradient = ColorGradient::new(&[C0, C2]).unwrap();
        assert_eq!(gradient.color_at(0.5), Color::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_ratio_is_clamped() {
        let gradient = ColorGradient::new(&[C0, C1, C2]).unwrap();
        assert_eq!(gradient.color_at(-3.0), C0);
        assert_eq!(gradient.color_at(7.0), C2);
    }

    #[test]
    fn test_from_hex_linearizes() {
        let white = Color::from_hex(0xffffff);
        assert!((white.r - 1.0).abs() < 1e-5 && (white.b - 1.0).abs() < 1e-5);
        assert_eq!(Color::from_hex(0x000000), Color::BLACK);
        let mid = Color::from_hex(0x808080);
        // sRGB 0.5 is roughly 0.216 linear
        assert!((mid.r - 0.2158605).abs() < 1e-4);
        assert_eq!(mid.r, mid.g);

        let green = Color::from_hex(0x00ff41);
        assert_eq!(green.r, 0.0);
        assert!((green.g - 1.0).abs() < 1e-5);
        assert!(green.b > 0.0 && green.b < 0.1);
    }
}
