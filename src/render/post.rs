//! Post effects applied to composited rows.
//!
//! Every effect reads and writes a single row, so each worker can run them on
//! its own band without seeing its neighbours' rows.

use super::framebuffer::FrameBand;
use crate::core::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostEffect {
    #[default]
    None,
    /// Blend toward `color` linearly between depths `start` and `end`.
    /// Pixels with no opaque surface are left alone.
    DepthFog { color: Color, start: f32, end: f32 },
    /// Box blur over `2 * radius + 1` pixels of the same row.
    HorizontalBlur { radius: u32 },
}

impl PostEffect {
    pub fn apply(&self, band: &mut FrameBand<'_>) {
        match *self {
            PostEffect::None => {}
            PostEffect::DepthFog { color, start, end } => {
                for (_, row, depth) in band.rows_mut() {
                    fog_row(row, depth, color, start, end);
                }
            }
            PostEffect::HorizontalBlur { radius } => {
                if radius == 0 {
                    return;
                }
                let mut scratch = Vec::new();
                for (_, row, _) in band.rows_mut() {
                    blur_row(row, radius as usize, &mut scratch);
                }
            }
        }
    }
}

fn fog_row(row: &mut [Color], depth: &[f32], fog: Color, start: f32, end: f32) {
    let span = end - start;
    for (c, &d) in row.iter_mut().zip(depth) {
        if !d.is_finite() {
            continue;
        }
        let t = if span > 0.0 {
            (d - start) / span
        } else if d >= end {
            1.0
        } else {
            0.0
        };
        *c = c.lerp(fog.with_alpha(c.a()), t);
    }
}

fn blur_row(row: &mut [Color], radius: usize, scratch: &mut Vec<Color>) {
    scratch.clear();
    scratch.extend_from_slice(row);
    let n = row.len();
    for (x, out) in row.iter_mut().enumerate() {
        let lo = x.saturating_sub(radius);
        let hi = (x + radius + 1).min(n);
        let mut sum = [0u32; 4];
        for c in &scratch[lo..hi] {
            for (s, v) in sum.iter_mut().zip(c.to_rgba_bytes()) {
                *s += v as u32;
            }
        }
        let count = (hi - lo) as u32;
        *out = Color::from_rgba_bytes(sum.map(|s| ((s + count / 2) / count) as u8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::framebuffer::Framebuffer;

    #[test]
    fn test_fog_ramps_with_depth() {
        let mut fb = Framebuffer::new(3, 1, 0);
        let mut band = fb.band();
        band.write_opaque(0, 0, 1.0, Color::BLACK);
        band.write_opaque(1, 0, 5.0, Color::BLACK);
        band.write_opaque(2, 0, 20.0, Color::BLACK);
        PostEffect::DepthFog { color: Color::WHITE, start: 0.0, end: 10.0 }.apply(&mut band);
        assert_eq!(fb.pixel(0, 0), Color::BLACK.lerp(Color::WHITE, 0.1));
        assert_eq!(fb.pixel(1, 0), Color::rgb(128, 128, 128));
        assert_eq!(fb.pixel(2, 0), Color::WHITE);
    }

    #[test]
    fn test_fog_skips_background() {
        let mut fb = Framebuffer::new(1, 1, 0);
        PostEffect::DepthFog { color: Color::WHITE, start: 0.0, end: 1.0 }.apply(&mut fb.band());
        assert_eq!(fb.pixel(0, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_blur_spreads_within_row_only() {
        let mut fb = Framebuffer::new(3, 2, 0);
        let mut band = fb.band();
        band.write_opaque(1, 0, 1.0, Color::rgba(90, 90, 90, 255));
        PostEffect::HorizontalBlur { radius: 1 }.apply(&mut band);
        assert_eq!(fb.pixel(0, 0).r(), 45);
        assert_eq!(fb.pixel(1, 0).r(), 30);
        assert_eq!(fb.pixel(0, 1), Color::TRANSPARENT);
    }
}
