//! Packed 32-bit colors and the intensity tone curve.
//!
//! Every pixel that crosses a module boundary (framebuffer, texture texels,
//! display surface) uses the same packed layout:
//!
//! ```text
//!   bits 31..24  alpha
//!   bits 23..16  red
//!   bits 15..8   green
//!   bits  7..0   blue
//! ```
//!
//! Shading math happens in `f32` intensities; only the final color is packed.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A packed ARGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0);
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a() == 255
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Color((self.0 & 0x00FF_FFFF) | ((a as u32) << 24))
    }

    /// Channel-wise product, treating 255 as 1.0. Used to tint texels by the
    /// material base color.
    pub fn modulate(self, other: Color) -> Self {
        Self::rgba(
            mul_u8(self.r(), other.r()),
            mul_u8(self.g(), other.g()),
            mul_u8(self.b(), other.b()),
            mul_u8(self.a(), other.a()),
        )
    }

    /// Standard "over": `out = back * (1 - srcA) + src * srcA`, with `self` as
    /// the back color.
    pub fn over(self, src: Color) -> Self {
        let a = src.a() as u32;
        if a == 255 {
            return src;
        }
        if a == 0 {
            return self;
        }
        let inv = 255 - a;
        let mix = |back: u8, front: u8| ((back as u32 * inv + front as u32 * a + 127) / 255) as u8;
        let out_a = a + (self.a() as u32 * inv + 127) / 255;
        Self::rgba(
            mix(self.r(), src.r()),
            mix(self.g(), src.g()),
            mix(self.b(), src.b()),
            out_a.min(255) as u8,
        )
    }

    /// Linear blend toward `other` by `t` in [0, 1], alpha included.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self::rgba(
            mix(self.r(), other.r()),
            mix(self.g(), other.g()),
            mix(self.b(), other.b()),
            mix(self.a(), other.a()),
        )
    }

    /// Apply a per-channel lighting intensity (see [`tone_map_channel`]).
    pub fn lit(self, intensity: &Vector3<f32>) -> Self {
        Self::rgba(
            tone_map_channel(self.r(), intensity.x),
            tone_map_channel(self.g(), intensity.y),
            tone_map_channel(self.b(), intensity.z),
            self.a(),
        )
    }

    /// Channels as `[r, g, b, a]`, the byte order `image::Rgba` expects.
    pub fn to_rgba_bytes(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), self.a()]
    }

    pub fn from_rgba_bytes(p: [u8; 4]) -> Self {
        Self::rgba(p[0], p[1], p[2], p[3])
    }
}

#[inline]
fn mul_u8(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Scale one color channel by a lighting intensity.
///
/// Below unity the channel scales linearly. Above unity the remaining
/// headroom to white is closed by `1 - 1/i`, so bright lights wash colors
/// toward white instead of clipping each channel independently.
pub fn tone_map_channel(channel: u8, intensity: f32) -> u8 {
    let c = channel as f32;
    let i = intensity.max(0.0);
    let out = if i <= 1.0 {
        c * i
    } else {
        c + (255.0 - c) * (1.0 - 1.0 / i)
    };
    out.round().clamp(0.0, 255.0) as u8
}
