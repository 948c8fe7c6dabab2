//! Textures and their mipmap chains.
//!
//! Level 0 is the full-resolution bitmap; every following level is exactly
//! half the width and height of the previous one (never below 1), produced by
//! a 2×2 box filter. Texels are packed [`Color`]s.

use crate::core::Color;
use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building textures from provider data.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} texels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("mip level {level} is {actual:?}, expected {expected:?}")]
    LevelSize {
        level: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Texture sampling filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    #[default]
    Nearest,
    Bilinear,
}

/// One level of a mipmap chain.
#[derive(Clone, Debug)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<Color>,
}

impl MipLevel {
    pub fn new(width: u32, height: u32, texels: Vec<Color>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(TextureError::BufferSize {
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    #[inline]
    fn texel(&self, x: i64, y: i64) -> Color {
        let w = self.width as i64;
        let h = self.height as i64;
        let xi = x.rem_euclid(w) as usize;
        let yi = y.rem_euclid(h) as usize;
        self.texels[yi * self.width as usize + xi]
    }

    /// Nearest-texel lookup with repeat wrapping.
    pub fn sample_nearest(&self, u: f32, v: f32) -> Color {
        let x = (u * self.width as f32).floor() as i64;
        let y = (v * self.height as f32).floor() as i64;
        self.texel(x, y)
    }

    /// Bilinear lookup with repeat wrapping. Texel centers sit at half-integer
    /// coordinates.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> Color {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), tx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }

    /// Box-filter this level down to the next one.
    fn downsample(&self) -> MipLevel {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = vec![Color::TRANSPARENT; width as usize * height as usize];

        texels
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                let sy = (y as u32 * 2).min(self.height - 1) as i64;
                let sy1 = (y as u32 * 2 + 1).min(self.height - 1) as i64;
                for (x, out) in row.iter_mut().enumerate() {
                    let sx = (x as u32 * 2).min(self.width - 1) as i64;
                    let sx1 = (x as u32 * 2 + 1).min(self.width - 1) as i64;
                    let quad = [
                        self.texel(sx, sy),
                        self.texel(sx1, sy),
                        self.texel(sx, sy1),
                        self.texel(sx1, sy1),
                    ];
                    let avg = |f: fn(Color) -> u8| {
                        ((quad.iter().map(|&c| f(c) as u32).sum::<u32>() + 2) / 4) as u8
                    };
                    *out = Color::rgba(avg(Color::r), avg(Color::g), avg(Color::b), avg(Color::a));
                }
            });

        MipLevel {
            width,
            height,
            texels,
        }
    }
}

/// A texture: an ordered mipmap chain, level 0 first.
#[derive(Clone, Debug)]
pub struct Texture {
    levels: Vec<MipLevel>,
}

impl Texture {
    /// Build the full chain (down to 1×1) from a level-0 bitmap.
    pub fn from_rgba(width: u32, height: u32, texels: Vec<Color>) -> Result<Self, TextureError> {
        let mut levels = vec![MipLevel::new(width, height, texels)?];
        loop {
            let last = &levels[levels.len() - 1];
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }
        log::trace!("built {} mip levels for {}x{} texture", levels.len(), width, height);
        Ok(Self { levels })
    }

    /// Accept a provider-built chain, checking that each level halves the
    /// previous one.
    pub fn from_levels(levels: Vec<MipLevel>) -> Result<Self, TextureError> {
        let Some(first) = levels.first() else {
            return Err(TextureError::Empty {
                width: 0,
                height: 0,
            });
        };
        let mut expected = (first.width, first.height);
        for (level, mip) in levels.iter().enumerate() {
            if (mip.width, mip.height) != expected {
                return Err(TextureError::LevelSize {
                    level,
                    expected,
                    actual: (mip.width, mip.height),
                });
            }
            expected = ((expected.0 / 2).max(1), (expected.1 / 2).max(1));
        }
        Ok(Self { levels })
    }

    /// Convert a decoded `image` bitmap.
    pub fn from_image(img: &RgbaImage) -> Result<Self, TextureError> {
        let texels = img.pixels().map(|p| Color::from_rgba_bytes(p.0)).collect();
        Self::from_rgba(img.width(), img.height(), texels)
    }

    /// Two-color checkerboard with `cell`-texel squares.
    pub fn checkerboard(size: u32, cell: u32, a: Color, b: Color) -> Result<Self, TextureError> {
        let cell = cell.max(1);
        let texels = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if ((x / cell) + (y / cell)) % 2 == 0 {
                    a
                } else {
                    b
                }
            })
            .collect();
        Self::from_rgba(size, size, texels)
    }

    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    /// Level `index`, clamped to the smallest available.
    #[inline]
    pub fn level(&self, index: usize) -> &MipLevel {
        &self.levels[index.min(self.levels.len() - 1)]
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    pub fn sample(&self, level: usize, u: f32, v: f32, filter: Filter) -> Color {
        let mip = self.level(level);
        match filter {
            Filter::Nearest => mip.sample_nearest(u, v),
            Filter::Bilinear => mip.sample_bilinear(u, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_halves_to_one() {
        let tex = Texture::from_rgba(8, 4, vec![Color::WHITE; 32]).unwrap();
        let sizes: Vec<_> = tex.levels().iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
    }

    #[test]
    fn test_box_filter_averages() {
        let texels = vec![
            Color::rgb(0, 0, 0),
            Color::rgb(200, 0, 0),
            Color::rgb(0, 100, 0),
            Color::rgb(200, 100, 40),
        ];
        let tex = Texture::from_rgba(2, 2, texels).unwrap();
        let c = tex.level(1).texels[0];
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (100, 50, 10, 255));
    }

    #[test]
    fn test_from_levels_rejects_bad_halving() {
        let l0 = MipLevel::new(4, 4, vec![Color::WHITE; 16]).unwrap();
        let l1 = MipLevel::new(3, 2, vec![Color::WHITE; 6]).unwrap();
        assert!(matches!(
            Texture::from_levels(vec![l0, l1]),
            Err(TextureError::LevelSize { level: 1, .. })
        ));
    }

    #[test]
    fn test_buffer_size_checked() {
        assert!(matches!(
            MipLevel::new(2, 2, vec![Color::WHITE; 3]),
            Err(TextureError::BufferSize { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_nearest_wraps() {
        let tex = Texture::checkerboard(2, 1, Color::WHITE, Color::BLACK).unwrap();
        assert_eq!(tex.sample(0, 0.25, 0.25, Filter::Nearest), Color::WHITE);
        assert_eq!(tex.sample(0, 0.75, 0.25, Filter::Nearest), Color::BLACK);
        assert_eq!(tex.sample(0, 1.25, 0.25, Filter::Nearest), Color::WHITE);
        assert_eq!(tex.sample(0, -0.25, 0.25, Filter::Nearest), Color::BLACK);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let tex = Texture::from_rgba(2, 1, vec![Color::rgb(0, 0, 0), Color::rgb(200, 200, 200)]).unwrap();
        // Halfway between the two texel centers.
        let c = tex.sample(0, 0.5, 0.5, Filter::Bilinear);
        assert_eq!(c.r(), 100);
    }
}
