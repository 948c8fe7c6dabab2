//! The display collaborator's pixel buffer.

use super::driver::RenderError;
use crate::core::Color;
use image::{Rgba, RgbaImage};

/// A borrowed `0xAARRGGBB` pixel buffer with a row stride (in pixels).
#[derive(Debug)]
pub struct Surface<'a> {
    pixels: &'a mut [u32],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> Surface<'a> {
    pub fn new(pixels: &'a mut [u32], width: u32, height: u32, stride: usize) -> Result<Self, RenderError> {
        if stride < width as usize {
            return Err(RenderError::Stride { stride, width });
        }
        let required = required_len(width, height, stride);
        if pixels.len() < required {
            return Err(RenderError::SurfaceTooSmall {
                required,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        Color(self.pixels[y as usize * self.stride + x as usize])
    }

    pub fn fill(&mut self, color: Color) {
        for row in self.pixels.chunks_mut(self.stride).take(self.height as usize) {
            let n = (self.width as usize).min(row.len());
            row[..n].fill(color.0);
        }
    }

    /// Split into disjoint mutable row slices (each `width` pixels long).
    pub(crate) fn rows_mut(&mut self) -> Vec<&mut [u32]> {
        let width = self.width as usize;
        self.pixels
            .chunks_mut(self.stride.max(1))
            .take(self.height as usize)
            .map(|row| row.split_at_mut(width).0)
            .collect()
    }

    pub(crate) fn as_slice(&self) -> &[u32] {
        &self.pixels[..]
    }
}

fn required_len(width: u32, height: u32, stride: usize) -> usize {
    if height == 0 {
        0
    } else {
        (height as usize - 1) * stride + width as usize
    }
}

/// Copy a surface into an RGBA image.
pub fn surface_to_image(surface: &Surface<'_>) -> RgbaImage {
    let (w, h) = (surface.width(), surface.height());
    let pixels = surface.as_slice();
    let stride = surface.stride();
    RgbaImage::from_fn(w, h, |x, y| {
        Rgba(Color(pixels[y as usize * stride + x as usize]).to_rgba_bytes())
    })
}
