//! Color + depth buffers with a bounded stack of transparency layers.
//!
//! Every pixel owns one opaque sample (color, depth) and `K` translucent
//! slots kept sorted near-to-far; an empty slot has depth +inf. Workers never
//! share a [`Framebuffer`] directly: each borrows a disjoint [`FrameBand`] of
//! whole rows for the duration of a render call.

use crate::core::Color;
use std::ops::Range;

/// Depth of an empty sample.
pub const EMPTY_DEPTH: f32 = f32::INFINITY;

#[derive(Clone, Debug)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    layers: usize,
    color: Vec<Color>,
    depth: Vec<f32>,
    layer_color: Vec<Color>,
    layer_depth: Vec<f32>,
}

impl Framebuffer {
    /// A cleared buffer with `layers` transparency slots per pixel.
    pub fn new(width: u32, height: u32, layers: usize) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            layers,
            color: vec![Color::TRANSPARENT; n],
            depth: vec![EMPTY_DEPTH; n],
            layer_color: vec![Color::TRANSPARENT; n * layers],
            layer_depth: vec![EMPTY_DEPTH; n * layers],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// Composited colors, row-major.
    pub fn color(&self) -> &[Color] {
        &self.color
    }

    /// Opaque depths, row-major.
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.color[(y * self.width + x) as usize]
    }

    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[(y * self.width + x) as usize]
    }

    /// The whole buffer as a single band.
    pub fn band(&mut self) -> FrameBand<'_> {
        FrameBand {
            width: self.width as usize,
            layers: self.layers,
            rows: 0..self.height,
            color: &mut self.color,
            depth: &mut self.depth,
            layer_color: &mut self.layer_color,
            layer_depth: &mut self.layer_depth,
        }
    }

    /// Split into one band per row range. Ranges must be ascending,
    /// contiguous and cover `0..height`; empty ranges give empty bands.
    pub fn bands(&mut self, rows: &[Range<u32>]) -> Vec<FrameBand<'_>> {
        let width = self.width as usize;
        let layers = self.layers;
        let mut color = self.color.as_mut_slice();
        let mut depth = self.depth.as_mut_slice();
        let mut layer_color = self.layer_color.as_mut_slice();
        let mut layer_depth = self.layer_depth.as_mut_slice();

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let n = (r.end - r.start) as usize * width;
            let (c, rest) = std::mem::take(&mut color).split_at_mut(n);
            color = rest;
            let (d, rest) = std::mem::take(&mut depth).split_at_mut(n);
            depth = rest;
            let (lc, rest) = std::mem::take(&mut layer_color).split_at_mut(n * layers);
            layer_color = rest;
            let (ld, rest) = std::mem::take(&mut layer_depth).split_at_mut(n * layers);
            layer_depth = rest;
            out.push(FrameBand {
                width,
                layers,
                rows: r.clone(),
                color: c,
                depth: d,
                layer_color: lc,
                layer_depth: ld,
            });
        }
        out
    }
}

/// Split `height` rows into `parts` contiguous ranges of at most
/// `ceil(height / parts)` rows. Trailing ranges may be empty.
pub fn split_rows(height: u32, parts: usize) -> Vec<Range<u32>> {
    let parts = parts.max(1) as u32;
    let per = (height + parts - 1) / parts;
    (0..parts)
        .map(|i| {
            let start = (i * per).min(height);
            let end = ((i + 1) * per).min(height);
            start..end
        })
        .collect()
}

/// Exclusive access to a range of whole rows of a [`Framebuffer`].
/// Coordinates passed in are absolute framebuffer coordinates.
#[derive(Debug)]
pub struct FrameBand<'a> {
    width: usize,
    layers: usize,
    rows: Range<u32>,
    color: &'a mut [Color],
    depth: &'a mut [f32],
    layer_color: &'a mut [Color],
    layer_depth: &'a mut [f32],
}

impl<'a> FrameBand<'a> {
    pub fn rows(&self) -> Range<u32> {
        self.rows.clone()
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y - self.rows.start) as usize * self.width + x as usize
    }

    /// Reset color to transparent black and every depth to +inf.
    pub fn clear(&mut self) {
        self.color.fill(Color::TRANSPARENT);
        self.depth.fill(EMPTY_DEPTH);
        self.layer_color.fill(Color::TRANSPARENT);
        self.layer_depth.fill(EMPTY_DEPTH);
    }

    /// Fill the opaque color of every pixel. Depth is untouched.
    pub fn fill(&mut self, color: Color) {
        self.color.fill(color);
    }

    /// Opaque depth at a pixel of this band.
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    /// Route a shaded sample by alpha: opaque, translucent, or (alpha 0)
    /// discarded. Returns whether anything was stored.
    #[inline]
    pub fn write(&mut self, x: u32, y: u32, depth: f32, color: Color) -> bool {
        match color.a() {
            255 => self.write_opaque(x, y, depth, color),
            0 => false,
            _ => self.write_translucent(x, y, depth, color),
        }
    }

    /// Nearest-wins opaque write. Translucent samples at or behind the new
    /// depth are evicted.
    pub fn write_opaque(&mut self, x: u32, y: u32, depth: f32, color: Color) -> bool {
        let i = self.index(x, y);
        if !(depth < self.depth[i]) {
            return false;
        }
        self.depth[i] = depth;
        self.color[i] = color;

        let k = self.layers;
        let slots = &mut self.layer_depth[i * k..(i + 1) * k];
        if let Some(first) = slots.iter().position(|&d| d >= depth) {
            slots[first..].fill(EMPTY_DEPTH);
            self.layer_color[i * k + first..(i + 1) * k].fill(Color::TRANSPARENT);
        }
        true
    }

    /// Insert a translucent sample at its depth-sorted slot. With all slots
    /// taken the farthest of the candidates is dropped.
    ///
    /// With no slots at all the sample blends straight onto the opaque color
    /// and leaves the depth untouched, so the result depends on draw order:
    /// an opaque sample behind it that arrives later replaces the blend, and
    /// translucent samples stack in arrival order rather than depth order.
    pub fn write_translucent(&mut self, x: u32, y: u32, depth: f32, color: Color) -> bool {
        let i = self.index(x, y);
        if !(depth < self.depth[i]) {
            return false;
        }
        let k = self.layers;
        if k == 0 {
            self.color[i] = self.color[i].over(color);
            return true;
        }

        let depths = &mut self.layer_depth[i * k..(i + 1) * k];
        let Some(slot) = depths.iter().position(|&d| d > depth) else {
            return false;
        };
        depths.copy_within(slot..k - 1, slot + 1);
        depths[slot] = depth;

        let colors = &mut self.layer_color[i * k..(i + 1) * k];
        colors.copy_within(slot..k - 1, slot + 1);
        colors[slot] = color;
        true
    }

    /// Flatten every pixel: blend occupied layers onto the opaque color,
    /// farthest first.
    pub fn composite(&mut self) {
        let k = self.layers;
        if k == 0 {
            return;
        }
        for (i, out) in self.color.iter_mut().enumerate() {
            let depths = &self.layer_depth[i * k..(i + 1) * k];
            let colors = &self.layer_color[i * k..(i + 1) * k];
            for (d, c) in depths.iter().zip(colors).rev() {
                if d.is_finite() {
                    *out = out.over(*c);
                }
            }
        }
    }

    /// Colors of one row (absolute `y`).
    pub fn color_row(&self, y: u32) -> &[Color] {
        let start = self.index(0, y);
        &self.color[start..start + self.width]
    }

    /// Mutable colors and read-only depths of every row, top to bottom.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (u32, &mut [Color], &[f32])> + '_ {
        let width = self.width.max(1);
        let start = self.rows.start;
        self.color
            .chunks_mut(width)
            .zip(self.depth.chunks(width))
            .enumerate()
            .map(move |(r, (c, d))| (start + r as u32, c, d))
    }
}
