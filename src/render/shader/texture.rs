//! Color shaders: the material base color, optionally textured.

use super::{blend, Fragment, HalfTriangle, ShadeContext, Shader, SpanEnd, TriangleSetup};
use crate::core::Color;
use crate::scene::Filter;
use nalgebra::Vector2;

/// Texels per pixel above which sampling moves one mip level down the chain.
pub const MIP_STRETCH_THRESHOLD: f32 = 1.5;

/// Mip level for a texel/pixel stretch: step up a level (halving the
/// stretch) while it exceeds the threshold.
pub fn mip_level_for_stretch(stretch: f32, max_level: usize) -> usize {
    let mut level = 0;
    let mut s = stretch;
    while s > MIP_STRETCH_THRESHOLD && level < max_level {
        s *= 0.5;
        level += 1;
    }
    level
}

/// Flat material base color.
#[derive(Clone, Debug, Default)]
pub struct SolidColor {
    color: Color,
}

impl SolidColor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Shader for SolidColor {
    type Output = Color;

    fn prepare_for_primitive(&mut self, ctx: &ShadeContext<'_>, material: usize) {
        self.color = ctx.scene.materials[material].color;
    }

    fn shade(&mut self, _ctx: &ShadeContext<'_>, _frag: &Fragment) -> Color {
        self.color
    }
}

/// Texture sampling tinted by the material base color. Materials without a
/// texture shade with the base color alone.
///
/// The mip level comes from the larger of two stretches: texels per pixel
/// down a column (from the half-triangle's two edges) and texels per pixel
/// across the span.
#[derive(Clone, Debug)]
pub struct Textured {
    filter: Filter,
    base: Color,
    texture: Option<usize>,
    /// Level-0 size in texels
    size: Vector2<f32>,
    max_level: usize,
    uv: [Vector2<f32>; 3],
    screen: [Vector2<f32>; 3],
    vertical_stretch: f32,
    level: usize,
}

impl Textured {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            base: Color::WHITE,
            texture: None,
            size: Vector2::zeros(),
            max_level: 0,
            uv: [Vector2::zeros(); 3],
            screen: [Vector2::zeros(); 3],
            vertical_stretch: 0.0,
            level: 0,
        }
    }

    /// Mip level chosen for the current span.
    pub fn level(&self) -> usize {
        self.level
    }

    fn texel_distance(&self, a: &Vector2<f32>, b: &Vector2<f32>) -> f32 {
        (b - a).component_mul(&self.size).norm()
    }

    /// Per-row change of x and of texel coordinates along an edge.
    fn edge_gradient(&self, [a, b]: [usize; 2]) -> Option<(f32, Vector2<f32>)> {
        let dy = self.screen[b].y - self.screen[a].y;
        if dy.abs() <= f32::EPSILON {
            return None;
        }
        let dxdy = (self.screen[b].x - self.screen[a].x) / dy;
        let dtdy = (self.uv[b] - self.uv[a]).component_mul(&self.size) / dy;
        Some((dxdy, dtdy))
    }

    /// Texels per pixel between vertically adjacent pixels of one column.
    ///
    /// Along an edge `dt/dy_edge = dt/dy + dt/dx · dx/dy`; two edges with
    /// different slopes pin down both screen gradients.
    fn column_stretch(&self, half: &HalfTriangle) -> f32 {
        let (Some((s1, t1)), Some((s2, t2))) = (
            self.edge_gradient(half.long_edge),
            self.edge_gradient(half.short_edge),
        ) else {
            return 0.0;
        };
        let ds = s1 - s2;
        if ds.abs() <= f32::EPSILON {
            return 0.0;
        }
        let dtdx = (t1 - t2) / ds;
        (t1 - dtdx * s1).norm()
    }
}

impl Shader for Textured {
    type Output = Color;

    fn prepare_for_primitive(&mut self, ctx: &ShadeContext<'_>, material: usize) {
        let mat = &ctx.scene.materials[material];
        self.base = mat.color;
        self.texture = mat.texture;
        if let Some(tex) = mat.texture.map(|t| &ctx.scene.textures[t]) {
            self.size = Vector2::new(tex.width() as f32, tex.height() as f32);
            self.max_level = tex.levels().len().saturating_sub(1);
        }
    }

    fn prepare_for_triangle(&mut self, ctx: &ShadeContext<'_>, tri: &TriangleSetup) {
        if self.texture.is_none() {
            return;
        }
        self.uv = tri.vertices.map(|id| ctx.vertices.attributes(id).texcoord);
        self.screen = tri.screen.map(|s| s.position);
    }

    fn prepare_for_half_triangle(&mut self, _ctx: &ShadeContext<'_>, half: &HalfTriangle) {
        if self.texture.is_none() {
            return;
        }
        self.vertical_stretch = self.column_stretch(half);
    }

    fn prepare_for_scanline(&mut self, _ctx: &ShadeContext<'_>, left: &SpanEnd, right: &SpanEnd) {
        if self.texture.is_none() {
            return;
        }
        let dx = right.x - left.x;
        let horizontal = if dx > 0.0 {
            let uv_left = blend(&left.bary, &self.uv);
            let uv_right = blend(&right.bary, &self.uv);
            self.texel_distance(&uv_left, &uv_right) / dx
        } else {
            0.0
        };
        self.level = mip_level_for_stretch(horizontal.max(self.vertical_stretch), self.max_level);
    }

    fn shade(&mut self, ctx: &ShadeContext<'_>, frag: &Fragment) -> Color {
        match self.texture {
            Some(t) => {
                let uv = blend(&frag.bary, &self.uv);
                ctx.scene.textures[t]
                    .sample(self.level, uv.x, uv.y, self.filter)
                    .modulate(self.base)
            }
            None => self.base,
        }
    }
}
