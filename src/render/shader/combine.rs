//! Lighting × color combinator.

use super::{Fragment, HalfTriangle, ShadeContext, Shader, SpanEnd, TriangleSetup};
use crate::core::Color;
use nalgebra::Vector3;

/// Folds a lighting intensity into a color shader's output through the tone
/// curve (`Color::lit`). Every hook is forwarded to both stages.
#[derive(Clone, Debug)]
pub struct Lit<L, C> {
    pub lighting: L,
    pub color: C,
}

impl<L, C> Lit<L, C> {
    pub fn new(lighting: L, color: C) -> Self {
        Self { lighting, color }
    }
}

impl<L, C> Shader for Lit<L, C>
where
    L: Shader<Output = Vector3<f32>>,
    C: Shader<Output = Color>,
{
    type Output = Color;

    fn prepare_for_primitive(&mut self, ctx: &ShadeContext<'_>, material: usize) {
        self.lighting.prepare_for_primitive(ctx, material);
        self.color.prepare_for_primitive(ctx, material);
    }

    fn prepare_for_triangle(&mut self, ctx: &ShadeContext<'_>, tri: &TriangleSetup) {
        self.lighting.prepare_for_triangle(ctx, tri);
        self.color.prepare_for_triangle(ctx, tri);
    }

    fn prepare_for_half_triangle(&mut self, ctx: &ShadeContext<'_>, half: &HalfTriangle) {
        self.lighting.prepare_for_half_triangle(ctx, half);
        self.color.prepare_for_half_triangle(ctx, half);
    }

    fn prepare_for_scanline(&mut self, ctx: &ShadeContext<'_>, left: &SpanEnd, right: &SpanEnd) {
        self.lighting.prepare_for_scanline(ctx, left, right);
        self.color.prepare_for_scanline(ctx, left, right);
    }

    fn shade(&mut self, ctx: &ShadeContext<'_>, frag: &Fragment) -> Color {
        let intensity = self.lighting.shade(ctx, frag);
        self.color.shade(ctx, frag).lit(&intensity)
    }
}
