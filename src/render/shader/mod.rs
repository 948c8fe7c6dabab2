//! Pixel shading pipeline.
//!
//! The rasterizer drives a shader through a fixed set of hooks, coarsest
//! first, so each shader can hoist work to the coarsest level where it is
//! still valid:
//!
//! ```text
//! prepare_for_primitive       once per run of triangles sharing material + node
//!   prepare_for_triangle      once per triangle (per-vertex terms)
//!     prepare_for_half_triangle   upper / lower half (edge deltas)
//!       prepare_for_scanline      once per span (span deltas)
//!         shade                   once per pixel that passed the depth test
//! ```
//!
//! Interpolated positions are handed over as perspective-correct barycentric
//! weights of the triangle's three vertices (in [`TriangleSetup`] order), so
//! any per-vertex attribute can be reconstructed with [`blend`].
//!
//! Shaders compose: lighting shaders output an RGB intensity, color shaders
//! output a [`Color`], and [`Lit`] folds one into the other.

mod combine;
mod lighting;
mod texture;

pub use combine::Lit;
pub use lighting::{evaluate_lighting, FlatLighting, SmoothLighting};
pub use texture::{mip_level_for_stretch, SolidColor, Textured, MIP_STRETCH_THRESHOLD};

use super::vertex::{FrameVertices, ScreenVertex, VertexId};
use crate::core::{Attribute, Color};
use crate::scene::Scene;
use nalgebra::Vector3;

/// Read-only frame data available to every hook.
pub struct ShadeContext<'a> {
    pub scene: &'a Scene,
    pub vertices: &'a FrameVertices<'a>,
    /// Camera position in world space
    pub eye: Vector3<f32>,
}

/// The triangle about to be rasterized.
#[derive(Clone, Copy, Debug)]
pub struct TriangleSetup {
    pub vertices: [VertexId; 3],
    pub screen: [ScreenVertex; 3],
    pub material: usize,
    pub node: usize,
}

/// One half of a triangle split at its middle vertex. Edge endpoints are slot
/// indices into the owning [`TriangleSetup`], top first.
#[derive(Clone, Copy, Debug)]
pub struct HalfTriangle {
    pub is_upper: bool,
    pub is_long_edge_right: bool,
    pub long_edge: [usize; 2],
    pub short_edge: [usize; 2],
}

/// One end of a scanline span.
#[derive(Clone, Copy, Debug)]
pub struct SpanEnd {
    /// Exact (unrounded) edge x in pixels
    pub x: f32,
    pub bary: Vector3<f32>,
    pub depth: f32,
}

/// A pixel that passed the depth test.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    pub x: i32,
    pub y: i32,
    pub bary: Vector3<f32>,
    pub depth: f32,
}

/// A shading stage. Every hook but `shade` defaults to doing nothing.
pub trait Shader: Send {
    type Output;

    fn prepare_for_primitive(&mut self, _ctx: &ShadeContext<'_>, _material: usize) {}

    fn prepare_for_triangle(&mut self, _ctx: &ShadeContext<'_>, _tri: &TriangleSetup) {}

    fn prepare_for_half_triangle(&mut self, _ctx: &ShadeContext<'_>, _half: &HalfTriangle) {}

    fn prepare_for_scanline(&mut self, _ctx: &ShadeContext<'_>, _left: &SpanEnd, _right: &SpanEnd) {}

    fn shade(&mut self, ctx: &ShadeContext<'_>, frag: &Fragment) -> Self::Output;
}

/// A shader producing final colors, boxed per viewport. Each worker thread
/// shades with its own clone.
pub trait PixelShader: Shader<Output = Color> {
    fn clone_boxed(&self) -> Box<dyn PixelShader>;
}

impl<T> PixelShader for T
where
    T: Shader<Output = Color> + Clone + 'static,
{
    fn clone_boxed(&self) -> Box<dyn PixelShader> {
        Box::new(self.clone())
    }
}

/// Combine three per-vertex values with barycentric weights.
#[inline]
pub fn blend<A: Attribute>(bary: &Vector3<f32>, values: &[A; 3]) -> A {
    values[0] * bary.x + values[1] * bary.y + values[2] * bary.z
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn test_blend_corners_and_center() {
        let uv = [Vector2::new(0.0f32, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        assert_relative_eq!(blend(&Vector3::new(0.0, 1.0, 0.0), &uv), uv[1]);
        let c = blend(&Vector3::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0), &uv);
        assert_relative_eq!(c, Vector2::new(1.0 / 3.0, 1.0 / 3.0), epsilon = 1e-6);
    }
}
