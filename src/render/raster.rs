//! Scanline triangle rasterizer.
//!
//! A triangle is sorted by screen y into top / mid / bottom and split at the
//! mid vertex into an upper and a lower half that share the long edge
//! (top → bottom). Each half is walked one scanline at a time between its
//! two active edges.
//!
//! Sampling convention: pixel `(x, y)` covers `[x, x + 1) × [y, y + 1)` and is
//! sampled at its center. A row is drawn when its center lies in
//! `[ya, yb)`; a column when its center lies in `[xl, xr)`, so triangles
//! sharing an edge never both draw a pixel on it.
//!
//! Attributes travel as perspective-correct barycentric weights. Edge cursors
//! are set up at the edge's first row and jumped forward to the first row
//! inside the band, so every worker sees the exact same values for a given
//! row no matter where its band starts.

use super::framebuffer::FrameBand;
use super::shader::{Fragment, HalfTriangle, PixelShader, ShadeContext, SpanEnd, TriangleSetup};
use crate::core::PerspectiveLerp;
use nalgebra::Vector3;
use std::ops::Range;

/// Pixel center offset.
const CENTER: f32 = 0.5;

/// First row (or column) whose center is at or past `v`.
#[inline]
fn first_covered(v: f32) -> i32 {
    (v - CENTER).ceil() as i32
}

#[inline]
fn corner(slot: usize) -> Vector3<f32> {
    let mut v = Vector3::zeros();
    v[slot] = 1.0;
    v
}

/// One active edge from slot `a` (upper end) to slot `b`.
struct Edge {
    x0: f32,
    y0: f32,
    dxdy: f32,
    first_row: i32,
    cursor: PerspectiveLerp<Vector3<f32>>,
}

impl Edge {
    fn new(tri: &TriangleSetup, a: usize, b: usize) -> Self {
        let (sa, sb) = (&tri.screen[a], &tri.screen[b]);
        let dy = sb.position.y - sa.position.y;
        let dxdy = if dy > 0.0 {
            (sb.position.x - sa.position.x) / dy
        } else {
            0.0
        };
        let first_row = first_covered(sa.position.y);
        let mut cursor = PerspectiveLerp::new(dy, corner(a), sa.depth, corner(b), sb.depth);
        cursor.displace(first_row as f32 + CENTER - sa.position.y);
        Self {
            x0: sa.position.x,
            y0: sa.position.y,
            dxdy,
            first_row,
            cursor,
        }
    }

    /// Cursor positioned on `row` (>= `first_row`).
    fn cursor_at(&self, row: i32) -> PerspectiveLerp<Vector3<f32>> {
        let mut c = self.cursor;
        c.advance((row as i64 - self.first_row as i64).max(0) as u32);
        c
    }

    #[inline]
    fn x_at(&self, row: i32) -> f32 {
        self.x0 + self.dxdy * (row as f32 + CENTER - self.y0)
    }
}

/// Drives one shader over the triangles of a frame, writing into one band.
pub struct Rasterizer<'s> {
    shader: &'s mut dyn PixelShader,
    width: u32,
    near_epsilon: f32,
    primitive: Option<(usize, usize)>,
    /// Samples that passed the depth test and were stored
    pub pixels_written: u64,
}

impl<'s> Rasterizer<'s> {
    /// `width` is the viewport width in pixels; columns outside
    /// `0..width` are never touched.
    pub fn new(shader: &'s mut dyn PixelShader, width: u32, near_epsilon: f32) -> Self {
        Self {
            shader,
            width,
            near_epsilon,
            primitive: None,
            pixels_written: 0,
        }
    }

    /// Rasterize one triangle, touching only the band's rows.
    pub fn draw(&mut self, ctx: &ShadeContext<'_>, band: &mut FrameBand<'_>, tri: &TriangleSetup) {
        if band.is_empty() {
            return;
        }
        let key = (tri.material, tri.node);
        if self.primitive != Some(key) {
            self.shader.prepare_for_primitive(ctx, tri.material);
            self.primitive = Some(key);
        }

        let s = &tri.screen;
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| s[a].position.y.total_cmp(&s[b].position.y));
        let [top, mid, bot] = order;
        let (pt, pm, pb) = (s[top].position, s[mid].position, s[bot].position);

        let height = pb.y - pt.y;
        if !(height > 0.0) {
            return;
        }
        let long_x_at_mid = pt.x + (pb.x - pt.x) * ((pm.y - pt.y) / height);
        if long_x_at_mid == pm.x {
            return;
        }
        let is_long_edge_right = long_x_at_mid > pm.x;

        let band_rows = band.rows();
        let band_rows = band_rows.start as i32..band_rows.end as i32;
        let upper_rows = first_covered(pt.y)..first_covered(pm.y);
        let lower_rows = first_covered(pm.y)..first_covered(pb.y);
        if intersect(&upper_rows, &band_rows).is_empty() && intersect(&lower_rows, &band_rows).is_empty() {
            return;
        }

        self.shader.prepare_for_triangle(ctx, tri);

        let long = Edge::new(tri, top, bot);
        let halves = [
            (true, [top, mid], upper_rows),
            (false, [mid, bot], lower_rows),
        ];
        for (is_upper, short_edge, rows) in halves {
            let rows = intersect(&rows, &band_rows);
            if rows.is_empty() {
                continue;
            }
            self.shader.prepare_for_half_triangle(
                ctx,
                &HalfTriangle {
                    is_upper,
                    is_long_edge_right,
                    long_edge: [top, bot],
                    short_edge,
                },
            );
            let short = Edge::new(tri, short_edge[0], short_edge[1]);
            let (left, right) = if is_long_edge_right {
                (&short, &long)
            } else {
                (&long, &short)
            };
            self.walk(ctx, band, left, right, rows);
        }
    }

    fn walk(&mut self, ctx: &ShadeContext<'_>, band: &mut FrameBand<'_>, left: &Edge, right: &Edge, rows: Range<i32>) {
        let mut left_cursor = left.cursor_at(rows.start);
        let mut right_cursor = right.cursor_at(rows.start);
        let width = self.width as i32;

        for y in rows {
            let (l_bary, l_depth) = left_cursor.value();
            let (r_bary, r_depth) = right_cursor.value();
            let l = SpanEnd {
                x: left.x_at(y),
                bary: l_bary,
                depth: l_depth,
            };
            let r = SpanEnd {
                x: right.x_at(y),
                bary: r_bary,
                depth: r_depth,
            };
            left_cursor.step();
            right_cursor.step();

            let first = first_covered(l.x);
            let columns = first.max(0)..first_covered(r.x).min(width);
            if columns.is_empty() {
                continue;
            }
            self.shader.prepare_for_scanline(ctx, &l, &r);

            let mut span = PerspectiveLerp::new(r.x - l.x, l.bary, l.depth, r.bary, r.depth);
            span.displace(first as f32 + CENTER - l.x);
            span.advance((columns.start as i64 - first as i64) as u32);

            for x in columns {
                let (bary, depth) = span.value();
                span.step();
                if !(depth > self.near_epsilon && depth < band.depth_at(x as u32, y as u32)) {
                    continue;
                }
                let color = self.shader.shade(ctx, &Fragment { x, y, bary, depth });
                if band.write(x as u32, y as u32, depth, color) {
                    self.pixels_written += 1;
                }
            }
        }
    }
}

fn intersect(a: &Range<i32>, b: &Range<i32>) -> Range<i32> {
    a.start.max(b.start)..a.end.min(b.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;
    use crate::render::framebuffer::{split_rows, Framebuffer};
    use crate::render::shader::SolidColor;
    use crate::render::vertex::{FrameVertices, ScreenVertex, VertexId};
    use crate::scene::{Material, Scene};
    use nalgebra::Vector2;

    fn setup(points: [(f32, f32, f32); 3]) -> TriangleSetup {
        TriangleSetup {
            vertices: [VertexId::Scene(0), VertexId::Scene(1), VertexId::Scene(2)],
            screen: points.map(|(x, y, depth)| ScreenVertex {
                position: Vector2::new(x, y),
                depth,
            }),
            material: 0,
            node: 0,
        }
    }

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_material(Material::new("white", Color::WHITE));
        scene
    }

    fn draw(fb: &mut Framebuffer, tris: &[TriangleSetup], bands: usize) -> u64 {
        let scene = scene();
        let frame = FrameVertices::new(&scene.vertices, 1, vec![], vec![]);
        let ctx = ShadeContext {
            scene: &scene,
            vertices: &frame,
            eye: Vector3::zeros(),
        };
        let width = fb.width();
        let rows = split_rows(fb.height(), bands);
        let mut written = 0;
        for mut band in fb.bands(&rows) {
            let mut shader = SolidColor::new();
            let mut r = Rasterizer::new(&mut shader, width, 0.001);
            for t in tris {
                r.draw(&ctx, &mut band, t);
            }
            written += r.pixels_written;
        }
        written
    }

    #[test]
    fn test_axis_aligned_right_triangle_coverage() {
        let mut fb = Framebuffer::new(8, 8, 0);
        // Legs along x = 0 and y = 0, hypotenuse x + y = 4.
        let written = draw(&mut fb, &[setup([(0.0, 0.0, 1.0), (4.0, 0.0, 1.0), (0.0, 4.0, 1.0)])], 1);
        // Centers strictly inside x + y < 4: rows 0..3 get 3, 2, 1 pixels.
        assert_eq!(written, 6);
        assert_eq!(fb.pixel(0, 0), Color::WHITE);
        assert_eq!(fb.pixel(2, 0), Color::WHITE);
        assert_eq!(fb.pixel(3, 0), Color::TRANSPARENT);
        assert_eq!(fb.pixel(0, 2), Color::WHITE);
        assert_eq!(fb.pixel(0, 3), Color::TRANSPARENT);
    }

    #[test]
    fn test_shared_edge_drawn_once() {
        let mut fb = Framebuffer::new(8, 8, 0);
        let quad = [
            setup([(1.0, 1.0, 1.0), (7.0, 1.0, 1.0), (7.0, 7.0, 1.0)]),
            setup([(1.0, 1.0, 1.0), (7.0, 7.0, 1.0), (1.0, 7.0, 1.0)]),
        ];
        let written = draw(&mut fb, &quad, 1);
        assert_eq!(written, 36);
    }

    #[test]
    fn test_bands_match_single_pass() {
        let tris = [
            setup([(0.3, 0.7, 2.0), (7.6, 2.2, 5.0), (3.1, 7.9, 1.5)]),
            setup([(5.0, -3.0, 1.0), (9.0, 5.5, 3.0), (-2.0, 4.0, 2.0)]),
        ];
        let mut one = Framebuffer::new(8, 8, 0);
        let mut many = Framebuffer::new(8, 8, 0);
        draw(&mut one, &tris, 1);
        draw(&mut many, &tris, 5);
        assert_eq!(one.color(), many.color());
        let bits = |fb: &Framebuffer| fb.depth().iter().map(|d| d.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&one), bits(&many));
    }

    #[test]
    fn test_degenerate_skipped() {
        let mut fb = Framebuffer::new(4, 4, 0);
        let flat = setup([(0.0, 1.0, 1.0), (2.0, 1.0, 1.0), (4.0, 1.0, 1.0)]);
        let line = setup([(0.0, 0.0, 1.0), (1.0, 1.0, 1.0), (3.0, 3.0, 1.0)]);
        assert_eq!(draw(&mut fb, &[flat, line], 1), 0);
    }

    #[test]
    fn test_offscreen_columns_clipped() {
        let mut fb = Framebuffer::new(4, 4, 0);
        let written = draw(&mut fb, &[setup([(-10.0, 0.0, 1.0), (10.0, 0.0, 1.0), (0.0, 4.0, 1.0)])], 2);
        assert!(written > 0);
        assert_eq!(fb.pixel(0, 0), Color::WHITE);
        assert_eq!(fb.pixel(3, 0), Color::WHITE);
    }
}
