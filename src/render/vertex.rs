//! Vertex pipeline: world → viewport projection, frustum rejection,
//! near-plane clipping and backface culling.
//!
//! Projection maps a world position through view, projection and viewport
//! matrices. x and y are divided by |depth| (configurable), and the depth is
//! kept as the positive view-space distance, which is what the depth buffer
//! compares.
//!
//! A triangle with some vertices in front of the near plane and some behind
//! it is never rasterized as-is: it is replaced by one or two synthesized
//! triangles that lie entirely at depth >= epsilon.

use super::config::{FrontFace, RenderConfig};
use crate::core::math::{projection_matrix, signed_area, transform_2d, viewport_matrix};
use crate::core::Camera;
use crate::scene::{Material, Triangle, Vertex};
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// Per-viewport projection state, read-only during a render call.
#[derive(Clone, Debug)]
pub struct ViewTransform {
    /// projection × view
    pub view_projection: Matrix4<f32>,
    /// NDC → pixel
    pub viewport: Matrix3<f32>,
    pub width: f32,
    pub height: f32,
    pub eye: Vector3<f32>,
    pub near_epsilon: f32,
    pub divide_by_abs_depth: bool,
    pub front_face: FrontFace,
}

impl ViewTransform {
    pub fn new(camera: &Camera, width: u32, height: u32, config: &RenderConfig) -> Self {
        let (w, h) = (width as f32, height as f32);
        let aspect = if h > 0.0 { w / h } else { 1.0 };
        Self {
            view_projection: projection_matrix(camera.fov_y, aspect) * camera.view_matrix(),
            viewport: viewport_matrix(w, h),
            width: w,
            height: h,
            eye: camera.position,
            near_epsilon: config.near_epsilon,
            divide_by_abs_depth: config.divide_by_abs_depth,
            front_face: config.front_face,
        }
    }

    /// Project a world position to viewport pixels plus comparison depth.
    #[inline]
    pub fn project(&self, world: &Vector3<f32>) -> ScreenVertex {
        let clip = self.view_projection * Vector4::new(world.x, world.y, world.z, 1.0);
        self.finish(clip.x, clip.y, clip.z)
    }

    /// Project a point produced by near-plane clipping; its depth is pinned
    /// to at least the epsilon so rounding cannot push it back behind.
    fn project_clipped(&self, world: &Vector3<f32>) -> ScreenVertex {
        let clip = self.view_projection * Vector4::new(world.x, world.y, world.z, 1.0);
        self.finish(clip.x, clip.y, clip.z.max(self.near_epsilon))
    }

    #[inline]
    fn finish(&self, x: f32, y: f32, depth: f32) -> ScreenVertex {
        let divisor = if self.divide_by_abs_depth { depth.abs() } else { depth };
        let inv = if divisor != 0.0 { 1.0 / divisor } else { 0.0 };
        ScreenVertex {
            position: transform_2d(&self.viewport, &Vector2::new(x * inv, y * inv)),
            depth,
        }
    }
}

/// A vertex in viewport space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenVertex {
    /// Pixel coordinates (x right, y down)
    pub position: Vector2<f32>,
    /// Positive distance in front of the camera
    pub depth: f32,
}

/// World-space attributes a shader may read for any vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexAttributes {
    pub world_position: Vector3<f32>,
    pub world_normal: Vector3<f32>,
    pub texcoord: Vector2<f32>,
}

impl VertexAttributes {
    pub fn of(v: &Vertex) -> Self {
        Self {
            world_position: v.world_position,
            world_normal: v.world_normal,
            texcoord: v.texcoord,
        }
    }
}

/// A vertex synthesized by near-plane clipping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipVertex {
    pub attributes: VertexAttributes,
    pub screen: ScreenVertex,
}

/// Reference to a vertex of the current frame: either a scene vertex or one
/// synthesized by clipping in a given worker's batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexId {
    Scene(u32),
    Clipped { batch: u32, index: u32 },
}

/// Per-frame state of a scene triangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriangleFlags {
    /// Goes to the rasterizer as-is
    pub visible: bool,
    /// Faces away from the camera
    pub backface: bool,
    /// Replaced by synthesized triangles in the clip batch
    pub clipped: bool,
}

/// A triangle synthesized by near-plane clipping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipTriangle {
    pub vertices: [VertexId; 3],
    pub material: usize,
    pub node: usize,
}

/// Geometry synthesized by one worker during visibility classification.
#[derive(Clone, Debug, Default)]
pub struct ClipBatch {
    pub vertices: Vec<ClipVertex>,
    pub triangles: Vec<ClipTriangle>,
}

/// Read access to every vertex of the frame: scene vertices (attributes from
/// the scene, screen positions from the per-worker projection slices) and
/// clip-synthesized vertices from every worker's batch.
pub struct FrameVertices<'a> {
    scene: &'a [Vertex],
    chunk: usize,
    screen: Vec<&'a [ScreenVertex]>,
    clipped: Vec<&'a [ClipVertex]>,
}

impl<'a> FrameVertices<'a> {
    /// `screen[w]` holds the projections of scene vertices
    /// `w * chunk .. (w + 1) * chunk`.
    pub fn new(
        scene: &'a [Vertex],
        chunk: usize,
        screen: Vec<&'a [ScreenVertex]>,
        clipped: Vec<&'a [ClipVertex]>,
    ) -> Self {
        Self {
            scene,
            chunk: chunk.max(1),
            screen,
            clipped,
        }
    }

    #[inline]
    pub fn screen(&self, id: VertexId) -> ScreenVertex {
        match id {
            VertexId::Scene(i) => {
                let i = i as usize;
                self.screen[i / self.chunk][i % self.chunk]
            }
            VertexId::Clipped { batch, index } => self.clipped[batch as usize][index as usize].screen,
        }
    }

    #[inline]
    pub fn attributes(&self, id: VertexId) -> VertexAttributes {
        match id {
            VertexId::Scene(i) => VertexAttributes::of(&self.scene[i as usize]),
            VertexId::Clipped { batch, index } => {
                self.clipped[batch as usize][index as usize].attributes
            }
        }
    }

    fn clip_vertex(&self, id: VertexId) -> ClipVertex {
        ClipVertex {
            attributes: self.attributes(id),
            screen: self.screen(id),
        }
    }
}

/// Whether all three vertices lie outside the same frustum plane.
pub fn outside_frustum(s: &[ScreenVertex; 3], view: &ViewTransform) -> bool {
    s.iter().all(|v| v.position.x < 0.0)
        || s.iter().all(|v| v.position.x > view.width)
        || s.iter().all(|v| v.position.y < 0.0)
        || s.iter().all(|v| v.position.y > view.height)
        || s.iter().all(|v| v.depth < view.near_epsilon)
}

/// Front-facing test on screen positions. Returns `(visible, backface)`.
fn facing(s: &[ScreenVertex; 3], material: &Material, view: &ViewTransform) -> (bool, bool) {
    let area = signed_area(&s[0].position, &s[1].position, &s[2].position);
    let backface = !view.front_face.is_front(area);
    let visible = area != 0.0 && (!backface || material.double_sided);
    (visible, backface)
}

/// Classify one scene triangle for this frame. Triangles crossing the near
/// plane are clipped; their replacements are appended to `out` (tagged with
/// `batch`) and the original is marked not visible.
pub fn classify_triangle(
    tri: &Triangle,
    material: &Material,
    vertices: &FrameVertices<'_>,
    view: &ViewTransform,
    batch: u32,
    out: &mut ClipBatch,
) -> TriangleFlags {
    let ids = tri.vertices.map(VertexId::Scene);
    let screen = ids.map(|id| vertices.screen(id));

    if outside_frustum(&screen, view) {
        return TriangleFlags::default();
    }

    let behind = screen.iter().filter(|s| s.depth < view.near_epsilon).count();
    if behind == 0 {
        let (visible, backface) = facing(&screen, material, view);
        return TriangleFlags {
            visible,
            backface,
            clipped: false,
        };
    }

    let corners = ids.map(|id| (id, vertices.clip_vertex(id)));
    let mut emitted = false;
    for tri_out in clip_near(&corners, view, batch, out) {
        let s = tri_out.map(|(_, v)| v.screen);
        let (visible, _) = facing(&s, material, view);
        if visible && !outside_frustum(&s, view) {
            out.triangles.push(ClipTriangle {
                vertices: tri_out.map(|(id, _)| id),
                material: tri.material,
                node: tri.node,
            });
            emitted = true;
        }
    }

    TriangleFlags {
        visible: false,
        backface: !emitted,
        clipped: true,
    }
}

type Corner = (VertexId, ClipVertex);

/// Clip a triangle with one or two vertices behind the near plane.
///
/// Returns up to two triangles, winding preserved. New vertices are pushed
/// into `out.vertices`; the caller decides which triangles to keep.
pub fn clip_near(
    corners: &[Corner; 3],
    view: &ViewTransform,
    batch: u32,
    out: &mut ClipBatch,
) -> Vec<[Corner; 3]> {
    let eps = view.near_epsilon;
    let is_behind = |c: &Corner| c.1.screen.depth < eps;
    let behind = corners.iter().filter(|c| is_behind(*c)).count();

    let mut synthesize = |front: &Corner, back: &Corner| -> Corner {
        let v = intersect_near(&front.1, &back.1, view);
        out.vertices.push(v);
        let id = VertexId::Clipped {
            batch,
            index: (out.vertices.len() - 1) as u32,
        };
        (id, v)
    };

    match behind {
        1 => {
            // Rotate so the behind vertex comes first; rotation keeps winding.
            let k = corners.iter().position(is_behind).unwrap_or(0);
            let b = &corners[k];
            let f1 = &corners[(k + 1) % 3];
            let f2 = &corners[(k + 2) % 3];
            let n1 = synthesize(f1, b);
            let n2 = synthesize(f2, b);
            // Polygon n1 → f1 → f2 → n2.
            vec![[n1, *f1, *f2], [n1, *f2, n2]]
        }
        2 => {
            let k = corners.iter().position(|c| !is_behind(c)).unwrap_or(0);
            let f = &corners[k];
            let b1 = &corners[(k + 1) % 3];
            let b2 = &corners[(k + 2) % 3];
            let n1 = synthesize(f, b1);
            let n2 = synthesize(f, b2);
            vec![[*f, n1, n2]]
        }
        _ => Vec::new(),
    }
}

/// The point on the edge `front → back` at depth epsilon, with every
/// attribute interpolated linearly (linear in view space is exact here).
fn intersect_near(front: &ClipVertex, back: &ClipVertex, view: &ViewTransform) -> ClipVertex {
    let zf = front.screen.depth;
    let zb = back.screen.depth;
    let t = (zf - view.near_epsilon) / (zf - zb);
    let (a, b) = (&front.attributes, &back.attributes);

    let world_position = a.world_position.lerp(&b.world_position, t);
    let world_normal = if a.world_normal == b.world_normal {
        a.world_normal
    } else {
        let n = a.world_normal.lerp(&b.world_normal, t);
        n.try_normalize(1e-12).unwrap_or(n)
    };
    let texcoord = a.texcoord.lerp(&b.texcoord, t);

    ClipVertex {
        attributes: VertexAttributes {
            world_position,
            world_normal,
            texcoord,
        },
        screen: view.project_clipped(&world_position),
    }
}
