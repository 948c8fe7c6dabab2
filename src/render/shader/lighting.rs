//! Diffuse + specular lighting shaders (output: RGB intensity).
//!
//! I = ambient
//!   + directional · (max(0, n·l) + ks · max(0, n·h)^shininess)
//!   + Σ point · (max(0, n·l) + ks · max(0, n·h)^shininess) / d²

use super::{blend, Fragment, ShadeContext, Shader, TriangleSetup};
use crate::scene::{Material, Scene};
use nalgebra::Vector3;

/// Material terms the lighting model needs, cached per primitive.
#[derive(Clone, Copy, Debug, Default)]
struct SurfaceTerms {
    specular: f32,
    shininess: f32,
    double_sided: bool,
}

impl SurfaceTerms {
    fn of(material: &Material) -> Self {
        Self {
            specular: material.specular,
            shininess: material.shininess,
            double_sided: material.double_sided,
        }
    }
}

/// Evaluate the lighting model at a world point with unit normal `n`.
pub fn evaluate_lighting(
    scene: &Scene,
    material: &Material,
    eye: &Vector3<f32>,
    point: &Vector3<f32>,
    n: &Vector3<f32>,
) -> Vector3<f32> {
    light_at(scene, &SurfaceTerms::of(material), eye, point, n)
}

fn light_at(
    scene: &Scene,
    surface: &SurfaceTerms,
    eye: &Vector3<f32>,
    point: &Vector3<f32>,
    n: &Vector3<f32>,
) -> Vector3<f32> {
    let view = (eye - point).try_normalize(1e-12).unwrap_or_else(Vector3::zeros);
    let reflect = |l: &Vector3<f32>| -> f32 {
        let diffuse = n.dot(l).max(0.0);
        if surface.specular <= 0.0 || diffuse <= 0.0 {
            return diffuse;
        }
        let h = (l + view).try_normalize(1e-12).unwrap_or(*l);
        diffuse + surface.specular * n.dot(&h).max(0.0).powf(surface.shininess)
    };

    let mut intensity = Vector3::repeat(scene.ambient);

    let sun = &scene.directional_light;
    if let Some(l) = (-sun.direction).try_normalize(1e-12) {
        intensity += sun.intensity * reflect(&l);
    }

    for light in &scene.point_lights {
        let to_light = light.position - point;
        let d2 = to_light.norm_squared();
        if d2 <= 0.0 {
            continue;
        }
        let l = to_light / d2.sqrt();
        intensity += light.intensity * (reflect(&l) / d2);
    }

    intensity
}

/// Unit face normal from world positions, turned toward the eye for
/// double-sided surfaces seen from behind.
fn face_normal(
    positions: &[Vector3<f32>; 3],
    eye: &Vector3<f32>,
    double_sided: bool,
) -> Option<Vector3<f32>> {
    let n = (positions[1] - positions[0])
        .cross(&(positions[2] - positions[0]))
        .try_normalize(1e-20)?;
    let centroid = (positions[0] + positions[1] + positions[2]) / 3.0;
    if double_sided && n.dot(&(eye - centroid)) < 0.0 {
        Some(-n)
    } else {
        Some(n)
    }
}

fn corner_positions(ctx: &ShadeContext<'_>, tri: &TriangleSetup) -> [Vector3<f32>; 3] {
    tri.vertices.map(|id| ctx.vertices.attributes(id).world_position)
}

/// Lighting evaluated once per triangle from the face normal at the centroid.
#[derive(Clone, Debug, Default)]
pub struct FlatLighting {
    surface: SurfaceTerms,
    intensity: Vector3<f32>,
}

impl FlatLighting {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Shader for FlatLighting {
    type Output = Vector3<f32>;

    fn prepare_for_primitive(&mut self, ctx: &ShadeContext<'_>, material: usize) {
        self.surface = SurfaceTerms::of(&ctx.scene.materials[material]);
    }

    fn prepare_for_triangle(&mut self, ctx: &ShadeContext<'_>, tri: &TriangleSetup) {
        let positions = corner_positions(ctx, tri);
        let centroid = (positions[0] + positions[1] + positions[2]) / 3.0;
        self.intensity = match face_normal(&positions, &ctx.eye, self.surface.double_sided) {
            Some(n) => light_at(ctx.scene, &self.surface, &ctx.eye, &centroid, &n),
            None => Vector3::repeat(ctx.scene.ambient),
        };
    }

    fn shade(&mut self, _ctx: &ShadeContext<'_>, _frag: &Fragment) -> Vector3<f32> {
        self.intensity
    }
}

/// Lighting evaluated per pixel from interpolated corner normals and
/// positions.
#[derive(Clone, Debug, Default)]
pub struct SmoothLighting {
    surface: SurfaceTerms,
    positions: [Vector3<f32>; 3],
    normals: [Vector3<f32>; 3],
}

impl SmoothLighting {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Shader for SmoothLighting {
    type Output = Vector3<f32>;

    fn prepare_for_primitive(&mut self, ctx: &ShadeContext<'_>, material: usize) {
        self.surface = SurfaceTerms::of(&ctx.scene.materials[material]);
    }

    fn prepare_for_triangle(&mut self, ctx: &ShadeContext<'_>, tri: &TriangleSetup) {
        let attrs = tri.vertices.map(|id| ctx.vertices.attributes(id));
        self.positions = attrs.map(|a| a.world_position);
        self.normals = attrs.map(|a| a.world_normal);

        // Seen from behind: flip the corner normals once rather than per pixel.
        if self.surface.double_sided {
            if let Some(face) = face_normal(&self.positions, &ctx.eye, false) {
                let centroid = (self.positions[0] + self.positions[1] + self.positions[2]) / 3.0;
                if face.dot(&(ctx.eye - centroid)) < 0.0 {
                    self.normals = self.normals.map(|n| -n);
                }
            }
        }
    }

    fn shade(&mut self, ctx: &ShadeContext<'_>, frag: &Fragment) -> Vector3<f32> {
        let p = blend(&frag.bary, &self.positions);
        let n = blend(&frag.bary, &self.normals);
        match n.try_normalize(1e-12) {
            Some(n) => light_at(ctx.scene, &self.surface, &ctx.eye, &p, &n),
            None => Vector3::repeat(ctx.scene.ambient),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;
    use crate::render::vertex::{FrameVertices, ScreenVertex, VertexId};
    use crate::scene::{DirectionalLight, PointLight, Vertex};
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn lit_scene() -> Scene {
        let mut scene = Scene::new();
        scene.ambient = 0.1;
        scene.directional_light = DirectionalLight {
            direction: Vector3::new(0.0, 0.0, -1.0),
            intensity: Vector3::repeat(1.0),
        };
        scene
    }

    #[test]
    fn test_directional_head_on() {
        let scene = lit_scene();
        let mat = Material::new("m", Color::WHITE);
        let i = evaluate_lighting(&scene, &mat, &Vector3::zeros(), &Vector3::new(0.0, 0.0, -5.0), &Vector3::z());
        assert_relative_eq!(i, Vector3::repeat(1.1), epsilon = 1e-6);
    }

    #[test]
    fn test_facing_away_gets_ambient_only() {
        let scene = lit_scene();
        let mat = Material::new("m", Color::WHITE);
        let i = evaluate_lighting(&scene, &mat, &Vector3::zeros(), &Vector3::zeros(), &-Vector3::z());
        assert_relative_eq!(i, Vector3::repeat(0.1), epsilon = 1e-6);
    }

    #[test]
    fn test_point_light_inverse_square() {
        let mut scene = Scene::new();
        scene.point_lights.push(PointLight {
            position: Vector3::new(0.0, 0.0, 2.0),
            intensity: Vector3::repeat(8.0),
        });
        let mat = Material::new("m", Color::WHITE);
        let i = evaluate_lighting(&scene, &mat, &Vector3::new(0.0, 0.0, 10.0), &Vector3::zeros(), &Vector3::z());
        // 8 / 2² head-on.
        assert_relative_eq!(i.x, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_specular_adds_highlight() {
        let scene = lit_scene();
        let mut mat = Material::new("m", Color::WHITE);
        mat.specular = 0.5;
        let i = evaluate_lighting(&scene, &mat, &Vector3::new(0.0, 0.0, 5.0), &Vector3::zeros(), &Vector3::z());
        assert_relative_eq!(i.x, 0.1 + 1.0 + 0.5, epsilon = 1e-5);
    }

    /// Run the smooth shader over one triangle and shade the given
    /// barycentric points.
    fn smooth_shade(
        scene: &mut Scene,
        corners: [(Vector3<f32>, Vector3<f32>); 3],
        double_sided: bool,
        points: &[Vector3<f32>],
    ) -> Vec<Vector3<f32>> {
        let mut mat = Material::new("m", Color::WHITE);
        mat.double_sided = double_sided;
        let material = scene.add_material(mat);
        scene.vertices.clear();
        for (p, n) in corners {
            scene.vertices.push(Vertex::new(p, n, Vector2::zeros(), 0));
        }
        let scene: &Scene = scene;
        let frame = FrameVertices::new(&scene.vertices, 3, vec![], vec![]);
        let ctx = ShadeContext {
            scene,
            vertices: &frame,
            eye: Vector3::zeros(),
        };
        let tri = TriangleSetup {
            vertices: [0, 1, 2].map(VertexId::Scene),
            screen: [ScreenVertex::default(); 3],
            material,
            node: 0,
        };
        let mut shader = SmoothLighting::new();
        shader.prepare_for_primitive(&ctx, material);
        shader.prepare_for_triangle(&ctx, &tri);
        points
            .iter()
            .map(|&bary| shader.shade(&ctx, &Fragment { x: 0, y: 0, bary, depth: 5.0 }))
            .collect()
    }

    #[test]
    fn test_smooth_blends_corner_normals() {
        let mut scene = lit_scene();
        let tilted = Vector3::new(1.0, 0.0, 1.0).normalize();
        let corners = [
            (Vector3::new(-1.0, -1.0, -5.0), Vector3::z()),
            (Vector3::new(1.0, -1.0, -5.0), tilted),
            (Vector3::new(0.0, 1.0, -5.0), Vector3::z()),
        ];
        let points = [Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.25, 0.5, 0.25)];
        let shaded = smooth_shade(&mut scene, corners, false, &points);

        let mat = Material::new("m", Color::WHITE);
        let eye = Vector3::zeros();
        assert_relative_eq!(
            shaded[0],
            evaluate_lighting(&scene, &mat, &eye, &corners[0].0, &Vector3::z()),
            epsilon = 1e-6
        );

        let p = corners[0].0 * 0.25 + corners[1].0 * 0.5 + corners[2].0 * 0.25;
        let n = (Vector3::z() * 0.5 + tilted * 0.5).normalize();
        let expected = evaluate_lighting(&scene, &mat, &eye, &p, &n);
        assert_relative_eq!(shaded[1], expected, epsilon = 1e-6);
        // cos(22.5°) of the head-on light, plus ambient.
        assert_relative_eq!(shaded[1].x, 0.1 + std::f32::consts::FRAC_PI_8.cos(), epsilon = 1e-5);
        assert!(shaded[1].x < shaded[0].x);
    }

    #[test]
    fn test_smooth_flips_normals_seen_from_behind() {
        // Clockwise from the eye: the face and its corner normals point away.
        let corners = [
            (Vector3::new(0.0, 0.0, -5.0), -Vector3::z()),
            (Vector3::new(0.0, 1.0, -5.0), -Vector3::z()),
            (Vector3::new(1.0, 0.0, -5.0), -Vector3::z()),
        ];
        let centroid = [Vector3::repeat(1.0 / 3.0)];

        let one_sided = smooth_shade(&mut lit_scene(), corners, false, &centroid);
        assert_relative_eq!(one_sided[0], Vector3::repeat(0.1), epsilon = 1e-6);

        let two_sided = smooth_shade(&mut lit_scene(), corners, true, &centroid);
        assert_relative_eq!(two_sided[0], Vector3::repeat(1.1), epsilon = 1e-5);
    }

    #[test]
    fn test_face_normal_flips_for_double_sided() {
        let p = [Vector3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 1.0, -5.0), Vector3::new(1.0, 0.0, -5.0)];
        let eye = Vector3::zeros();
        let n = face_normal(&p, &eye, false).unwrap();
        assert_relative_eq!(n, -Vector3::z(), epsilon = 1e-6);
        let n = face_normal(&p, &eye, true).unwrap();
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-6);
    }
}
