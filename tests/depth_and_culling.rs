//! Nearer-wins depth testing and winding-consistent backface culling,
//! exercised through the full renderer.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use scanline_rs::core::{Camera, Color};
use scanline_rs::render::{FrameStats, FrontFace, RenderConfig, Renderer, ScreenRect, SolidColor, Surface, Viewport};
use scanline_rs::scene::{Material, MeshData, Node, Scene};

const SIZE: u32 = 32;
const RED: Color = Color::rgb(255, 0, 0);
const GREEN: Color = Color::rgb(0, 255, 0);

fn add_quad(scene: &mut Scene, z: f32, color: Color, flip: bool, double_sided: bool) {
    let mut node = Node::new("quad");
    node.translation = Vector3::new(0.0, 0.0, z);
    let node = scene.add_node(node, None);
    let mut material = Material::new("m", color);
    material.double_sided = double_sided;
    let material = scene.add_material(material);
    let mut mesh = MeshData::quad(2.0, 2.0);
    if flip {
        mesh.indices.reverse();
    }
    scene.add_mesh(node, material, &mesh);
}

fn render(scene: &mut Scene, config: RenderConfig) -> (Viewport, FrameStats) {
    let mut viewports = [Viewport::new(
        ScreenRect::new(0, 0, SIZE, SIZE),
        Camera::default(),
        0,
        SolidColor::new(),
    )];
    let mut pixels = vec![0u32; (SIZE * SIZE) as usize];
    let mut surface = Surface::new(&mut pixels, SIZE, SIZE, SIZE as usize).unwrap();
    let stats = Renderer::new(config).render(scene, &mut viewports, &mut surface).unwrap();
    let [vp] = viewports;
    (vp, stats)
}

fn center(vp: &Viewport) -> (Color, f32) {
    let fb = vp.framebuffer();
    (fb.pixel(SIZE / 2, SIZE / 2), fb.depth_at(SIZE / 2, SIZE / 2))
}

#[test]
fn test_nearer_wins_in_either_order() {
    for near_first in [true, false] {
        let mut scene = Scene::new();
        if near_first {
            add_quad(&mut scene, -4.0, RED, false, false);
            add_quad(&mut scene, -6.0, GREEN, false, false);
        } else {
            add_quad(&mut scene, -6.0, GREEN, false, false);
            add_quad(&mut scene, -4.0, RED, false, false);
        }
        let (vp, _) = render(&mut scene, RenderConfig::default());
        let (color, depth) = center(&vp);
        assert_eq!(color, RED);
        assert_relative_eq!(depth, 4.0, max_relative = 1e-4);
    }
}

#[test]
fn test_coplanar_keeps_first_drawn() {
    let mut scene = Scene::new();
    add_quad(&mut scene, -5.0, RED, false, false);
    add_quad(&mut scene, -5.0, GREEN, false, false);
    let (vp, _) = render(&mut scene, RenderConfig::default());
    assert_eq!(center(&vp).0, RED);
}

#[test]
fn test_reversed_winding_is_culled() {
    let mut scene = Scene::new();
    add_quad(&mut scene, -5.0, RED, true, false);
    let (vp, stats) = render(&mut scene, RenderConfig::default());
    assert_eq!(stats.culled, 2);
    assert_eq!(stats.visible, 0);
    assert_eq!(center(&vp).0, Color::TRANSPARENT);
    assert!(vp.triangle_flags().iter().all(|f| f.backface && !f.visible));
}

#[test]
fn test_double_sided_survives_reversal() {
    let mut scene = Scene::new();
    add_quad(&mut scene, -5.0, RED, true, true);
    let (vp, stats) = render(&mut scene, RenderConfig::default());
    assert_eq!(stats.culled, 0);
    assert_eq!(stats.visible, 2);
    assert_eq!(center(&vp).0, RED);
}

#[test]
fn test_clockwise_front_face_inverts_culling() {
    let config = RenderConfig {
        front_face: FrontFace::Clockwise,
        ..RenderConfig::default()
    };

    let mut ccw = Scene::new();
    add_quad(&mut ccw, -5.0, RED, false, false);
    let (_, stats) = render(&mut ccw, config.clone());
    assert_eq!(stats.culled, 2);

    let mut cw = Scene::new();
    add_quad(&mut cw, -5.0, RED, true, false);
    let (vp, stats) = render(&mut cw, config);
    assert_eq!(stats.visible, 2);
    assert_eq!(center(&vp).0, RED);
}

#[test]
fn test_behind_camera_not_drawn() {
    let mut scene = Scene::new();
    add_quad(&mut scene, 5.0, RED, true, false);
    let (vp, stats) = render(&mut scene, RenderConfig::default());
    assert_eq!(stats.visible, 0);
    assert_eq!(stats.outside, 2);
    assert!(vp.framebuffer().depth().iter().all(|d| d.is_infinite()));
}
