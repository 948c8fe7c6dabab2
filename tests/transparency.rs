//! Order-independent transparency: with enough layers the composite depends
//! only on sample depths, never on submission order.

use nalgebra::Vector3;
use scanline_rs::core::Color;
use scanline_rs::render::{RenderConfig, Renderer, ScreenRect, SolidColor, Surface, Viewport};
use scanline_rs::scene::{Material, MeshData, Node, Scene};
use scanline_rs::Camera;

const SIZE: u32 = 24;
const RED: Color = Color::rgba(255, 0, 0, 128);
const BLUE: Color = Color::rgba(0, 0, 255, 160);
const YELLOW: Color = Color::rgba(255, 255, 0, 64);

fn add_quad(scene: &mut Scene, z: f32, color: Color) {
    let mut node = Node::new("pane");
    node.translation = Vector3::new(0.0, 0.0, z);
    let node = scene.add_node(node, None);
    let material = scene.add_material(Material::new("pane", color));
    scene.add_mesh(node, material, &MeshData::quad(2.0, 2.0));
}

fn render(layers: &[(f32, Color)], k: usize, threads: usize) -> Vec<u32> {
    let mut scene = Scene::new();
    add_quad(&mut scene, -9.0, Color::WHITE);
    for &(z, color) in layers {
        add_quad(&mut scene, z, color);
    }
    let mut viewports = [Viewport::new(
        ScreenRect::new(0, 0, SIZE, SIZE),
        Camera::default(),
        k,
        SolidColor::new(),
    )];
    let mut pixels = vec![0u32; (SIZE * SIZE) as usize];
    let mut surface = Surface::new(&mut pixels, SIZE, SIZE, SIZE as usize).unwrap();
    let config = RenderConfig {
        threads: Some(threads),
        ..RenderConfig::default()
    };
    Renderer::new(config)
        .render(&mut scene, &mut viewports, &mut surface)
        .unwrap();
    pixels
}

fn center(pixels: &[u32]) -> Color {
    Color(pixels[(SIZE / 2 * SIZE + SIZE / 2) as usize])
}

#[test]
fn test_two_layers_order_independent() {
    let near_first = render(&[(-4.0, RED), (-6.0, BLUE)], 2, 1);
    let far_first = render(&[(-6.0, BLUE), (-4.0, RED)], 2, 1);
    assert_eq!(near_first, far_first);
    assert_eq!(center(&near_first), Color::WHITE.over(BLUE).over(RED));
}

#[test]
fn test_order_independent_across_threads() {
    let a = render(&[(-4.0, RED), (-6.0, BLUE), (-5.0, YELLOW)], 3, 1);
    let b = render(&[(-5.0, YELLOW), (-6.0, BLUE), (-4.0, RED)], 3, 4);
    assert_eq!(a, b);
    assert_eq!(center(&a), Color::WHITE.over(BLUE).over(YELLOW).over(RED));
}

#[test]
fn test_overflow_keeps_nearest() {
    // Three translucent samples, two slots: the farthest one is lost
    // whichever order they arrive in.
    let expected = Color::WHITE.over(YELLOW).over(RED);
    for order in [
        [(-4.0, RED), (-5.0, YELLOW), (-6.0, BLUE)],
        [(-6.0, BLUE), (-5.0, YELLOW), (-4.0, RED)],
        [(-5.0, YELLOW), (-6.0, BLUE), (-4.0, RED)],
    ] {
        assert_eq!(center(&render(&order, 2, 1)), expected);
    }
}

#[test]
fn test_opaque_in_front_hides_layers() {
    let mut scene_layers = vec![(-6.0, BLUE)];
    let behind = render(&scene_layers, 2, 1);
    assert_ne!(center(&behind), Color::WHITE);

    // An opaque quad nearer than the pane evicts it.
    scene_layers.push((-3.0, Color::rgb(10, 20, 30)));
    let hidden = render(&scene_layers, 2, 1);
    assert_eq!(center(&hidden), Color::rgb(10, 20, 30));
}
