//! # scanline-rs: a multi-threaded CPU scanline rasterizer
//!
//! Renders a scene graph of posed meshes, materials, lights and cameras into
//! a pixel buffer: per-pixel depth testing, perspective-correct texturing and
//! lighting, bounded order-independent transparency, all split across worker
//! threads.
//!
//! ## Architecture
//!
//! - `core`: colors, math helpers, camera, perspective interpolation
//! - `scene`: nodes, flattened geometry, materials, textures, animation
//! - `render`: vertex pipeline, rasterizer, shaders, framebuffer, driver
//! - `logging`: logger setup for binaries
//!
//! ## Example
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use scanline_rs::core::{Camera, Color};
//! use scanline_rs::render::{FlatLighting, Lit, Renderer, ScreenRect, SolidColor, Surface, Viewport};
//! use scanline_rs::scene::{Material, MeshData, Node, Scene};
//!
//! let mut scene = Scene::new();
//! let node = scene.add_node(Node::new("cube"), None);
//! let white = scene.add_material(Material::new("white", Color::WHITE));
//! scene.add_mesh(node, white, &MeshData::cube(1.0));
//!
//! let camera = Camera::look_at(Vector3::new(2.0, 2.0, 4.0), Vector3::zeros(), Vector3::y(), 1.0);
//! let shader = Lit::new(FlatLighting::new(), SolidColor::new());
//! let mut viewports = [Viewport::new(ScreenRect::new(0, 0, 320, 240), camera, 2, shader)];
//!
//! let mut pixels = vec![0u32; 320 * 240];
//! let mut surface = Surface::new(&mut pixels, 320, 240, 320)?;
//! let stats = Renderer::default().render(&mut scene, &mut viewports, &mut surface)?;
//! println!("{stats:?}");
//! # Ok::<(), scanline_rs::render::RenderError>(())
//! ```

// Core data structures and math
pub mod core;

// Scene model
pub mod scene;

// Rasterization pipeline
pub mod render;

pub mod logging;

pub use crate::core::{Camera, Color};
pub use render::{FrameStats, RenderConfig, RenderError, Renderer, Surface, Viewport};
pub use scene::{Scene, SceneError, TextureError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
