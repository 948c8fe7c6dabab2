//! Rasterization pipeline (CPU, multi-threaded).
//!
//! - `vertex`: world → viewport projection, frustum test, near clipping
//! - `raster`: scanline walk of visible triangles
//! - `shader`: pluggable pixel shading
//! - `framebuffer` / `post`: depth, transparency layers, compositing
//! - `driver`: the barrier-synchronized worker pool behind [`Renderer::render`]

pub mod config;
mod driver;
pub mod framebuffer;
pub mod post;
pub mod raster;
pub mod shader;
mod surface;
pub mod vertex;
mod viewport;

pub use config::{FrontFace, RenderConfig};
pub use driver::{FrameStats, RenderError, Renderer};
pub use framebuffer::{FrameBand, Framebuffer};
pub use post::PostEffect;
pub use shader::{FlatLighting, Lit, PixelShader, Shader, SmoothLighting, SolidColor, Textured};
pub use surface::{surface_to_image, Surface};
pub use viewport::{ScreenRect, Viewport};
