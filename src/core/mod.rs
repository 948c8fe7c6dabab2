//! Core data types and math shared by the scene and the raster pipeline.
//!
//! - `Camera`: placement and field of view
//! - `Color`: packed ARGB pixels and the lighting tone curve
//! - `PerspectiveLerp`: perspective-correct attribute interpolation
//! - Matrix helpers for model, view, projection and viewport transforms
//!
//! Everything here is pure data and math - no threads, no buffers.

mod camera;
pub mod color;
pub mod interp;
pub mod math;

pub use camera::Camera;
pub use color::{tone_map_channel, Color};
pub use interp::{Attribute, PerspectiveLerp};
pub use math::{
    normal_matrix, projection_matrix, signed_area, transform_point, trs_matrix, viewport_matrix,
};
