//! Scene model: nodes, flattened geometry, materials, textures, lights and
//! animation.
//!
//! The scene is written once per frame by the model → world pass and is
//! read-only while viewports render it.

pub mod animation;
mod graph;
pub mod mesh;
pub mod primitive;
pub mod texture;

pub use animation::{Animation, Channel, ChannelTarget, Keyframe};
pub use graph::{
    DirectionalLight, Material, Node, PointLight, Scene, SceneError, Triangle, Vertex,
};
pub use mesh::MeshData;
pub use primitive::{Primitive, Topology};
pub use texture::{Filter, MipLevel, Texture, TextureError};
