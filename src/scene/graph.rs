//! The scene: node hierarchy, flattened geometry, materials, textures, lights.
//!
//! Geometry is stored flattened: one scene-wide vertex array and one triangle
//! array referencing it by index. Nodes, materials and textures are likewise
//! referenced by index, never by pointer, so the arrays can grow freely.

use super::animation::{Animation, Sample};
use super::mesh::MeshData;
use super::primitive::Primitive;
use super::texture::Texture;
use crate::core::{normal_matrix, transform_point, trs_matrix, Color};
use nalgebra::{Matrix3, Matrix4, UnitQuaternion, Vector2, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors found by [`Scene::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("triangle {triangle} references vertex {vertex}, scene has {count}")]
    VertexIndex {
        triangle: usize,
        vertex: u32,
        count: usize,
    },

    #[error("triangle {triangle} references material {material}, scene has {count}")]
    MaterialIndex {
        triangle: usize,
        material: usize,
        count: usize,
    },

    #[error("vertex {vertex} references node {node}, scene has {count}")]
    VertexNode {
        vertex: usize,
        node: usize,
        count: usize,
    },

    #[error("material {material} references texture {texture}, scene has {count}")]
    TextureIndex {
        material: usize,
        texture: usize,
        count: usize,
    },

    #[error("node {node} has inconsistent parent/child links")]
    Hierarchy { node: usize },

    #[error("node hierarchy contains a cycle through node {node}")]
    Cycle { node: usize },

    #[error("animation '{animation}' channel {channel} is invalid: {reason}")]
    Channel {
        animation: String,
        channel: usize,
        reason: String,
    },
}

/// A transform node. World matrices are derived, see
/// [`Scene::update_world_transforms`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,

    /// Parent world × local, as of the last top-down pass
    #[serde(skip, default = "Matrix4::identity")]
    pub world: Matrix4<f32>,

    /// Inverse-transpose of `world`'s 3×3 block, for normals
    #[serde(skip, default = "Matrix3::identity")]
    pub world_normal: Matrix3<f32>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            parent: None,
            children: Vec::new(),
            world: Matrix4::identity(),
            world_normal: Matrix3::identity(),
        }
    }

    pub fn local_matrix(&self) -> Matrix4<f32> {
        trs_matrix(&self.translation, &self.rotation, &self.scale)
    }
}

/// A scene vertex.
///
/// The model-space fields are authored; `world_*` are rewritten from them on
/// every transform pass and never updated incrementally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub texcoord: Vector2<f32>,
    pub node: usize,

    #[serde(skip, default = "Vector3::zeros")]
    pub world_position: Vector3<f32>,
    #[serde(skip, default = "Vector3::zeros")]
    pub world_normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, texcoord: Vector2<f32>, node: usize) -> Self {
        Self {
            position,
            normal,
            texcoord,
            node,
            world_position: position,
            world_normal: normal,
        }
    }
}

/// A flattened triangle. Per-frame visibility lives with each viewport's
/// frame state, since several viewports may render the same scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [u32; 3],
    pub material: usize,
    pub node: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Base color; alpha below 255 makes the surface translucent
    pub color: Color,
    pub texture: Option<usize>,
    /// Skip backface culling for this material
    pub double_sided: bool,
    /// Specular reflectance (0 disables highlights)
    pub specular: f32,
    /// Blinn-Phong exponent
    pub shininess: f32,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            texture: None,
            double_sided: false,
            specular: 0.0,
            shininess: 16.0,
        }
    }
}

/// Light arriving from infinitely far away along `direction`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels (normalized on use)
    pub direction: Vector3<f32>,
    /// RGB intensity
    pub intensity: Vector3<f32>,
}

impl Default for DirectionalLight {
    /// No contribution.
    fn default() -> Self {
        Self {
            direction: -Vector3::z(),
            intensity: Vector3::zeros(),
        }
    }
}

/// Omnidirectional light with inverse-square falloff.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub intensity: Vector3<f32>,
}

/// Everything a render call reads.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub nodes: Vec<Node>,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub animations: Vec<Animation>,
    pub directional_light: DirectionalLight,
    pub point_lights: Vec<PointLight>,
    /// Uniform ambient intensity
    pub ambient: f32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, linking it under `parent`. Returns its index.
    pub fn add_node(&mut self, mut node: Node, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        node.parent = parent;
        if let Some(p) = parent {
            self.nodes[p].children.push(index);
        }
        self.nodes.push(node);
        index
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    /// Append a primitive whose indices refer to vertices starting at
    /// `first_vertex` in the scene vertex array.
    pub fn add_primitive(&mut self, primitive: &Primitive, first_vertex: u32) {
        self.triangles.extend(primitive.triangles().map(|t| Triangle {
            vertices: t.map(|i| i + first_vertex),
            material: primitive.material,
            node: primitive.node,
        }));
    }

    /// Append a mesh owned by `node`, drawn with `material`. Returns the
    /// range of triangle indices it occupies.
    pub fn add_mesh(&mut self, node: usize, material: usize, mesh: &MeshData) -> std::ops::Range<usize> {
        let first_vertex = self.vertices.len() as u32;
        let first_triangle = self.triangles.len();
        for (i, &position) in mesh.positions.iter().enumerate() {
            let normal = mesh.normals.get(i).copied().unwrap_or_else(Vector3::zeros);
            let texcoord = mesh.texcoords.get(i).copied().unwrap_or_else(Vector2::zeros);
            self.vertices.push(Vertex::new(position, normal, texcoord, node));
        }
        let primitive = Primitive {
            indices: mesh.indices.clone(),
            topology: mesh.topology,
            material,
            node,
        };
        self.add_primitive(&primitive, first_vertex);
        first_triangle..self.triangles.len()
    }

    /// Apply every animation at absolute time `time` (seconds).
    pub fn animate(&mut self, time: f32) {
        for anim in &self.animations {
            let local = anim.local_time(time);
            for channel in &anim.channels {
                let Some(node) = self.nodes.get_mut(channel.node) else {
                    continue;
                };
                match channel.sample(local) {
                    Some(Sample::Translation(t)) => node.translation = t,
                    Some(Sample::Rotation(r)) => node.rotation = r,
                    Some(Sample::Scale(s)) => node.scale = s,
                    None => {}
                }
            }
        }
    }

    /// Model → world: node matrices top-down from the roots, then every
    /// vertex from its model-space original.
    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<(usize, Matrix4<f32>)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| (i, Matrix4::identity()))
            .collect();

        while let Some((index, parent_world)) = stack.pop() {
            let node = &mut self.nodes[index];
            node.world = parent_world * node.local_matrix();
            node.world_normal = normal_matrix(&node.world);
            let world = node.world;
            stack.extend(node.children.iter().map(|&c| (c, world)));
        }

        let nodes = &self.nodes;
        self.vertices.par_iter_mut().for_each(|v| {
            let node = &nodes[v.node];
            v.world_position = transform_point(&node.world, &v.position);
            let n = node.world_normal * v.normal;
            v.world_normal = n.try_normalize(1e-12).unwrap_or(n);
        });
    }

    /// Check every cross-reference. The render path assumes a scene that
    /// passes this.
    pub fn validate(&self) -> Result<(), SceneError> {
        let vcount = self.vertices.len();
        for (t, tri) in self.triangles.iter().enumerate() {
            if let Some(&v) = tri.vertices.iter().find(|&&v| v as usize >= vcount) {
                return Err(SceneError::VertexIndex {
                    triangle: t,
                    vertex: v,
                    count: vcount,
                });
            }
            if tri.material >= self.materials.len() {
                return Err(SceneError::MaterialIndex {
                    triangle: t,
                    material: tri.material,
                    count: self.materials.len(),
                });
            }
        }

        for (i, v) in self.vertices.iter().enumerate() {
            if v.node >= self.nodes.len() {
                return Err(SceneError::VertexNode {
                    vertex: i,
                    node: v.node,
                    count: self.nodes.len(),
                });
            }
        }

        for (m, mat) in self.materials.iter().enumerate() {
            if let Some(tex) = mat.texture.filter(|&t| t >= self.textures.len()) {
                return Err(SceneError::TextureIndex {
                    material: m,
                    texture: tex,
                    count: self.textures.len(),
                });
            }
        }

        self.validate_hierarchy()?;

        for anim in &self.animations {
            for (c, channel) in anim.channels.iter().enumerate() {
                let reason = if channel.node >= self.nodes.len() {
                    Some(format!("node {} out of range", channel.node))
                } else if !channel.is_sorted() {
                    Some("keyframe times are not sorted".to_string())
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Err(SceneError::Channel {
                        animation: anim.name.clone(),
                        channel: c,
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_hierarchy(&self) -> Result<(), SceneError> {
        let count = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(p) = node.parent {
                if p >= count || !self.nodes[p].children.contains(&i) {
                    return Err(SceneError::Hierarchy { node: i });
                }
            }
            for &c in &node.children {
                if c >= count || self.nodes[c].parent != Some(i) {
                    return Err(SceneError::Hierarchy { node: i });
                }
            }
        }

        // With consistent links, a cycle shows up as a parent chain longer
        // than the node count.
        for start in 0..count {
            let mut current = self.nodes[start].parent;
            let mut depth = 0;
            while let Some(p) = current {
                depth += 1;
                if depth > count {
                    return Err(SceneError::Cycle { node: start });
                }
                current = self.nodes[p].parent;
            }
        }
        Ok(())
    }
}
