//! Index-buffer primitives and their flattening into triangle lists.

use serde::{Deserialize, Serialize};

/// How an index buffer is read as triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Every three indices form a triangle.
    #[default]
    List,
    /// Each index after the second forms a triangle with the two before it;
    /// odd triangles swap their first two vertices to keep a consistent
    /// winding.
    Strip,
    /// Each index after the second forms a triangle with the first index and
    /// the previous one.
    Fan,
}

/// A run of geometry sharing one material and one owning node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Primitive {
    /// Indices into the owning mesh's vertex list (not the scene's).
    pub indices: Vec<u32>,
    pub topology: Topology,
    pub material: usize,
    pub node: usize,
}

impl Primitive {
    /// Triangles of this primitive, with mesh-local vertex indices.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let idx = &self.indices;
        let count = match self.topology {
            Topology::List => idx.len() / 3,
            Topology::Strip | Topology::Fan => idx.len().saturating_sub(2),
        };
        (0..count).map(move |i| match self.topology {
            Topology::List => [idx[3 * i], idx[3 * i + 1], idx[3 * i + 2]],
            Topology::Strip if i % 2 == 1 => [idx[i + 1], idx[i], idx[i + 2]],
            Topology::Strip => [idx[i], idx[i + 1], idx[i + 2]],
            Topology::Fan => [idx[0], idx[i + 1], idx[i + 2]],
        })
    }
}
