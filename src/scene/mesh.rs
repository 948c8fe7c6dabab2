//! Model-space mesh data and a few built-in shapes.

use super::primitive::Topology;
use nalgebra::{Vector2, Vector3};

/// Model-space vertex attributes plus an index buffer.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub texcoords: Vec<Vector2<f32>>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshData {
    /// Axis-aligned cube of edge `size` centered on the origin.
    ///
    /// Each face has its own four vertices (flat normals, full 0..1 texcoords)
    /// and winds counter-clockwise seen from outside.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        // (normal, u axis, v axis); u × v = normal keeps the faces CCW.
        let faces: [(Vector3<f32>, Vector3<f32>, Vector3<f32>); 6] = [
            (Vector3::x(), -Vector3::z(), Vector3::y()),
            (-Vector3::x(), Vector3::z(), Vector3::y()),
            (Vector3::y(), Vector3::x(), -Vector3::z()),
            (-Vector3::y(), Vector3::x(), Vector3::z()),
            (Vector3::z(), Vector3::x(), Vector3::y()),
            (-Vector3::z(), -Vector3::x(), Vector3::y()),
        ];

        let mut mesh = MeshData::default();
        for (n, u, v) in faces {
            let base = mesh.positions.len() as u32;
            let center = n * h;
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
            for (su, sv) in corners {
                mesh.positions.push(center + u * (su * h) + v * (sv * h));
                mesh.normals.push(n);
                mesh.texcoords
                    .push(Vector2::new((su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// A `width × height` rectangle in the XY plane facing +z, centered on the
    /// origin, as a two-triangle fan.
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        MeshData {
            positions: vec![
                Vector3::new(-hw, -hh, 0.0),
                Vector3::new(hw, -hh, 0.0),
                Vector3::new(hw, hh, 0.0),
                Vector3::new(-hw, hh, 0.0),
            ],
            normals: vec![Vector3::z(); 4],
            texcoords: vec![
                Vector2::new(0.0, 1.0),
                Vector2::new(1.0, 1.0),
                Vector2::new(1.0, 0.0),
                Vector2::new(0.0, 0.0),
            ],
            indices: vec![0, 1, 2, 3],
            topology: Topology::Fan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_faces_wind_outward() {
        let cube = MeshData::cube(2.0);
        assert_eq!(cube.positions.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| cube.positions[i as usize]);
            let n = (b - a).cross(&(c - a)).normalize();
            assert_relative_eq!(n, cube.normals[tri[0] as usize], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cube_extent() {
        let cube = MeshData::cube(1.0);
        for p in &cube.positions {
            assert_relative_eq!(p.amax(), 0.5, epsilon = 1e-6);
        }
    }
}
