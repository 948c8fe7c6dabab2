//! Matrix helpers shared by the scene graph and the vertex pipeline.

use nalgebra::{Matrix3, Matrix4, UnitQuaternion, Vector2, Vector3, Vector4};

/// Compose a local transform `T · R · S`.
pub fn trs_matrix(
    translation: &Vector3<f32>,
    rotation: &UnitQuaternion<f32>,
    scale: &Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::new_translation(translation)
        * rotation.to_homogeneous()
        * Matrix4::new_nonuniform_scaling(scale)
}

/// Normal matrix: inverse-transpose of the upper 3×3 block.
///
/// Falls back to the plain 3×3 block when the transform is singular (a zero
/// scale); normals of collapsed geometry are never visible anyway.
pub fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let m: Matrix3<f32> = world.fixed_view::<3, 3>(0, 0).into_owned();
    m.try_inverse().map(|inv| inv.transpose()).unwrap_or(m)
}

/// Transform a point by an affine 4×4 matrix.
#[inline]
pub fn transform_point(m: &Matrix4<f32>, p: &Vector3<f32>) -> Vector3<f32> {
    let h = m * Vector4::new(p.x, p.y, p.z, 1.0);
    Vector3::new(h.x, h.y, h.z)
}

/// Perspective projection for a camera looking down −z.
///
/// Maps view-space `(x, y, z)` to `(x·f/aspect, y·f, −z)`: the third output
/// component is the positive distance in front of the camera, which the
/// pipeline keeps as its comparison depth. No far plane.
///
/// f = 1 / tan(fov_y / 2)
pub fn projection_matrix(fov_y: f32, aspect: f32) -> Matrix4<f32> {
    let f = 1.0 / (fov_y * 0.5).tan();
    #[rustfmt::skip]
    let m = Matrix4::new(
        f / aspect, 0.0, 0.0,  0.0,
        0.0,        f,   0.0,  0.0,
        0.0,        0.0, -1.0, 0.0,
        0.0,        0.0, 0.0,  1.0,
    );
    m
}

/// Map normalized device coordinates (x right, y up, both in [−1, 1]) to
/// pixel coordinates of a `width × height` viewport (x right, y down).
pub fn viewport_matrix(width: f32, height: f32) -> Matrix3<f32> {
    let hw = width * 0.5;
    let hh = height * 0.5;
    #[rustfmt::skip]
    let m = Matrix3::new(
        hw,  0.0, hw,
        0.0, -hh, hh,
        0.0, 0.0, 1.0,
    );
    m
}

/// Apply a 2D affine matrix to a point.
#[inline]
pub fn transform_2d(m: &Matrix3<f32>, p: &Vector2<f32>) -> Vector2<f32> {
    let h = m * Vector3::new(p.x, p.y, 1.0);
    Vector2::new(h.x, h.y)
}

/// Twice the signed area of a screen-space triangle.
///
/// With y pointing down, a triangle that winds counter-clockwise in a
/// right-handed world appears clockwise on screen and yields a negative value.
#[inline]
pub fn signed_area(a: &Vector2<f32>, b: &Vector2<f32>, c: &Vector2<f32>) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}
