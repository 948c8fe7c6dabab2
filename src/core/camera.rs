//! Camera model (position, orientation and vertical field of view).
//!
//! The camera looks down its local −z axis with +y up. The projection itself
//! depends on the viewport aspect ratio, so it is built per viewport from
//! [`Camera::fov_y`] (see `core::math::projection_matrix`).

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A perspective camera placed in world space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Camera {
    /// Camera center in world coordinates
    pub position: Vector3<f32>,

    /// Rotation from camera to world coordinates
    pub orientation: UnitQuaternion<f32>,

    /// Vertical field of view (radians)
    pub fov_y: f32,
}

impl Camera {
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>, fov_y: f32) -> Self {
        Self {
            position,
            orientation,
            fov_y,
        }
    }

    /// Camera at `eye` looking toward `target`.
    ///
    /// `up` must not be parallel to the viewing direction.
    pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>, fov_y: f32) -> Self {
        // face_towards points +z at the target; the camera looks down −z.
        let back = eye - target;
        let orientation = UnitQuaternion::face_towards(&back, &up);
        Self::new(eye, orientation, fov_y)
    }

    /// World → view transform.
    ///
    /// p_view = Rᵀ · (p_world − C)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let inv_rot = self.orientation.inverse();
        inv_rot.to_homogeneous() * Matrix4::new_translation(&-self.position)
    }

    /// Transform a point from world coordinates to view coordinates.
    pub fn world_to_view(&self, point_world: &Vector3<f32>) -> Vector3<f32> {
        self.orientation.inverse_transform_vector(&(point_world - self.position))
    }

    /// Forward (viewing) direction in world coordinates.
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation * -Vector3::<f32>::z()
    }
}

impl Default for Camera {
    /// At the origin, looking down −z with a 60° vertical field of view.
    fn default() -> Self {
        Self::new(
            Vector3::zeros(),
            UnitQuaternion::identity(),
            60f32.to_radians(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::transform_point;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_camera_view() {
        let cam = Camera::default();
        let p = Vector3::new(1.0, 2.0, -5.0);
        assert_relative_eq!(transform_point(&cam.view_matrix(), &p), p, epsilon = 1e-6);
        assert_relative_eq!(cam.forward(), Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_points_forward_at_target() {
        let cam = Camera::look_at(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::zeros(),
            Vector3::y(),
            1.0,
        );
        assert_relative_eq!(cam.forward(), Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-6);

        // The target lands on the view axis, 3 units in front.
        let v = cam.world_to_view(&Vector3::zeros());
        assert_relative_eq!(v, Vector3::new(0.0, 0.0, -3.0), epsilon = 1e-5);
    }

    #[test]
    fn test_view_matrix_matches_world_to_view() {
        let cam = Camera::look_at(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.5, -1.0),
            Vector3::y(),
            1.0,
        );
        let p = Vector3::new(-0.3, 0.7, 2.0);
        assert_relative_eq!(
            transform_point(&cam.view_matrix(), &p),
            cam.world_to_view(&p),
            epsilon = 1e-5
        );
    }
}
