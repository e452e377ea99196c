//! SE(3) rigid transform: unit-quaternion rotation + translation.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

/// Rigid transform between two coordinate frames.
///
/// The rotation is kept as a unit quaternion and renormalized after every
/// composition so floating-point drift cannot accumulate into an invalid
/// rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Compose two transforms: `self * other`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        let mut rotation = self.rotation * other.rotation;
        rotation.renormalize();
        SE3 {
            rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Inverse transform.
    pub fn inverse(&self) -> SE3 {
        let rot_inv = self.rotation.inverse();
        SE3 {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Rotation block as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.to_rotation_matrix().into_inner()
    }

    /// Build from a homogeneous 4x4 matrix.
    pub fn from_matrix(mat: Matrix4<f64>) -> Self {
        let rot: Matrix3<f64> = mat.fixed_view::<3, 3>(0, 0).into_owned();
        let mut rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot));
        rotation.renormalize();
        let translation = mat.fixed_view::<3, 1>(0, 3).into_owned();
        Self {
            rotation,
            translation,
        }
    }

    /// Homogeneous 4x4 form.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut mat = Matrix4::identity();
        mat.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation_matrix());
        mat.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        mat
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}
