//! Coordinate frame conventions for inertial-aided prediction.
//!
//! Three frames matter here:
//!
//! 1. **NWU inertial frame** - where IMU integration happens
//! 2. **Camera frame** - where SLAM poses live
//! 3. **GPS/world frame** - where ground-truth poses arrive
//!
//! ## NWU Inertial Frame (IMU world)
//! ```text
//!        +Z (up)
//!         |
//!         |
//!         +------ +Y (west)
//!        /
//!       /
//!      +X (north)
//! ```
//! IMU samples must already be expressed in NWU body axes; static
//! accelerometer output is `(0, 0, +9.80655)` (specific force, up).
//!
//! ## Camera Frame (RDF - OpenCV convention)
//! ```text
//!        +Y (down)
//!         |
//!         |
//!         +------ +X (right)
//!        /
//!       /
//!      +Z (forward, optical axis)
//! ```
//!
//! ## GPS/world frame
//! Dataset-dependent. The rotation taking GPS deltas into the SLAM world
//! is part of [`crate::io::ExtrinsicCalibration`], never a constant here.
//!
//! Naming: `rotation_target_source()` maps source-frame coordinates into
//! the target frame, `p_target = R * p_source`.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion};

/// Fixed rotation from NWU body axes (X-forward, Y-left, Z-up) to camera
/// axes (X-right, Y-down, Z-forward).
///
/// Maps:
/// - NWU +X (forward) → Camera +Z (forward)
/// - NWU +Y (left)    → Camera -X (right)
/// - NWU +Z (up)      → Camera -Y (down)
#[rustfmt::skip]
pub fn rotation_cam_nwu() -> Matrix3<f64> {
    Matrix3::new(
        0.0, -1.0,  0.0,  // Cam X = -NWU Y
        0.0,  0.0, -1.0,  // Cam Y = -NWU Z
        1.0,  0.0,  0.0,  // Cam Z =  NWU X
    )
}

/// Fixed rotation from camera axes to NWU body axes.
///
/// Inverse of [`rotation_cam_nwu`].
#[rustfmt::skip]
pub fn rotation_nwu_cam() -> Matrix3<f64> {
    rotation_cam_nwu().transpose()
}

/// Unit-quaternion form of a fixed frame rotation.
pub fn quat_from_rotation(r: &Matrix3<f64>) -> UnitQuaternion<f64> {
    let mut q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r));
    q.renormalize();
    q
}
