//! Madgwick-style attitude filter.
//!
//! Fuses gyroscope and accelerometer samples into a body-to-NWU attitude
//! quaternion: the gyroscope is integrated through the quaternion
//! derivative and a gradient-descent step with gain `beta` pulls the
//! estimate toward the measured gravity direction. The accelerometer
//! correction is skipped when the measured norm is too small to define a
//! direction.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::geometry::SE3;

/// Accelerometer norm below which the gravity correction is skipped.
const MIN_ACC_NORM: f64 = 1e-9;

/// Gradient norm below which the correction step is skipped.
const MIN_GRAD_NORM: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct AttitudeFilter {
    /// Body-to-NWU attitude.
    orientation: UnitQuaternion<f64>,
    /// Gradient step gain (beta).
    gain: f64,
}

impl AttitudeFilter {
    pub fn new(gain: f64) -> Self {
        Self {
            orientation: UnitQuaternion::identity(),
            gain,
        }
    }

    /// One filter step with a body-frame sample.
    pub fn update(&mut self, acc: &Vector3<f64>, gyro: &Vector3<f64>, dt: f64) {
        let q = self.orientation.into_inner();

        // Rate of change from the gyroscope: q_dot = 0.5 * q ⊗ (0, ω).
        let omega = Quaternion::new(0.0, gyro.x, gyro.y, gyro.z);
        let mut q_dot = q * omega * 0.5;

        // Gradient-descent correction toward the measured gravity
        // direction (reference +Z in NWU).
        if let Some(acc_n) = acc.try_normalize(MIN_ACC_NORM) {
            let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

            let f1 = 2.0 * (q1 * q3 - q0 * q2) - acc_n.x;
            let f2 = 2.0 * (q0 * q1 + q2 * q3) - acc_n.y;
            let f3 = 2.0 * (0.5 - q1 * q1 - q2 * q2) - acc_n.z;

            let grad = Quaternion::new(
                -2.0 * q2 * f1 + 2.0 * q1 * f2,
                2.0 * q3 * f1 + 2.0 * q0 * f2 - 4.0 * q1 * f3,
                -2.0 * q0 * f1 + 2.0 * q3 * f2 - 4.0 * q2 * f3,
                2.0 * q1 * f1 + 2.0 * q2 * f2,
            );
            let norm = grad.norm();
            if norm > MIN_GRAD_NORM {
                q_dot -= grad * (self.gain / norm);
            }
        }

        self.orientation = UnitQuaternion::new_normalize(q + q_dot * dt);
    }

    /// Body-to-NWU attitude.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// World-to-camera rotation consistent with `Frame::pose()`.
    pub fn local_orientation(&self) -> UnitQuaternion<f64> {
        self.orientation.inverse()
    }

    /// Force-reset the internal reference so that `local_orientation()`
    /// matches the given pose's rotation.
    pub fn set_orientation_from_frame(&mut self, pose: &SE3) {
        self.orientation = pose.rotation.inverse();
    }

    pub fn reset(&mut self) {
        self.orientation = UnitQuaternion::identity();
    }
}
