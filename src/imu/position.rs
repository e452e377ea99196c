//! Position estimator: double integration of linear acceleration.

use anyhow::{bail, Result};
use nalgebra::{UnitQuaternion, Vector3};

use super::sample::GRAVITY;

/// Integrates linear acceleration into velocity and position, and can be
/// force-reset from two known positions and an elapsed time.
#[derive(Debug, Clone)]
pub struct PositionEstimator {
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    gravity: Vector3<f64>,
}

impl PositionEstimator {
    pub fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            gravity: GRAVITY,
        }
    }

    /// One integration step; returns the updated position.
    pub fn update(&mut self, linear_acc: &Vector3<f64>, dt: f64) -> Vector3<f64> {
        self.velocity += linear_acc * dt;
        self.position += self.velocity * dt + 0.5 * linear_acc * dt * dt;
        self.position
    }

    /// Subtract the gravity vector, rotated into the body frame by the
    /// current attitude, from a raw accelerometer sample.
    pub fn remove_gravity(
        &self,
        acc: &Vector3<f64>,
        orientation: &UnitQuaternion<f64>,
    ) -> Vector3<f64> {
        acc - orientation.inverse() * self.gravity
    }

    /// Force position and velocity to the extrapolation between two known
    /// positions over `dt`.
    pub fn correct_pos_and_vel(
        &mut self,
        curr_pos: &Vector3<f64>,
        last_pos: &Vector3<f64>,
        dt: f64,
    ) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            bail!("invalid correction interval dt = {}", dt);
        }
        self.velocity = (curr_pos - last_pos) / dt;
        self.position = *curr_pos;
        Ok(())
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    pub fn reset(&mut self) {
        self.position = Vector3::zeros();
        self.velocity = Vector3::zeros();
    }
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_acceleration_keeps_position() {
        let mut est = PositionEstimator::new();
        for _ in 0..100 {
            est.update(&Vector3::zeros(), 0.01);
        }
        assert_relative_eq!(est.position(), Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(est.velocity(), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_constant_acceleration_accumulates_velocity() {
        let mut est = PositionEstimator::new();
        let acc = Vector3::new(1.0, 0.0, 0.0);
        let dt = 0.001;
        for _ in 0..1000 {
            est.update(&acc, dt);
        }
        // v = a * t after one second.
        assert_relative_eq!(est.velocity(), acc, epsilon = 1e-9);
        // p ~= 0.5 * a * t^2, up to integration error.
        assert_relative_eq!(est.position().x, 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_remove_gravity_static_sample_is_zero() {
        let est = PositionEstimator::new();
        let residual = est.remove_gravity(&GRAVITY, &UnitQuaternion::identity());
        assert_relative_eq!(residual, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_remove_gravity_follows_attitude() {
        let est = PositionEstimator::new();
        // Body rolled 180 degrees about X: gravity reads upside down.
        let attitude = UnitQuaternion::from_scaled_axis(Vector3::new(std::f64::consts::PI, 0.0, 0.0));
        let reading = attitude.inverse() * GRAVITY;
        let residual = est.remove_gravity(&reading, &attitude);
        assert_relative_eq!(residual, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_correct_pos_and_vel_matches_finite_difference() {
        let mut est = PositionEstimator::new();
        est.update(&Vector3::new(3.0, -1.0, 0.5), 0.1);

        let curr = Vector3::new(1.0, 2.0, 3.0);
        let last = Vector3::new(0.0, 2.0, 1.0);
        est.correct_pos_and_vel(&curr, &last, 0.5).unwrap();

        assert_relative_eq!(est.position(), curr, epsilon = 1e-12);
        assert_relative_eq!(est.velocity(), (curr - last) / 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_correct_rejects_bad_dt() {
        let mut est = PositionEstimator::new();
        let p = Vector3::zeros();
        assert!(est.correct_pos_and_vel(&p, &p, 0.0).is_err());
        assert!(est.correct_pos_and_vel(&p, &p, f64::NAN).is_err());
    }
}
