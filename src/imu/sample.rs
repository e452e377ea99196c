use anyhow::{bail, Result};
use nalgebra::Vector3;

/// Gravity vector in the NWU inertial frame (m/s^2).
///
/// A static accelerometer reads `+GRAVITY` (specific force, up).
pub const GRAVITY: Vector3<f64> = Vector3::new(0.0, 0.0, 9.80655);

/// Single IMU measurement, body frame, tagged with the elapsed time since
/// the previous sample.
#[derive(Debug, Clone, Copy)]
pub struct ImuSample {
    /// Specific force (m/s^2).
    pub accel: Vector3<f64>,
    /// Angular rate (rad/s).
    pub gyro: Vector3<f64>,
    /// Seconds since the previous sample.
    pub dt: f64,
}

impl ImuSample {
    pub fn new(accel: Vector3<f64>, gyro: Vector3<f64>, dt: f64) -> Self {
        Self { accel, gyro, dt }
    }

    /// Reject malformed samples before they reach persistent filter state.
    pub fn validate(&self) -> Result<()> {
        if !self.accel.iter().all(|v| v.is_finite()) {
            bail!("non-finite accelerometer sample: {:?}", self.accel);
        }
        if !self.gyro.iter().all(|v| v.is_finite()) {
            bail!("non-finite gyroscope sample: {:?}", self.gyro);
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            bail!("invalid sample interval dt = {}", self.dt);
        }
        Ok(())
    }
}
