//! Idealized pure-IMU predictor for simulated sensors.

use anyhow::{Context, Result};

use crate::frame::Frame;
use crate::geometry::SE3;
use crate::imu::{AttitudeFilter, ImuSample, PositionEstimator};

use super::{PredictionContext, PredictionModel};

/// Minimal dead-reckoning predictor: one attitude update plus one raw
/// integration step per sample, no gravity removal and no drift
/// correction. Meant for idealized or simulated sensor streams.
#[derive(Debug, Clone)]
pub struct SyntheticModel {
    att_estimator: AttitudeFilter,
    pos_estimator: PositionEstimator,
}

impl SyntheticModel {
    pub fn new(madgwick_gain: f64) -> Self {
        Self {
            att_estimator: AttitudeFilter::new(madgwick_gain),
            pos_estimator: PositionEstimator::new(),
        }
    }

    pub fn predict(&mut self, imu: &ImuSample, last_frame: &Frame) -> Result<SE3> {
        imu.validate()?;

        self.att_estimator.set_orientation_from_frame(last_frame.pose());
        self.att_estimator.update(&imu.accel, &imu.gyro, imu.dt);

        let position = self.pos_estimator.update(&imu.accel, imu.dt);

        Ok(SE3::new(self.att_estimator.local_orientation(), position))
    }
}

impl PredictionModel for SyntheticModel {
    fn predict(&mut self, ctx: &PredictionContext<'_>) -> Result<SE3> {
        let imu = ctx.imu.context("SyntheticModel requires an IMU sample")?;
        let last = ctx
            .last_frame
            .context("SyntheticModel requires the last frame")?;
        SyntheticModel::predict(self, imu, last)
    }
}
