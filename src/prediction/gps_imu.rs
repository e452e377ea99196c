//! GPS + IMU fusion model.
//!
//! The IMU attitude filter is the only orientation source; the GPS stream
//! contributes translation deltas, scaled by a caller-supplied factor and
//! applied to the previous frame's camera center.

use anyhow::{bail, Context, Result};

use crate::frame::Frame;
use crate::geometry::SE3;
use crate::imu::{AttitudeFilter, ImuSample};

use super::{PredictionContext, PredictionModel};

pub struct GpsImuModel {
    att_estimator: AttitudeFilter,
    pose: SE3,
    world_pose: SE3,
}

impl GpsImuModel {
    pub fn new(madgwick_gain: f64) -> Self {
        Self {
            att_estimator: AttitudeFilter::new(madgwick_gain),
            pose: SE3::identity(),
            world_pose: SE3::identity(),
        }
    }

    /// Fuse one IMU sample with the GPS delta between two frames.
    pub fn estimate_pose(
        &mut self,
        imu: &ImuSample,
        curr_frame: &Frame,
        last_frame: &Frame,
        scale: f64,
    ) -> Result<SE3> {
        imu.validate()?;
        if !scale.is_finite() || scale <= 0.0 {
            bail!("scale must be strictly positive and finite, got {}", scale);
        }

        self.att_estimator.update(&imu.accel, &imu.gyro, imu.dt);
        let rotation = self.att_estimator.local_orientation();

        let diff_t_gps = curr_frame.gps_translation() - last_frame.gps_translation();
        let center = last_frame.camera_center() + scale * diff_t_gps;

        self.pose = SE3::new(rotation, -(rotation * center));
        self.world_pose = self.pose.inverse();
        Ok(self.pose.clone())
    }

    /// World-to-camera pose from the last estimate.
    pub fn pose(&self) -> &SE3 {
        &self.pose
    }

    /// Camera pose in the SLAM world from the last estimate.
    pub fn world_pose(&self) -> &SE3 {
        &self.world_pose
    }
}

impl PredictionModel for GpsImuModel {
    fn predict(&mut self, ctx: &PredictionContext<'_>) -> Result<SE3> {
        let imu = ctx.imu.context("GpsImuModel requires an IMU sample")?;
        let curr = ctx
            .curr_frame
            .context("GpsImuModel requires the current frame")?;
        let last = ctx
            .last_frame
            .context("GpsImuModel requires the last frame")?;
        let scale = ctx.scale.context("GpsImuModel requires a scale factor")?;
        self.estimate_pose(imu, curr, last, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, UnitQuaternion, Vector3};

    fn frame_at(center: Vector3<f64>, gps_t: Vector3<f64>) -> Frame {
        Frame::new(
            SE3::new(UnitQuaternion::identity(), -center),
            SE3::new(UnitQuaternion::identity(), gps_t),
        )
    }

    #[test]
    fn test_gps_delta_advances_camera_center() {
        let mut model = GpsImuModel::new(0.01);
        let imu = ImuSample::new(Vector3::zeros(), Vector3::zeros(), 0.1);

        let last = frame_at(Vector3::zeros(), Vector3::zeros());
        let curr = frame_at(Vector3::zeros(), Vector3::new(2.0, 0.0, 0.0));

        model.estimate_pose(&imu, &curr, &last, 1.0).unwrap();

        // Attitude stays identity, so the camera center is readable from
        // the world pose translation.
        assert_relative_eq!(
            model.world_pose().translation,
            Vector3::new(2.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_scale_multiplies_gps_delta() {
        let mut model = GpsImuModel::new(0.01);
        let imu = ImuSample::new(Vector3::zeros(), Vector3::zeros(), 0.1);

        let last = frame_at(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros());
        let curr = frame_at(Vector3::zeros(), Vector3::new(0.0, 3.0, 0.0));

        model.estimate_pose(&imu, &curr, &last, 0.5).unwrap();

        assert_relative_eq!(
            model.world_pose().translation,
            Vector3::new(1.0, 1.5, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_world_pose_is_inverse_of_camera_pose() {
        let mut model = GpsImuModel::new(0.05);
        let imu = ImuSample::new(
            Vector3::new(0.2, 0.1, 9.8),
            Vector3::new(0.05, 0.0, -0.02),
            0.05,
        );
        let last = frame_at(Vector3::new(0.5, 0.5, 0.0), Vector3::zeros());
        let curr = frame_at(Vector3::zeros(), Vector3::new(0.1, 0.2, 0.3));

        model.estimate_pose(&imu, &curr, &last, 2.0).unwrap();

        let recomposed = model.pose().compose(model.world_pose());
        assert_relative_eq!(
            recomposed.rotation_matrix(),
            Matrix3::identity(),
            epsilon = 1e-10
        );
        assert_relative_eq!(recomposed.translation, Vector3::zeros(), epsilon = 1e-10);
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        let mut model = GpsImuModel::new(0.01);
        let imu = ImuSample::new(Vector3::zeros(), Vector3::zeros(), 0.1);
        let f = frame_at(Vector3::zeros(), Vector3::zeros());
        assert!(model.estimate_pose(&imu, &f, &f, 0.0).is_err());
        assert!(model.estimate_pose(&imu, &f, &f, -1.0).is_err());
    }
}
