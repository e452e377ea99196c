//! Refined IMU-only predictor with an externally supplied scale.
//!
//! Unlike [`super::ImuModel`], which learns a drift ratio from ground
//! truth, this variant takes scale and gravity as configuration and keeps
//! the pose in three frames (camera, world, IMU) reconstructed together
//! from one internal state, so the three never drift apart.

use anyhow::{bail, Context, Result};
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::frame::Frame;
use crate::geometry::{frames, SE3};
use crate::imu::{AttitudeFilter, ImuSample, LowPassFilter, GRAVITY};

use super::{PredictionContext, PredictionModel};

/// Scale below this cannot safely divide the acceleration.
const MIN_SCALE: f64 = 1e-10;

pub struct RefinedImuModel {
    att_estimator: AttitudeFilter,
    acc_lpf: LowPassFilter<3>,
    remove_gravity: bool,
    gravity: Vector3<f64>,
    /// IMU body axes to camera axes.
    r_imu_cam: UnitQuaternion<f64>,
    scale: f64,
    position: Vector3<f64>,
    velocity: Vector3<f64>,
    last_velocity: Vector3<f64>,

    pose_cam: SE3,
    pose_world: SE3,
    pose_imu: SE3,
}

impl RefinedImuModel {
    pub fn new(acc_lpf_gain: f64, remove_gravity: bool, madgwick_gain: f64) -> Self {
        let mut model = Self {
            att_estimator: AttitudeFilter::new(madgwick_gain),
            acc_lpf: LowPassFilter::new(acc_lpf_gain),
            remove_gravity,
            gravity: GRAVITY,
            r_imu_cam: frames::quat_from_rotation(&frames::rotation_cam_nwu()),
            scale: 1.0,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            last_velocity: Vector3::zeros(),
            pose_cam: SE3::identity(),
            pose_world: SE3::identity(),
            pose_imu: SE3::identity(),
        };
        model.update_poses();
        model
    }

    pub fn set_rotation_imu_cam(&mut self, rotation: Matrix3<f64>) {
        self.r_imu_cam = frames::quat_from_rotation(&rotation);
        self.update_poses();
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    /// Scale dividing the acceleration before integration; must be a
    /// strictly positive finite number.
    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        if !scale.is_finite() || scale < MIN_SCALE {
            bail!("scale must be strictly positive and finite, got {}", scale);
        }
        self.scale = scale;
        Ok(())
    }

    pub fn set_remove_gravity_flag(&mut self, flag: bool) {
        self.remove_gravity = flag;
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Velocity cached by the last correction.
    pub fn last_velocity(&self) -> Vector3<f64> {
        self.last_velocity
    }

    /// World-to-camera pose, the convention `predict` returns.
    pub fn pose_cam(&self) -> &SE3 {
        &self.pose_cam
    }

    /// Camera pose in the SLAM world (inverse of the camera pose).
    pub fn pose_world(&self) -> &SE3 {
        &self.pose_world
    }

    /// Body pose in the NWU inertial frame.
    pub fn pose_imu(&self) -> &SE3 {
        &self.pose_imu
    }

    /// One prediction step; the sample must be in NWU body axes.
    pub fn predict(&mut self, imu: &ImuSample) -> Result<SE3> {
        imu.validate()?;

        self.att_estimator.update(&imu.accel, &imu.gyro, imu.dt);

        let mut acc = if self.remove_gravity {
            self.remove_gravity_from(&imu.accel, &self.att_estimator.orientation())
        } else {
            imu.accel
        };
        acc = self.acc_lpf.apply(&acc);
        acc /= self.scale;

        self.velocity += acc * imu.dt;
        self.position += self.velocity * imu.dt + 0.5 * acc * imu.dt * imu.dt;

        self.update_poses();
        Ok(self.pose_cam.clone())
    }

    /// Re-anchor attitude, position and velocity from an authoritative
    /// frame pair. The scale is configuration and is not re-estimated.
    pub fn correct_pose(&mut self, curr_frame: &Frame, last_frame: &Frame, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            bail!("invalid correction interval dt = {}", dt);
        }

        self.att_estimator
            .set_orientation_from_frame(curr_frame.pose());

        let curr_pos = curr_frame.camera_center();
        let last_pos = last_frame.camera_center();
        self.velocity = (curr_pos - last_pos) / dt;
        self.position = curr_pos;
        self.last_velocity = self.velocity;

        self.update_poses();
        Ok(())
    }

    fn remove_gravity_from(
        &self,
        acc: &Vector3<f64>,
        attitude: &UnitQuaternion<f64>,
    ) -> Vector3<f64> {
        acc - attitude.inverse() * self.gravity
    }

    /// Rebuild the camera, world and IMU poses from the current
    /// orientation, position and extrinsics, keeping the three consistent.
    fn update_poses(&mut self) {
        self.pose_imu = SE3::new(self.att_estimator.orientation(), self.position);
        let extrinsic = SE3::new(self.r_imu_cam, Vector3::zeros());
        self.pose_cam = extrinsic.compose(&self.pose_imu.inverse());
        self.pose_world = self.pose_cam.inverse();
    }
}

impl PredictionModel for RefinedImuModel {
    fn predict(&mut self, ctx: &PredictionContext<'_>) -> Result<SE3> {
        let imu = ctx.imu.context("RefinedImuModel requires an IMU sample")?;
        RefinedImuModel::predict(self, imu)
    }

    fn correct_pose(&mut self, curr: &Frame, last: &Frame, dt: f64) -> Result<()> {
        RefinedImuModel::correct_pose(self, curr, last, dt)
    }
}
