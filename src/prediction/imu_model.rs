//! IMU dead-reckoning model with periodic drift-scale correction.
//!
//! `predict` free-runs open-loop inertial integration; `correct_pose`
//! periodically snaps attitude, position and velocity back to the
//! vision-based pose and re-estimates how much the open-loop integration
//! over- or under-shoots. That scalar ratio damps the acceleration fed to
//! the next integration step, which is what keeps double-integrated
//! accelerometer noise bounded.

use anyhow::{bail, Context, Result};
use nalgebra::{Matrix3, SVector, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::frame::Frame;
use crate::geometry::SE3;
use crate::imu::{AttitudeFilter, ImuSample, LowPassFilter, PositionEstimator};
use crate::io::ExtrinsicCalibration;

use super::{PredictionContext, PredictionModel};

/// Ratio below this is treated as inactive; never divide by it.
const RATIO_FLOOR: f64 = 1e-10;

/// Observed-acceleration norm below which the ratio update is skipped.
const ACC_NORM_FLOOR: f64 = 1e-12;

pub struct ImuModel {
    att_estimator: AttitudeFilter,
    pos_estimator: PositionEstimator,
    /// IMU body axes to the SLAM world frame.
    r_imu_world: Matrix3<f64>,
    acc_lpf: LowPassFilter<3>,
    ratio_lpf: LowPassFilter<1>,
    /// Drift-scale ratio dividing the acceleration before integration.
    ratio: f64,
    /// Predict calls between corrections.
    correction_period: usize,
    iteration: usize,
    last_velocity: Vector3<f64>,
    /// Gravity-removed, world-frame, smoothed acceleration from the last
    /// predict; numerator of the ratio re-estimation.
    linear_acc: Vector3<f64>,
    remove_gravity: bool,

    // Introspection caches from the last predict.
    position: Vector3<f64>,
    position_cam: Vector3<f64>,
    attitude: UnitQuaternion<f64>,
}

impl ImuModel {
    pub fn new(madgwick_gain: f64, calib: &ExtrinsicCalibration) -> Self {
        Self {
            att_estimator: AttitudeFilter::new(madgwick_gain),
            pos_estimator: PositionEstimator::new(),
            r_imu_world: calib.r_imu_world,
            acc_lpf: LowPassFilter::new(0.2),
            ratio_lpf: LowPassFilter::new(0.1),
            ratio: 1.0,
            correction_period: 1,
            iteration: 0,
            last_velocity: Vector3::zeros(),
            linear_acc: Vector3::zeros(),
            remove_gravity: false,
            position: Vector3::zeros(),
            position_cam: Vector3::zeros(),
            attitude: UnitQuaternion::identity(),
        }
    }

    /// Run the correction only every `n`-th `correct_pose` call.
    pub fn with_correction_period(mut self, n: usize) -> Self {
        self.correction_period = n.max(1);
        self
    }

    pub fn set_remove_gravity(&mut self, flag: bool) {
        self.remove_gravity = flag;
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio;
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// World-frame position from the last predict.
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Camera-frame position from the last predict.
    pub fn position_cam(&self) -> Vector3<f64> {
        self.position_cam
    }

    /// Camera attitude from the last predict.
    pub fn attitude(&self) -> UnitQuaternion<f64> {
        self.attitude
    }

    /// One open-loop prediction step.
    pub fn predict(&mut self, imu: &ImuSample) -> Result<SE3> {
        imu.validate()?;

        self.att_estimator.update(&imu.accel, &imu.gyro, imu.dt);
        let att_cam = self.att_estimator.local_orientation();

        let mut linear_acc = if self.remove_gravity {
            let residual = self
                .pos_estimator
                .remove_gravity(&imu.accel, &self.att_estimator.orientation());
            let world = self.r_imu_world * residual;
            let smoothed = self.acc_lpf.apply(&world);
            self.linear_acc = smoothed;
            debug!(
                norm = smoothed.norm(),
                "linear acceleration after gravity removal"
            );
            smoothed
        } else {
            imu.accel
        };

        if self.ratio > RATIO_FLOOR {
            linear_acc /= self.ratio;
        }

        let pos_world = self.pos_estimator.update(&linear_acc, imu.dt);
        let pos_cam = -(att_cam * pos_world);

        self.position = pos_world;
        self.position_cam = pos_cam;
        self.attitude = att_cam;

        Ok(SE3::new(att_cam, pos_cam))
    }

    /// Re-anchor attitude, position and velocity from an authoritative
    /// frame pair and re-estimate the drift ratio.
    pub fn correct_pose(&mut self, curr_frame: &Frame, last_frame: &Frame, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            bail!("invalid correction interval dt = {}", dt);
        }

        if self.iteration % self.correction_period == 0 {
            self.att_estimator
                .set_orientation_from_frame(curr_frame.pose());

            let curr_pos = curr_frame.camera_center();
            let last_pos = last_frame.camera_center();
            self.pos_estimator
                .correct_pos_and_vel(&curr_pos, &last_pos, dt)?;

            let acc_observed = (self.pos_estimator.velocity() - self.last_velocity) / dt;
            self.update_ratio(&acc_observed);

            self.last_velocity = self.pos_estimator.velocity();
        }
        self.iteration += 1;
        Ok(())
    }

    /// Re-estimate the drift ratio from the observed acceleration.
    ///
    /// Only meaningful when gravity removal cached a predicted linear
    /// acceleration; guarded so a near-zero or non-finite observation can
    /// never turn the ratio into NaN/Inf or zero.
    fn update_ratio(&mut self, acc_observed: &Vector3<f64>) {
        if !self.remove_gravity {
            return;
        }
        let denom = acc_observed.norm();
        if denom < ACC_NORM_FLOOR {
            warn!(
                norm = denom,
                "observed acceleration too small, keeping previous drift ratio"
            );
            return;
        }
        let raw = self.linear_acc.norm() / denom;
        if !raw.is_finite() {
            warn!(ratio = raw, "non-finite drift ratio candidate, skipping");
            return;
        }
        let smoothed = self.ratio_lpf.apply(&SVector::<f64, 1>::new(raw))[0];
        self.ratio = smoothed.max(RATIO_FLOOR);
        debug!(ratio = self.ratio, "drift ratio updated");
    }
}

impl PredictionModel for ImuModel {
    fn predict(&mut self, ctx: &PredictionContext<'_>) -> Result<SE3> {
        let imu = ctx.imu.context("ImuModel requires an IMU sample")?;
        ImuModel::predict(self, imu)
    }

    fn correct_pose(&mut self, curr: &Frame, last: &Frame, dt: f64) -> Result<()> {
        ImuModel::correct_pose(self, curr, last, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::imu::GRAVITY;

    fn model() -> ImuModel {
        ImuModel::new(0.01, &ExtrinsicCalibration::identity())
    }

    #[test]
    fn test_zero_sample_stationarity() {
        let mut m = model();
        let imu = ImuSample::new(Vector3::zeros(), Vector3::zeros(), 0.01);
        for _ in 0..50 {
            let pose = m.predict(&imu).unwrap();
            assert_relative_eq!(
                pose.rotation_matrix(),
                Matrix3::identity(),
                epsilon = 1e-12
            );
            assert_relative_eq!(pose.translation, Vector3::zeros(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_static_gravity_sample_with_removal_stays_put() {
        let mut m = model();
        m.set_remove_gravity(true);
        let imu = ImuSample::new(GRAVITY, Vector3::zeros(), 0.01);

        let pose = m.predict(&imu).unwrap();

        assert_relative_eq!(m.linear_acc, Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(pose.translation, Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(m.position(), Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn test_predicted_rotation_is_orthonormal() {
        let mut m = model();
        let imu = ImuSample::new(
            Vector3::new(0.3, -0.1, 9.7),
            Vector3::new(0.02, -0.01, 0.05),
            0.01,
        );
        let mut pose = SE3::identity();
        for _ in 0..200 {
            pose = m.predict(&imu).unwrap();
        }
        let r = pose.rotation_matrix();
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-9);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_correction_reanchors_velocity() {
        let mut m = model();
        let imu = ImuSample::new(Vector3::new(0.5, 0.0, 9.8), Vector3::zeros(), 0.01);
        m.predict(&imu).unwrap();

        // Camera moved from the origin to (1, 2, 3) over half a second.
        let center = Vector3::new(1.0, 2.0, 3.0);
        let curr = Frame::from_pose(SE3::new(UnitQuaternion::identity(), -center));
        let last = Frame::from_pose(SE3::identity());

        m.correct_pose(&curr, &last, 0.5).unwrap();

        assert_relative_eq!(
            m.pos_estimator.velocity(),
            center / 0.5,
            epsilon = 1e-12
        );
        assert_relative_eq!(m.pos_estimator.position(), center, epsilon = 1e-12);
    }

    #[test]
    fn test_correction_resets_attitude_reference() {
        let mut m = model();
        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.4, 0.0));
        let curr = Frame::from_pose(SE3::new(rotation, Vector3::zeros()));
        let last = Frame::from_pose(SE3::identity());

        m.correct_pose(&curr, &last, 0.1).unwrap();

        assert_relative_eq!(
            m.att_estimator.local_orientation().angle_to(&rotation),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ratio_guard_keeps_previous_value() {
        let mut m = model();
        m.set_remove_gravity(true);

        // Cache a non-zero predicted linear acceleration.
        let imu = ImuSample::new(GRAVITY + Vector3::new(1.0, 0.0, 0.0), Vector3::zeros(), 0.01);
        m.predict(&imu).unwrap();

        // Identical frames: zero observed velocity change, zero observed
        // acceleration. The ratio must survive unchanged and finite.
        let still = Frame::from_pose(SE3::identity());
        m.correct_pose(&still, &still, 0.1).unwrap();

        assert!(m.ratio().is_finite());
        assert_relative_eq!(m.ratio(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ratio_stays_positive_after_updates() {
        let mut m = model();
        m.set_remove_gravity(true);
        let imu = ImuSample::new(GRAVITY + Vector3::new(2.0, 0.0, 0.0), Vector3::zeros(), 0.01);

        let moving = Frame::from_pose(SE3::new(
            UnitQuaternion::identity(),
            Vector3::new(-1.0, 0.0, 0.0),
        ));
        let still = Frame::from_pose(SE3::identity());

        for _ in 0..10 {
            m.predict(&imu).unwrap();
            m.correct_pose(&moving, &still, 0.1).unwrap();
        }

        assert!(m.ratio() > 0.0);
        assert!(m.ratio().is_finite());
    }

    #[test]
    fn test_correction_period_skips_intermediate_calls() {
        let mut m = model().with_correction_period(3);
        let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.0, 0.7));
        let anchored = Frame::from_pose(SE3::new(rotation, Vector3::zeros()));
        let still = Frame::from_pose(SE3::identity());

        // First call (iteration 0) corrects.
        m.correct_pose(&still, &still, 0.1).unwrap();
        // Iterations 1 and 2 must not touch the attitude reference.
        m.correct_pose(&anchored, &still, 0.1).unwrap();
        m.correct_pose(&anchored, &still, 0.1).unwrap();

        assert_relative_eq!(
            m.att_estimator
                .local_orientation()
                .angle_to(&UnitQuaternion::identity()),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rejects_bad_dt() {
        let mut m = model();
        let still = Frame::from_pose(SE3::identity());
        assert!(m.correct_pose(&still, &still, 0.0).is_err());
        assert!(m.correct_pose(&still, &still, f64::NAN).is_err());
    }
}
