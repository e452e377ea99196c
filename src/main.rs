use anyhow::Result;
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vslam_inertial::frame::Frame;
use vslam_inertial::geometry::SE3;
use vslam_inertial::imu::{ImuSample, GRAVITY};
use vslam_inertial::io::ExtrinsicCalibration;
use vslam_inertial::prediction::ImuModel;

/// Samples per second of the simulated IMU.
const IMU_RATE_HZ: f64 = 100.0;
/// Simulated trajectory length in seconds.
const DURATION_S: f64 = 2.0;
/// Constant body acceleration along NWU north (m/s^2).
const ACCEL_X: f64 = 0.5;
/// Accelerometer noise amplitude (m/s^2).
const ACC_NOISE: f64 = 0.02;
/// Gyroscope noise amplitude (rad/s).
const GYRO_NOISE: f64 = 0.001;

/// Ground-truth camera pose for a body accelerating along NWU north.
fn groundtruth_frame(t: f64) -> Frame {
    let center = Vector3::new(0.5 * ACCEL_X * t * t, 0.0, 0.0);
    let pose = SE3::new(UnitQuaternion::identity(), -center);
    let gps = SE3::new(UnitQuaternion::identity(), center);
    Frame::new(pose, gps)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let calib = match std::env::args().nth(1) {
        Some(path) => ExtrinsicCalibration::load(&path)?,
        None => ExtrinsicCalibration::identity(),
    };

    let dt = 1.0 / IMU_RATE_HZ;
    let steps = (DURATION_S * IMU_RATE_HZ) as usize;

    let mut model = ImuModel::new(0.01, &calib);
    model.set_remove_gravity(true);

    let mut rng = rand::thread_rng();
    let mut last_frame = groundtruth_frame(0.0);
    let mut max_error: f64 = 0.0;

    info!(steps, dt, "running synthetic predict/correct loop");

    for step in 1..=steps {
        let t = step as f64 * dt;

        // Static attitude: the accelerometer reads gravity plus the
        // body acceleration, both in NWU body axes.
        let accel = Vector3::new(ACCEL_X, 0.0, 0.0)
            + GRAVITY
            + Vector3::new(
                rng.gen_range(-ACC_NOISE..ACC_NOISE),
                rng.gen_range(-ACC_NOISE..ACC_NOISE),
                rng.gen_range(-ACC_NOISE..ACC_NOISE),
            );
        let gyro = Vector3::new(
            rng.gen_range(-GYRO_NOISE..GYRO_NOISE),
            rng.gen_range(-GYRO_NOISE..GYRO_NOISE),
            rng.gen_range(-GYRO_NOISE..GYRO_NOISE),
        );
        let imu = ImuSample::new(accel, gyro, dt);

        let predicted = model.predict(&imu)?;

        let curr_frame = groundtruth_frame(t);
        let error = (model.position() - curr_frame.camera_center()).norm();
        max_error = max_error.max(error);

        if step % 20 == 0 {
            info!(
                t,
                predicted_x = predicted.translation.x,
                true_x = curr_frame.camera_center().x,
                error,
                ratio = model.ratio(),
                "prediction step"
            );
        }

        // Close the loop: re-anchor against the authoritative pose.
        model.correct_pose(&curr_frame, &last_frame, dt)?;
        last_frame = curr_frame;
    }

    info!(max_error, "finished; drift stayed bounded by the correction loop");
    Ok(())
}
