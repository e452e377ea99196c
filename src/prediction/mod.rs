//! Prediction models: inertial-aided pose prediction for the tracking loop.
//!
//! Each model turns "previous pose + new sensor sample(s)" into a predicted
//! world-to-camera pose that seeds the next tracking iteration, and may
//! re-anchor its drift-prone internal state from an authoritative pose via
//! `correct_pose`. The five strategies share one predict/correct contract:
//!
//! - [`GroundTruthModel`] - propagates GPS/ground-truth deltas
//! - [`SyntheticModel`] - pure IMU, idealized sensors, no correction
//! - [`ImuModel`] - IMU with gravity removal and a learned drift ratio
//! - [`RefinedImuModel`] - IMU with external scale, three consistent poses
//! - [`GpsImuModel`] - GPS translation scaled through the IMU attitude
//!
//! Calls are strictly sequential per model instance; every instance owns
//! its filter state exclusively.

pub mod gps_imu;
pub mod ground_truth;
pub mod imu_model;
pub mod refined;
pub mod synthetic;

use anyhow::Result;

use crate::frame::Frame;
use crate::geometry::SE3;
use crate::imu::ImuSample;

pub use gps_imu::GpsImuModel;
pub use ground_truth::GroundTruthModel;
pub use imu_model::ImuModel;
pub use refined::RefinedImuModel;
pub use synthetic::SyntheticModel;

/// Inputs available to a prediction step.
///
/// Models pick what they need and fail with a descriptive error when a
/// required input is missing. The sample interval travels on the IMU
/// sample itself.
#[derive(Default)]
pub struct PredictionContext<'a> {
    pub imu: Option<&'a ImuSample>,
    pub curr_frame: Option<&'a Frame>,
    pub last_frame: Option<&'a Frame>,
    pub scale: Option<f64>,
}

/// Common predict/correct protocol shared by all prediction strategies.
pub trait PredictionModel {
    /// Produce a predicted world-to-camera pose from the available inputs.
    fn predict(&mut self, ctx: &PredictionContext<'_>) -> Result<SE3>;

    /// Re-anchor internal state against an authoritative frame pair.
    ///
    /// Default is a no-op for models without persistent correction state.
    fn correct_pose(&mut self, _curr: &Frame, _last: &Frame, _dt: f64) -> Result<()> {
        Ok(())
    }
}
