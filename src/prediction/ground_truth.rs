//! Ground-truth delta propagation model.

use anyhow::{bail, Context, Result};
use nalgebra::{Matrix3, UnitQuaternion};
use tracing::debug;

use crate::frame::Frame;
use crate::geometry::SE3;

use super::{PredictionContext, PredictionModel};

/// Minimum translation-delta norm for extrinsic estimation.
const MIN_BASELINE: f64 = 1e-9;

/// Oracle baseline predictor: treats the GPS/ground-truth pose stream as
/// authoritative and propagates its deltas into the SLAM frame.
#[derive(Debug, Clone)]
pub struct GroundTruthModel {
    rotation_gps_to_slam: Matrix3<f64>,
}

impl GroundTruthModel {
    pub fn new(rotation_gps_to_slam: Matrix3<f64>) -> Self {
        Self {
            rotation_gps_to_slam,
        }
    }

    /// Propagate the GPS delta between two frames onto the last SLAM pose.
    pub fn predict(&self, curr_frame: &Frame, last_frame: &Frame) -> SE3 {
        // Attitude: incremental GPS rotation applied to the last SLAM rotation.
        let mut diff_r = curr_frame.gps_rotation() * last_frame.gps_rotation().inverse();
        diff_r.renormalize();
        let mut rotation = diff_r * last_frame.rotation();
        rotation.renormalize();

        // Position: GPS delta rotated into the SLAM frame, combined with the
        // rotated previous SLAM position.
        let diff_t_gps = curr_frame.gps_translation() - last_frame.gps_translation();
        let translation_slam = self.rotation_gps_to_slam * diff_t_gps;
        let translation =
            diff_r * last_frame.position() + diff_r.inverse() * translation_slam;

        SE3::new(rotation, translation)
    }

    /// Calibrate the GPS-to-SLAM rotation from one observed frame pair.
    ///
    /// Aligns the GPS translation delta with the SLAM camera-center delta.
    /// A single pair leaves the rotation about the common axis
    /// unobservable; feeding pairs with different motion directions and
    /// re-estimating refines it.
    pub fn estimate_rotation_gps_to_slam(
        &mut self,
        first_frame: &Frame,
        curr_frame: &Frame,
    ) -> Result<()> {
        let d_gps = curr_frame.gps_translation() - first_frame.gps_translation();
        let d_slam = curr_frame.camera_center() - first_frame.camera_center();

        if d_gps.norm() < MIN_BASELINE || d_slam.norm() < MIN_BASELINE {
            bail!(
                "degenerate baseline for GPS-to-SLAM calibration (gps {:e}, slam {:e})",
                d_gps.norm(),
                d_slam.norm()
            );
        }

        let rotation = UnitQuaternion::rotation_between(&d_gps, &d_slam)
            .context("GPS and SLAM deltas are anti-parallel, alignment is ambiguous")?;
        self.rotation_gps_to_slam = rotation.to_rotation_matrix().into_inner();
        debug!(
            angle = rotation.angle(),
            "estimated GPS-to-SLAM rotation from frame pair"
        );
        Ok(())
    }

    pub fn rotation_gps_to_slam(&self) -> &Matrix3<f64> {
        &self.rotation_gps_to_slam
    }
}

impl Default for GroundTruthModel {
    fn default() -> Self {
        Self::new(Matrix3::identity())
    }
}

impl PredictionModel for GroundTruthModel {
    fn predict(&mut self, ctx: &PredictionContext<'_>) -> Result<SE3> {
        let curr = ctx
            .curr_frame
            .context("GroundTruthModel requires the current frame")?;
        let last = ctx
            .last_frame
            .context("GroundTruthModel requires the last frame")?;
        Ok(GroundTruthModel::predict(self, curr, last))
    }
}
