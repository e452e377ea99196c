//! Tracking `Frame` as consumed by the prediction models.
//!
//! A frame exposes two independent pose sources: the SLAM-estimated pose
//! (world-to-camera, the convention every `predict` output follows) and a
//! GPS/ground-truth pose. The prediction core only ever reads frames; the
//! tracking loop owns them.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::SE3;

#[derive(Debug, Clone)]
pub struct Frame {
    /// SLAM-estimated pose (world-to-camera).
    pose: SE3,
    /// GPS/ground-truth pose in the GPS world frame.
    gps: SE3,
}

impl Frame {
    pub fn new(pose: SE3, gps: SE3) -> Self {
        Self { pose, gps }
    }

    /// Frame with only a SLAM pose; the GPS pose defaults to identity.
    pub fn from_pose(pose: SE3) -> Self {
        Self {
            pose,
            gps: SE3::identity(),
        }
    }

    pub fn pose(&self) -> &SE3 {
        &self.pose
    }

    pub fn rotation(&self) -> &UnitQuaternion<f64> {
        &self.pose.rotation
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.pose.translation
    }

    pub fn gps_rotation(&self) -> &UnitQuaternion<f64> {
        &self.gps.rotation
    }

    pub fn gps_translation(&self) -> &Vector3<f64> {
        &self.gps.translation
    }

    /// Camera position in the SLAM world: `-R^T * t`.
    pub fn camera_center(&self) -> Vector3<f64> {
        -(self.pose.rotation.inverse() * self.pose.translation)
    }

    pub fn set_pose(&mut self, pose: SE3) {
        self.pose = pose;
    }

    pub fn set_gps_pose(&mut self, gps: SE3) {
        self.gps = gps;
    }
}
