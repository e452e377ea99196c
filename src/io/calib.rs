//! Extrinsic calibration loading.
//!
//! The fixed rotations between the IMU, camera, SLAM-world and GPS frames
//! are dataset calibration, not constants of the prediction core, so they
//! are read from a YAML file at construction time. Each rotation is a
//! row-major 9-element `data` array. `R_imu_world` may be given directly
//! or as the velodyne chain `R_velo_cam * R_imu_velo` (KITTI).

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::Matrix3;
use serde::Deserialize;

/// Tolerance for the orthonormality check on loaded rotations.
const ORTHONORMAL_TOL: f64 = 1e-4;

#[derive(Debug, Deserialize)]
struct RotationYaml {
    data: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct CalibYaml {
    #[serde(rename = "R_imu_cam")]
    r_imu_cam: Option<RotationYaml>,
    #[serde(rename = "R_imu_world")]
    r_imu_world: Option<RotationYaml>,
    #[serde(rename = "R_imu_velo")]
    r_imu_velo: Option<RotationYaml>,
    #[serde(rename = "R_velo_cam")]
    r_velo_cam: Option<RotationYaml>,
    #[serde(rename = "R_gps_slam")]
    r_gps_slam: Option<RotationYaml>,
}

/// Fixed calibration rotations consumed by the prediction models.
#[derive(Debug, Clone)]
pub struct ExtrinsicCalibration {
    /// IMU body axes to camera axes.
    pub r_imu_cam: Matrix3<f64>,
    /// IMU body axes to the SLAM world frame.
    pub r_imu_world: Matrix3<f64>,
    /// GPS world frame to the SLAM world frame.
    pub r_gps_slam: Matrix3<f64>,
}

impl ExtrinsicCalibration {
    /// All-identity calibration (co-aligned frames).
    pub fn identity() -> Self {
        Self {
            r_imu_cam: Matrix3::identity(),
            r_imu_world: Matrix3::identity(),
            r_gps_slam: Matrix3::identity(),
        }
    }

    /// Load calibration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open calibration {:?}", path))?;
        let yaml: CalibYaml = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse calibration {:?}", path))?;
        Self::from_yaml(yaml)
    }

    /// Parse calibration from an in-memory YAML string.
    pub fn from_str(contents: &str) -> Result<Self> {
        let yaml: CalibYaml = serde_yaml::from_str(contents)?;
        Self::from_yaml(yaml)
    }

    fn from_yaml(yaml: CalibYaml) -> Result<Self> {
        let r_imu_world = match (yaml.r_imu_world, yaml.r_imu_velo, yaml.r_velo_cam) {
            (Some(direct), _, _) => rotation_from(&direct.data, "R_imu_world")?,
            (None, Some(imu_velo), Some(velo_cam)) => {
                rotation_from(&velo_cam.data, "R_velo_cam")?
                    * rotation_from(&imu_velo.data, "R_imu_velo")?
            }
            (None, None, None) => Matrix3::identity(),
            _ => bail!("R_imu_velo and R_velo_cam must be given together"),
        };

        let r_imu_cam = match yaml.r_imu_cam {
            Some(r) => rotation_from(&r.data, "R_imu_cam")?,
            None => Matrix3::identity(),
        };
        let r_gps_slam = match yaml.r_gps_slam {
            Some(r) => rotation_from(&r.data, "R_gps_slam")?,
            None => Matrix3::identity(),
        };

        Ok(Self {
            r_imu_cam,
            r_imu_world,
            r_gps_slam,
        })
    }
}

impl Default for ExtrinsicCalibration {
    fn default() -> Self {
        Self::identity()
    }
}

/// Convert a row-major 9-element array into a validated rotation matrix.
fn rotation_from(data: &[f64], name: &str) -> Result<Matrix3<f64>> {
    if data.len() != 9 {
        bail!("{}: expected 9 elements for rotation, got {}", name, data.len());
    }
    let r = Matrix3::from_row_slice(data);

    let deviation = (r.transpose() * r - Matrix3::identity()).norm();
    if deviation > ORTHONORMAL_TOL {
        bail!("{}: rotation is not orthonormal (deviation {:e})", name, deviation);
    }
    if r.determinant() < 0.0 {
        bail!("{}: rotation has negative determinant (reflection)", name);
    }
    Ok(r)
}
