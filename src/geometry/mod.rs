//! Geometry utilities: SE3 transforms, coordinate frame conventions.

pub mod frames;
pub mod se3;

pub use se3::SE3;
