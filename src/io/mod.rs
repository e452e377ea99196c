//! Configuration I/O.

pub mod calib;

pub use calib::ExtrinsicCalibration;
