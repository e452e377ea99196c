pub mod attitude;
pub mod filters;
pub mod position;
pub mod sample;

pub use attitude::AttitudeFilter;
pub use filters::LowPassFilter;
pub use position::PositionEstimator;
pub use sample::{ImuSample, GRAVITY};
