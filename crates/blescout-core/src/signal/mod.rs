//! Signal conditioning: RSSI smoothing and distance estimation.

pub mod distance;
pub mod window;

pub use distance::{DistanceEstimator, Environment, REF_RSSI_OFFSET_DB};
pub use window::RssiWindow;
