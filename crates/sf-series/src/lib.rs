//! Sensorfleet in-memory time-series primitives.

pub mod frame;
pub mod stats;

pub use frame::{Column, Frame};
pub use stats::{denoise_frame, iqr_band, mode_delta, percentile, std_dev, AdmissibleBand};
