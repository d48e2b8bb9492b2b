//! Data preparation: resampling base bars into execution, anchor and day series.

pub mod resample;

pub use resample::{align_index, resample, resample_bars};
