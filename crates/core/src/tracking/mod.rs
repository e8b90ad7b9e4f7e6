pub mod eye_regions;
pub mod temporal_smoother;

pub use eye_regions::{EyeRegionLayout, EyeSide};
pub use temporal_smoother::{AveragingMode, Smoothable, TemporalSmoother};
