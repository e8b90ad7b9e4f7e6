//! Gradient-voting pupil localization.
//!
//! An eye crop is rescaled to a canonical width, its normalized gradients
//! vote for candidate centers weighted by darkness, edge-touching maxima are
//! suppressed, and the winning cell is mapped back to frame coordinates.

pub mod center_voter;
pub mod edge_filter;
pub mod estimator;
pub mod gradient;

pub use estimator::{EyeCenterConfig, EyeCenterEstimator};
