//! Real-time face tracking and eye-center localization.
//!
//! Frames flow through a seven-stage [`pipeline`]: acquisition, grayscale
//! conversion, downscaling, histogram equalization, face detection,
//! annotation (smoothing plus gradient-voting eye centers) and handoff to a
//! bounded queue read by a [`presentation`] adapter.

pub mod shared {
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod geometry;
}

pub mod acquisition {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod object_detector;
    }
    pub mod infrastructure;
}

pub mod eye_center;
pub mod imaging;
pub mod pipeline;
pub mod presentation;
pub mod tracking;

pub use shared::error::TrackingError;
