//! Grayscale buffer primitives used by the preprocessing stages and the
//! eye-center estimator. Buffers are `ndarray::Array2<u8>` indexed `[row, col]`.

pub mod gaussian;
pub mod grayscale;
pub mod histogram;
pub mod resize;
