use ndarray::{Array2, Axis};

use crate::shared::frame::Frame;

/// BT.601 luma of an RGB frame, fixed-point rounded.
///
/// Single-channel frames are copied through unchanged.
pub fn to_grayscale(frame: &Frame) -> Array2<u8> {
    let pixels = frame.as_ndarray();
    if frame.channels() < 3 {
        return pixels.index_axis(Axis(2), 0).to_owned();
    }

    let (height, width, _) = pixels.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let r = pixels[[y, x, 0]] as u32;
        let g = pixels[[y, x, 1]] as u32;
        let b = pixels[[y, x, 2]] as u32;
        ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::black([0, 0, 0], 0)]
    #[case::white([255, 255, 255], 255)]
    #[case::red([255, 0, 0], 76)]
    #[case::green([0, 255, 0], 150)]
    #[case::blue([0, 0, 255], 29)]
    fn test_luma_weights(#[case] rgb: [u8; 3], #[case] expected: u8) {
        let gray = to_grayscale(&Frame::filled(2, 2, rgb, 0));
        assert!(gray.iter().all(|&v| v == expected));
    }

    #[test]
    fn test_shape_is_height_by_width() {
        let gray = to_grayscale(&Frame::filled(5, 3, [10, 10, 10], 0));
        assert_eq!(gray.dim(), (3, 5));
    }

    #[test]
    fn test_single_channel_passes_through() {
        let frame = Frame::new(vec![1, 2, 3, 4], 2, 2, 1, 0);
        let gray = to_grayscale(&frame);
        assert_eq!(gray[[1, 0]], 3);
    }
}
