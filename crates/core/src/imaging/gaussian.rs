use ndarray::Array2;

/// Sigma OpenCV derives for a kernel of the given size when sigma is 0.
pub fn auto_sigma(kernel_size: usize) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Precompute a normalized 1D Gaussian kernel.
///
/// `kernel_size` must be odd and >= 1. A non-positive `sigma` selects
/// [`auto_sigma`].
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f64) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        auto_sigma(kernel_size)
    };
    let half = (kernel_size / 2) as f64;
    let mut kernel_f64: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel_f64.iter().sum();
    for v in &mut kernel_f64 {
        *v /= sum;
    }
    kernel_f64.iter().map(|&v| v as f32).collect()
}

/// Apply a separable Gaussian blur using a pre-computed kernel, reusing `temp`.
///
/// Borders replicate the edge pixel.
pub fn separable_gaussian_blur_with_kernel(
    data: &mut [u8],
    width: usize,
    height: usize,
    kernel: &[f32],
    temp: &mut Vec<f32>,
) {
    let kernel_size = kernel.len();
    if kernel_size <= 1 || width == 0 || height == 0 {
        return;
    }
    let half = kernel_size / 2;
    temp.resize(width * height, 0.0);

    // Horizontal pass: data → temp
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half as isize).clamp(0, (width - 1) as isize)
                    as usize;
                sum += data[y * width + sx] as f32 * w;
            }
            temp[y * width + x] = sum;
        }
    }

    // Vertical pass: temp → data
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half as isize).clamp(0, (height - 1) as isize)
                    as usize;
                sum += temp[sy * width + x] * w;
            }
            data[y * width + x] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Blurred copy of a grayscale buffer.
pub fn blur_gray(image: &Array2<u8>, kernel: &[f32]) -> Array2<u8> {
    let (height, width) = image.dim();
    let mut data: Vec<u8> = image.iter().copied().collect();
    let mut temp = Vec::new();
    separable_gaussian_blur_with_kernel(&mut data, width, height, kernel, &mut temp);
    Array2::from_shape_vec((height, width), data).expect("blurred buffer keeps its shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_sums_to_one() {
        for size in [1, 3, 5, 9] {
            let k = gaussian_kernel_1d(size, 0.0);
            let sum: f32 = k.iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_kernel_is_symmetric_and_peaked() {
        let k = gaussian_kernel_1d(5, 0.0);
        assert_relative_eq!(k[0], k[4]);
        assert_relative_eq!(k[1], k[3]);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn test_auto_sigma_matches_five_tap_convention() {
        assert_relative_eq!(auto_sigma(5), 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let img = Array2::from_elem((6, 8), 77u8);
        let blurred = blur_gray(&img, &gaussian_kernel_1d(5, 0.0));
        assert!(blurred.iter().all(|&v| v == 77));
    }

    #[test]
    fn test_blur_spreads_single_bright_pixel() {
        let mut img = Array2::zeros((7, 7));
        img[[3, 3]] = 255u8;
        let blurred = blur_gray(&img, &gaussian_kernel_1d(5, 0.0));
        assert!(blurred[[3, 3]] < 255);
        assert!(blurred[[3, 4]] > 0);
        assert_eq!(blurred[[3, 4]], blurred[[3, 2]]);
        assert_eq!(blurred[[0, 0]], 0);
    }
}
