use ndarray::Array2;

/// Equalizes the intensity histogram of a grayscale buffer in place.
///
/// Maps each level through the normalized cumulative histogram so the
/// darkest occupied level becomes 0 and the brightest 255. A buffer with a
/// single occupied level is left unchanged.
pub fn equalize_histogram(image: &mut Array2<u8>) {
    let total = image.len();
    if total == 0 {
        return;
    }

    let mut hist = [0usize; 256];
    for &v in image.iter() {
        hist[v as usize] += 1;
    }

    let first = hist.iter().position(|&count| count > 0).unwrap_or(0);
    if hist[first] == total {
        return;
    }

    let scale = 255.0 / (total - hist[first]) as f64;
    let mut lut = [0u8; 256];
    let mut cumulative = 0usize;
    for level in (first + 1)..256 {
        cumulative += hist[level];
        lut[level] = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }

    image.mapv_inplace(|v| lut[v as usize]);
}
