use ndarray::{Array2, ArrayView2};

/// Bilinear resize with pixel-center alignment (`src = (dst + 0.5) * ratio - 0.5`).
///
/// Zero target dimensions produce an empty buffer.
pub fn resize_bilinear(src: ArrayView2<'_, u8>, width: usize, height: usize) -> Array2<u8> {
    let (src_h, src_w) = src.dim();
    if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
        return Array2::zeros((height, width));
    }
    if width == src_w && height == src_h {
        return src.to_owned();
    }

    let ratio_x = src_w as f64 / width as f64;
    let ratio_y = src_h as f64 / height as f64;

    let columns: Vec<(usize, usize, f64)> = (0..width)
        .map(|x| sample_position(x, ratio_x, src_w))
        .collect();

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (y0, y1, fy) = sample_position(y, ratio_y, src_h);
        let (x0, x1, fx) = columns[x];
        let top = src[[y0, x0]] as f64 * (1.0 - fx) + src[[y0, x1]] as f64 * fx;
        let bottom = src[[y1, x0]] as f64 * (1.0 - fx) + src[[y1, x1]] as f64 * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    })
}

/// Shrinks a buffer by `scale` (>= 1 shrinks, 1 copies).
pub fn downscale(src: ArrayView2<'_, u8>, scale: f64) -> Array2<u8> {
    let (h, w) = src.dim();
    if scale <= 1.0 {
        return src.to_owned();
    }
    let width = ((w as f64 / scale).round() as usize).max(1);
    let height = ((h as f64 / scale).round() as usize).max(1);
    resize_bilinear(src, width, height)
}

fn sample_position(dst: usize, ratio: f64, src_len: usize) -> (usize, usize, f64) {
    let pos = ((dst as f64 + 0.5) * ratio - 0.5).max(0.0);
    let i0 = (pos.floor() as usize).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    (i0, i1, pos - i0 as f64)
}
