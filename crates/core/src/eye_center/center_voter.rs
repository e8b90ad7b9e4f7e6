use ndarray::{Array2, ArrayView2};

use super::gradient::GradientField;

/// Vote-accumulated center scores, one cell per working-buffer pixel.
pub type LikelihoodMap = Array2<f64>;

/// Accumulates center votes from a normalized gradient field.
///
/// Every pixel `p` with a nonzero gradient `g` votes for every other cell
/// `c` with `max(0, d̂(c→p) · g)² · weight(p)`, so pixels whose gradient
/// points radially away from `c` support `c` being the pupil center. The
/// result is divided by the pixel count to keep scores comparable across
/// region sizes.
///
/// Cost is quadratic in the number of pixels; callers keep the buffer at the
/// canonical working width.
pub fn vote(gradients: &GradientField, weight: ArrayView2<'_, u8>) -> LikelihoodMap {
    let (rows, cols) = gradients.dim();
    debug_assert_eq!(weight.dim(), (rows, cols), "weight must match gradient shape");

    let mut map = Array2::<f64>::zeros((rows, cols));
    let pixel_count = rows * cols;
    if pixel_count == 0 {
        return map;
    }

    let out = map
        .as_slice_mut()
        .expect("freshly allocated map is contiguous");

    for ((py, px), &gx) in gradients.dx.indexed_iter() {
        let gy = gradients.dy[[py, px]];
        if gx == 0.0 && gy == 0.0 {
            continue;
        }
        let w = weight[[py, px]] as f64;
        if w == 0.0 {
            continue;
        }
        accumulate_votes(out, cols, rows, px, py, gx, gy, w);
    }

    let n = pixel_count as f64;
    map.mapv_inplace(|v| v / n);
    map
}

#[allow(clippy::too_many_arguments)]
fn accumulate_votes(
    out: &mut [f64],
    cols: usize,
    rows: usize,
    px: usize,
    py: usize,
    gx: f64,
    gy: f64,
    weight: f64,
) {
    for cy in 0..rows {
        let dy = py as f64 - cy as f64;
        let row = &mut out[cy * cols..(cy + 1) * cols];
        for (cx, cell) in row.iter_mut().enumerate() {
            if cx == px && cy == py {
                continue;
            }
            let dx = px as f64 - cx as f64;
            let len = (dx * dx + dy * dy).sqrt();
            let dot = ((dx * gx + dy * gy) / len).max(0.0);
            *cell += dot * dot * weight;
        }
    }
}

/// Position `(row, col)` of the first maximum in row-major order,
/// restricted to `mask` when given. `None` when no cell is eligible.
pub fn arg_max(map: ArrayView2<'_, f64>, mask: Option<ArrayView2<'_, bool>>) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for (pos, &value) in map.indexed_iter() {
        if let Some(m) = mask.as_ref() {
            if !m[pos] {
                continue;
            }
        }
        match best {
            Some((_, v)) if value <= v => {}
            _ => best = Some((pos, value)),
        }
    }
    best.map(|(pos, _)| pos)
}
