use ndarray::{Array2, ArrayView2, Zip};

/// Per-pixel gradient components over one buffer, same shape as the source.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientField {
    pub dx: Array2<f64>,
    pub dy: Array2<f64>,
}

impl GradientField {
    /// X and Y gradients of `buffer`; Y is computed through the transpose so
    /// both components share one numeric routine.
    pub fn of(buffer: ArrayView2<'_, f64>) -> Self {
        Self {
            dx: compute_x_gradient(buffer),
            dy: compute_y_gradient(buffer),
        }
    }

    pub fn magnitude(&self) -> Array2<f64> {
        magnitude(self.dx.view(), self.dy.view())
    }

    /// Replaces above-threshold vectors by unit vectors and zeroes the rest.
    pub fn normalize(&mut self, magnitude: ArrayView2<'_, f64>, threshold: f64) {
        normalize(&mut self.dx, &mut self.dy, magnitude, threshold);
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dx.dim()
    }
}

/// Central differences along each row, one-sided at the two ends.
///
/// Rows shorter than two pixels have no defined gradient and yield zeros.
pub fn compute_x_gradient(buffer: ArrayView2<'_, f64>) -> Array2<f64> {
    let (rows, cols) = buffer.dim();
    let mut out = Array2::zeros((rows, cols));
    if cols < 2 {
        return out;
    }

    for (src, mut dst) in buffer.rows().into_iter().zip(out.rows_mut()) {
        dst[0] = src[1] - src[0];
        for x in 1..cols - 1 {
            dst[x] = (src[x + 1] - src[x - 1]) / 2.0;
        }
        dst[cols - 1] = src[cols - 1] - src[cols - 2];
    }
    out
}

/// `transpose(compute_x_gradient(transpose(buffer)))`.
pub fn compute_y_gradient(buffer: ArrayView2<'_, f64>) -> Array2<f64> {
    compute_x_gradient(buffer.t())
        .reversed_axes()
        .as_standard_layout()
        .into_owned()
}

pub fn magnitude(dx: ArrayView2<'_, f64>, dy: ArrayView2<'_, f64>) -> Array2<f64> {
    Zip::from(&dx)
        .and(&dy)
        .map_collect(|&gx, &gy| (gx * gx + gy * gy).sqrt())
}

/// `mean + sensitivity * stddev / sqrt(n)` over the magnitude field.
///
/// Self-calibrates per eye and per frame instead of relying on a fixed
/// cutoff that breaks under different lighting.
pub fn dynamic_threshold(magnitude: ArrayView2<'_, f64>, sensitivity: f64) -> f64 {
    let n = magnitude.len();
    if n == 0 {
        return 0.0;
    }
    let mean = magnitude.sum() / n as f64;
    let variance = magnitude.fold(0.0, |acc, &m| acc + (m - mean) * (m - mean)) / n as f64;
    mean + sensitivity * variance.sqrt() / (n as f64).sqrt()
}

pub fn normalize(
    dx: &mut Array2<f64>,
    dy: &mut Array2<f64>,
    magnitude: ArrayView2<'_, f64>,
    threshold: f64,
) {
    Zip::from(dx)
        .and(dy)
        .and(&magnitude)
        .for_each(|gx, gy, &m| {
            if m > threshold {
                *gx /= m;
                *gy /= m;
            } else {
                *gx = 0.0;
                *gy = 0.0;
            }
        });
}
