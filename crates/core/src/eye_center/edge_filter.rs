use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};

use super::center_voter::arg_max;

/// Cells that survive edge-artifact suppression.
///
/// The map is thresholded at `max * threshold_ratio`; a 4-connected flood
/// then starts from every boundary cell and spreads through above-threshold
/// cells. Everything the flood reaches is attributed to bright structures
/// touching the crop edge (eyelids, brows, highlights) and masked out.
pub fn surviving_mask(map: ArrayView2<'_, f64>, threshold_ratio: f64) -> Array2<bool> {
    let (rows, cols) = map.dim();
    let mut mask = Array2::from_elem((rows, cols), true);
    if rows == 0 || cols == 0 {
        return mask;
    }

    let max = map.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let threshold = max * threshold_ratio;
    let passable = |r: usize, c: usize| map[[r, c]] >= threshold && map[[r, c]] > 0.0;

    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    for c in 0..cols {
        queue.push_back((0, c));
        queue.push_back((rows - 1, c));
    }
    for r in 0..rows {
        queue.push_back((r, 0));
        queue.push_back((r, cols - 1));
    }

    while let Some((r, c)) = queue.pop_front() {
        if !mask[[r, c]] {
            continue;
        }
        mask[[r, c]] = false;

        let mut visit = |nr: usize, nc: usize| {
            if mask[[nr, nc]] && passable(nr, nc) {
                queue.push_back((nr, nc));
            }
        };
        if c + 1 < cols {
            visit(r, c + 1);
        }
        if c > 0 {
            visit(r, c - 1);
        }
        if r + 1 < rows {
            visit(r + 1, c);
        }
        if r > 0 {
            visit(r - 1, c);
        }
    }

    mask
}

/// Maximum of `map` restricted to [`surviving_mask`], falling back to the
/// unrestricted maximum when nothing survives.
pub fn filtered_maximum(map: ArrayView2<'_, f64>, threshold_ratio: f64) -> Option<(usize, usize)> {
    let mask = surviving_mask(map, threshold_ratio);
    arg_max(map, Some(mask.view())).or_else(|| {
        log::debug!("edge filter removed every candidate; using raw maximum");
        arg_max(map, None)
    })
}
