use serde::{Deserialize, Serialize};

use crate::shared::geometry::{CoordinateSpace, Point, Rect};

/// How the average treats history slots that have not been written yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragingMode {
    /// Average every slot, including zero-initialized ones, so the output
    /// ramps up from the origin over the first `capacity` samples.
    #[default]
    FixedWindow,
    /// Average only the slots written so far.
    ValidSamples,
}

/// Sample type a [`TemporalSmoother`] can average.
pub trait Smoothable: Copy + Default {
    /// Component-wise mean of `samples`, rounded to the nearest integer.
    fn mean(samples: &[Self]) -> Self;
}

fn rounded_mean(sum: i64, count: usize) -> i32 {
    (sum as f64 / count as f64).round() as i32
}

impl<S: CoordinateSpace> Smoothable for Rect<S> {
    fn mean(samples: &[Self]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len();
        let mut sums = [0i64; 4];
        for r in samples {
            sums[0] += r.x as i64;
            sums[1] += r.y as i64;
            sums[2] += r.width as i64;
            sums[3] += r.height as i64;
        }
        Rect::new(
            rounded_mean(sums[0], n),
            rounded_mean(sums[1], n),
            rounded_mean(sums[2], n),
            rounded_mean(sums[3], n),
        )
    }
}

impl<S: CoordinateSpace> Smoothable for Point<S> {
    fn mean(samples: &[Self]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len();
        let (sx, sy) = samples
            .iter()
            .fold((0i64, 0i64), |(sx, sy), p| (sx + p.x as i64, sy + p.y as i64));
        Point::new(rounded_mean(sx, n), rounded_mean(sy, n))
    }
}

/// Moving average over a fixed-depth circular history.
///
/// Each [`push`](Self::push) overwrites the slot under the cursor, advances
/// the cursor modulo capacity and returns the mean of the history.
pub struct TemporalSmoother<T: Smoothable> {
    history: Vec<T>,
    cursor: usize,
    filled: usize,
    mode: AveragingMode,
}

impl<T: Smoothable> TemporalSmoother<T> {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, mode: AveragingMode) -> Self {
        Self {
            history: vec![T::default(); capacity.max(1)],
            cursor: 0,
            filled: 0,
            mode,
        }
    }

    pub fn push(&mut self, sample: T) -> T {
        let capacity = self.history.len();
        self.history[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % capacity;
        self.filled = (self.filled + 1).min(capacity);

        match self.mode {
            AveragingMode::FixedWindow => T::mean(&self.history),
            AveragingMode::ValidSamples if self.filled == capacity => T::mean(&self.history),
            // Slots are written front to back until the buffer first wraps.
            AveragingMode::ValidSamples => T::mean(&self.history[..self.filled]),
        }
    }

    pub fn capacity(&self) -> usize {
        self.history.len()
    }

    /// Number of slots written since creation or the last reset.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn mode(&self) -> AveragingMode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.history.fill(T::default());
        self.cursor = 0;
        self.filled = 0;
    }
}
