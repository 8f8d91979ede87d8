//! Backlog smoothing and worker target sizing

use std::collections::VecDeque;

/// Samples kept for the moving average
pub const HISTORY_LEN: usize = 6;

/// Fixed-size window of floored backlog samples
#[derive(Debug, Clone, PartialEq)]
pub struct LoadHistory {
    samples: VecDeque<i64>,
    capacity: usize,
}

impl LoadHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Replaces the whole window with `sample`
    pub fn fill(&mut self, sample: i64) {
        self.samples.clear();
        self.samples.extend(std::iter::repeat_n(sample, self.capacity));
    }

    /// Appends a sample, evicting the oldest once full
    pub fn push(&mut self, sample: i64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Arithmetic mean of the samples held; 0 when empty
    pub fn sma(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|&s| s as f64).sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = i64> + '_ {
        self.samples.iter().copied()
    }
}

impl Default for LoadHistory {
    fn default() -> Self {
        Self::new(HISTORY_LEN)
    }
}

/// Backlog used for smoothing: an unavailable or small reading becomes `optimal`
pub fn floor_estimate(raw: Option<i64>, optimal: i64) -> i64 {
    raw.unwrap_or(optimal).max(optimal)
}

/// `floor(ln(sma)^2.5)` bounded to `[min, max]`.
///
/// Loads at or below 1 (and NaN) map to `min`.
pub fn compute_target(sma: f64, min: i64, max: i64) -> i64 {
    // ln is not positive here, and a fractional power of it is NaN or infinite
    if !(sma > 1.0) {
        return min;
    }
    let raw = sma.ln().powf(2.5).floor() as i64;
    raw.max(min).min(max)
}
