/// Equal-width partition of a sin(theta)/lambda range into scale-factor slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionBins {
    lower: f64,
    width: f64,
    count: usize,
}

impl ResolutionBins {
    /// Returns `None` for an empty count or a range without positive width.
    pub fn spanning(lower: f64, upper: f64, count: usize) -> Option<Self> {
        if count == 0 || !lower.is_finite() || !upper.is_finite() || upper <= lower {
            return None;
        }
        Some(Self {
            lower,
            width: (upper - lower) / count as f64,
            count,
        })
    }

    pub const fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.lower + self.width * self.count as f64
    }

    /// Zero-based slot of `x`; values outside the range land in the end slots.
    pub fn index_of(&self, x: f64) -> usize {
        let position = ((x - self.lower) / self.width).floor();
        if position <= 0.0 || position.is_nan() {
            0
        } else {
            (position as usize).min(self.count - 1)
        }
    }

    /// One-based batch number as written to the reflection file.
    pub fn batch_of(&self, x: f64) -> i32 {
        self.index_of(x) as i32 + 1
    }

    pub fn centers(&self) -> Vec<f64> {
        (0..self.count)
            .map(|index| self.lower + (index as f64 + 0.5) * self.width)
            .collect()
    }
}
