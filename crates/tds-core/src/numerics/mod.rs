pub mod binning;
pub mod least_squares;
pub mod reciprocal;

pub use binning::ResolutionBins;
pub use least_squares::{FitError, solve_least_squares};
pub use reciprocal::{ReciprocalMetric, UnitCell};

use faer::Mat;

pub type DenseMatrix = Mat<f64>;

pub fn max_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .reduce(f64::max)
}

pub fn min_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .reduce(f64::min)
}
