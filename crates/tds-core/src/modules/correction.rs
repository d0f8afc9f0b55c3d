//! Polynomial TDS correction: fit `s(x) = 1 + a*x^2 + b*x^3` to the
//! normalized scale factors and divide intensities by it.

use super::hkl::ReflectionFile;
use super::resolution::ResolutionModel;
use crate::domain::{CorrectionCoefficients, ScaleFactorBin, TdsError, TdsResult};
use crate::numerics::{DenseMatrix, FitError, solve_least_squares};
use serde::Serialize;

fn fit_error(error: FitError) -> TdsError {
    TdsError::computation("RUN.FIT", format!("TDS polynomial fit failed: {}", error))
}

/// Least-squares (a, b) with the model pinned to 1 at x = 0.
///
/// Bins centered above `max_resolution` are left out.
pub fn fit_correction(
    bins: &[ScaleFactorBin],
    max_resolution: Option<f64>,
) -> TdsResult<CorrectionCoefficients> {
    let used = bins
        .iter()
        .filter(|bin| max_resolution.is_none_or(|limit| bin.resolution <= limit))
        .collect::<Vec<_>>();

    let mut design = DenseMatrix::zeros(used.len(), 2);
    let mut observations = Vec::with_capacity(used.len());
    for (row, bin) in used.iter().enumerate() {
        let x2 = bin.resolution * bin.resolution;
        design[(row, 0)] = x2;
        design[(row, 1)] = x2 * bin.resolution;
        observations.push(bin.scale_factor - 1.0);
    }

    let solution = solve_least_squares(&design, &observations).map_err(fit_error)?;
    Ok(CorrectionCoefficients::new(solution[0], solution[1]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionSummary {
    pub corrected: usize,
    /// Reflections without a known resolution, removed from the file.
    pub dropped: usize,
}

/// Divides intensity and sigma of every reflection by `1 + alpha(x)` and
/// records `coefficients` in the annotation line.
pub fn apply_correction(
    file: &mut ReflectionFile,
    resolution: &ResolutionModel,
    coefficients: CorrectionCoefficients,
) -> TdsResult<CorrectionSummary> {
    let before = file.reflections.len();
    let mut corrected = Vec::with_capacity(before);

    for (index, mut reflection) in file.reflections.drain(..).enumerate() {
        let Some(x) = resolution.resolution_of(&reflection) else {
            continue;
        };
        let factor = coefficients.factor(x);
        if !(factor.is_finite() && factor > 0.0) {
            return Err(TdsError::computation(
                "RUN.CORRECTION_FACTOR",
                format!(
                    "correction factor {:.6} for reflection ({} {} {}) at sin(theta)/lambda {:.4} is not positive ({})",
                    factor, reflection.h, reflection.k, reflection.l, x, coefficients
                ),
            ));
        }
        reflection.intensity /= factor;
        reflection.sigma /= factor;
        corrected.push((index, reflection));
    }

    if corrected.is_empty() {
        return Err(TdsError::computation(
            "RUN.CORRECTION_EMPTY",
            "no reflection has a known resolution; nothing left to write",
        ));
    }

    file.replace_reflections(corrected);
    file.set_annotation(coefficients);
    Ok(CorrectionSummary {
        corrected: file.reflections.len(),
        dropped: before - file.reflections.len(),
    })
}
