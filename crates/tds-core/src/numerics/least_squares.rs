use super::DenseMatrix;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-300;
const ILL_CONDITIONED_RELATIVE_PIVOT_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("least-squares fit needs at least {required} observations, got {actual}")]
    TooFewObservations { required: usize, actual: usize },
    #[error("design matrix has {rows} rows but {observations} observations were given")]
    LengthMismatch { rows: usize, observations: usize },
    #[error("non-finite value in observation {index}")]
    NonFiniteObservation { index: usize },
    #[error("normal equations are singular at pivot index {pivot_index}")]
    SingularSystem { pivot_index: usize },
    #[error("normal equations are ill-conditioned at pivot index {pivot_index}")]
    IllConditionedSystem { pivot_index: usize },
}

/// Solves `min |design * beta - observations|^2` through the normal equations.
///
/// The systems solved here are tiny (a handful of observations, two or
/// three parameters), so the normal matrix is formed explicitly and reduced
/// with partially pivoted Gaussian elimination.
pub fn solve_least_squares(
    design: &DenseMatrix,
    observations: &[f64],
) -> Result<Vec<f64>, FitError> {
    let rows = design.nrows();
    let parameters = design.ncols();

    if rows != observations.len() {
        return Err(FitError::LengthMismatch {
            rows,
            observations: observations.len(),
        });
    }
    if rows < parameters || parameters == 0 {
        return Err(FitError::TooFewObservations {
            required: parameters.max(1),
            actual: rows,
        });
    }
    for (index, value) in observations.iter().enumerate() {
        let row_finite = (0..parameters).all(|col| design[(index, col)].is_finite());
        if !value.is_finite() || !row_finite {
            return Err(FitError::NonFiniteObservation { index });
        }
    }

    let mut normal = DenseMatrix::zeros(parameters, parameters);
    let mut rhs = vec![0.0; parameters];
    for row in 0..rows {
        for i in 0..parameters {
            let di = design[(row, i)];
            rhs[i] += di * observations[row];
            for j in 0..parameters {
                normal[(i, j)] += di * design[(row, j)];
            }
        }
    }

    solve_dense(normal, rhs)
}

fn solve_dense(mut matrix: DenseMatrix, mut rhs: Vec<f64>) -> Result<Vec<f64>, FitError> {
    let dimension = matrix.nrows();
    let norm = infinity_norm(&matrix);

    for pivot_col in 0..dimension {
        let pivot_row = (pivot_col..dimension)
            .max_by(|a, b| {
                matrix[(*a, pivot_col)]
                    .abs()
                    .total_cmp(&matrix[(*b, pivot_col)].abs())
            })
            .unwrap_or(pivot_col);

        let pivot = matrix[(pivot_row, pivot_col)];
        if pivot.abs() <= SINGULAR_PIVOT_EPSILON {
            return Err(FitError::SingularSystem {
                pivot_index: pivot_col,
            });
        }
        if pivot.abs() <= ILL_CONDITIONED_RELATIVE_PIVOT_EPSILON * norm {
            return Err(FitError::IllConditionedSystem {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            for col in 0..dimension {
                let upper = matrix[(pivot_col, col)];
                matrix[(pivot_col, col)] = matrix[(pivot_row, col)];
                matrix[(pivot_row, col)] = upper;
            }
            rhs.swap(pivot_col, pivot_row);
        }

        for row in (pivot_col + 1)..dimension {
            let multiplier = matrix[(row, pivot_col)] / pivot;
            for col in pivot_col..dimension {
                let updated = matrix[(row, col)] - multiplier * matrix[(pivot_col, col)];
                matrix[(row, col)] = updated;
            }
            rhs[row] -= multiplier * rhs[pivot_col];
        }
    }

    let mut solution = vec![0.0; dimension];
    for row in (0..dimension).rev() {
        let mut value = rhs[row];
        for col in (row + 1)..dimension {
            value -= matrix[(row, col)] * solution[col];
        }
        solution[row] = value / matrix[(row, row)];
    }

    Ok(solution)
}

fn infinity_norm(matrix: &DenseMatrix) -> f64 {
    (0..matrix.nrows())
        .map(|row| {
            (0..matrix.ncols())
                .map(|col| matrix[(row, col)].abs())
                .sum::<f64>()
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::{FitError, solve_least_squares};
    use crate::numerics::DenseMatrix;

    fn design_from_rows(rows: &[[f64; 2]]) -> DenseMatrix {
        let mut design = DenseMatrix::zeros(rows.len(), 2);
        for (index, row) in rows.iter().enumerate() {
            design[(index, 0)] = row[0];
            design[(index, 1)] = row[1];
        }
        design
    }

    #[test]
    fn straight_line_is_recovered_exactly() {
        // y = 2 + 3x on x = 0, 1, 2
        let design = design_from_rows(&[[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]]);
        let beta = solve_least_squares(&design, &[2.0, 5.0, 8.0]).expect("system is regular");

        assert!((beta[0] - 2.0).abs() < 1.0e-10);
        assert!((beta[1] - 3.0).abs() < 1.0e-10);
    }

    #[test]
    fn overdetermined_noisy_line_matches_closed_form() {
        let design = design_from_rows(&[[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]]);
        let beta =
            solve_least_squares(&design, &[1.0, 2.0, 2.0, 4.0]).expect("system is regular");

        // slope = Sxy / Sxx = 4.5 / 5, intercept = mean_y - slope * mean_x
        assert!((beta[1] - 0.9).abs() < 1.0e-12);
        assert!((beta[0] - (2.25 - 0.9 * 1.5)).abs() < 1.0e-12);
    }

    #[test]
    fn collinear_columns_are_rejected() {
        let design = design_from_rows(&[[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]]);
        let error = solve_least_squares(&design, &[1.0, 2.0, 3.0]).expect_err("rank deficient");
        assert!(matches!(
            error,
            FitError::SingularSystem { pivot_index: 1 }
                | FitError::IllConditionedSystem { pivot_index: 1 }
        ));
    }

    #[test]
    fn shape_and_value_problems_are_reported() {
        let design = design_from_rows(&[[1.0, 0.5]]);
        assert_eq!(
            solve_least_squares(&design, &[1.0]),
            Err(FitError::TooFewObservations {
                required: 2,
                actual: 1
            })
        );

        let design = design_from_rows(&[[1.0, 0.5], [1.0, 0.7]]);
        assert_eq!(
            solve_least_squares(&design, &[1.0]),
            Err(FitError::LengthMismatch {
                rows: 2,
                observations: 1
            })
        );
        assert_eq!(
            solve_least_squares(&design, &[1.0, f64::NAN]),
            Err(FitError::NonFiniteObservation { index: 1 })
        );
    }
}
