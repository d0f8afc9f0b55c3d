/// Lattice constants in Angstrom and degrees, as given by the `CELL` record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCell {
    pub const fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    fn direct_metric(&self) -> [[f64; 3]; 3] {
        let (ca, cb, cg) = (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        );
        [
            [self.a * self.a, self.a * self.b * cg, self.a * self.c * cb],
            [self.a * self.b * cg, self.b * self.b, self.b * self.c * ca],
            [self.a * self.c * cb, self.b * self.c * ca, self.c * self.c],
        ]
    }
}

/// Reciprocal metric tensor `G* = G^-1`, giving `1/d^2 = h^T G* h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReciprocalMetric {
    tensor: [[f64; 3]; 3],
}

impl ReciprocalMetric {
    /// Returns `None` when the cell has no positive volume.
    pub fn from_cell(cell: &UnitCell) -> Option<Self> {
        let g = cell.direct_metric();
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
            g[r0][c0] * g[r1][c1] - g[r0][c1] * g[r1][c0]
        };

        let adjugate = [
            [cofactor(1, 2, 1, 2), -cofactor(0, 2, 1, 2), cofactor(0, 1, 1, 2)],
            [-cofactor(1, 2, 0, 2), cofactor(0, 2, 0, 2), -cofactor(0, 1, 0, 2)],
            [cofactor(1, 2, 0, 1), -cofactor(0, 2, 0, 1), cofactor(0, 1, 0, 1)],
        ];
        let determinant =
            g[0][0] * adjugate[0][0] + g[0][1] * adjugate[1][0] + g[0][2] * adjugate[2][0];
        if !determinant.is_finite() || determinant <= 0.0 {
            return None;
        }

        let mut tensor = [[0.0; 3]; 3];
        for (row, values) in adjugate.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                tensor[row][col] = value / determinant;
            }
        }
        Some(Self { tensor })
    }

    pub fn inverse_d_squared(&self, h: i32, k: i32, l: i32) -> f64 {
        let v = [f64::from(h), f64::from(k), f64::from(l)];
        let mut sum = 0.0;
        for (row, values) in self.tensor.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                sum += v[row] * value * v[col];
            }
        }
        sum
    }

    /// sin(theta)/lambda = 1 / (2d).
    pub fn sin_theta_over_lambda(&self, h: i32, k: i32, l: i32) -> f64 {
        0.5 * self.inverse_d_squared(h, k, l).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::{ReciprocalMetric, UnitCell};

    #[test]
    fn cubic_cell_gives_textbook_resolution() {
        let metric = ReciprocalMetric::from_cell(&UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0))
            .expect("cubic cell is valid");

        assert!((metric.sin_theta_over_lambda(1, 0, 0) - 0.05).abs() < 1.0e-12);
        let expected = 0.5 * (3.0_f64).sqrt() / 10.0;
        assert!((metric.sin_theta_over_lambda(1, -1, 1) - expected).abs() < 1.0e-12);
        assert_eq!(metric.sin_theta_over_lambda(0, 0, 0), 0.0);
    }

    #[test]
    fn monoclinic_cell_matches_closed_form() {
        let (a, b, c, beta) = (7.5_f64, 9.0_f64, 11.0_f64, 104.0_f64);
        let metric = ReciprocalMetric::from_cell(&UnitCell::new(a, b, c, 90.0, beta, 90.0))
            .expect("monoclinic cell is valid");

        let (h, k, l) = (2, 3, -1);
        let (hf, kf, lf) = (2.0, 3.0, -1.0);
        let (sb, cb) = (beta.to_radians().sin(), beta.to_radians().cos());
        let inverse_d2 = (hf * hf / (a * a) + lf * lf / (c * c) - 2.0 * hf * lf * cb / (a * c))
            / (sb * sb)
            + kf * kf / (b * b);

        assert!((metric.inverse_d_squared(h, k, l) - inverse_d2).abs() < 1.0e-12);
    }

    #[test]
    fn flat_cells_are_rejected() {
        assert!(
            ReciprocalMetric::from_cell(&UnitCell::new(5.0, 5.0, 5.0, 90.0, 90.0, 180.0))
                .is_none()
        );
        assert!(
            ReciprocalMetric::from_cell(&UnitCell::new(0.0, 5.0, 5.0, 90.0, 90.0, 90.0)).is_none()
        );
    }
}
