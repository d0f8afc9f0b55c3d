pub mod errors;

pub use errors::{ParserResult, TdsError, TdsErrorCategory, TdsResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "cycle")]
pub enum StageKind {
    /// Single scale factor, uncorrected data.
    Baseline,
    /// First resolution-binned refinement.
    Initial,
    /// Refinement after the correction of the given (1-based) cycle.
    Cycle(usize),
    /// Single scale factor on the combined-corrected data.
    Final,
}

impl StageKind {
    pub fn label(self) -> String {
        match self {
            Self::Baseline => "initial 1 scale factor refinement".to_string(),
            Self::Initial => "initial resolution-binned refinement".to_string(),
            Self::Cycle(cycle) => format!("correction cycle {cycle}"),
            Self::Final => "final 1 scale factor refinement".to_string(),
        }
    }

    pub const fn is_single_scale(self) -> bool {
        matches!(self, Self::Baseline | Self::Final)
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// One invocation of the refinement program as seen by a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefinementStage {
    pub kind: StageKind,
    pub scale_count: usize,
}

impl RefinementStage {
    pub fn new(kind: StageKind, binned_scale_count: usize) -> Self {
        let scale_count = if kind.is_single_scale() {
            1
        } else {
            binned_scale_count
        };
        Self { kind, scale_count }
    }
}

/// One measured reflection of an XD `.hkl` file.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub h: i32,
    pub k: i32,
    pub l: i32,
    pub batch: i32,
    pub intensity: f64,
    pub sigma: f64,
    /// Columns past sigma, kept as written.
    pub extra: Vec<String>,
}

impl Reflection {
    pub const fn indices(&self) -> (i32, i32, i32) {
        (self.h, self.k, self.l)
    }
}

/// A refined scale factor paired with the sin(theta)/lambda center of its bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleFactorBin {
    pub resolution: f64,
    pub scale_factor: f64,
}

/// Coefficients of `alpha(x) = a*x^2 + b*x^3` with `x = sin(theta)/lambda`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrectionCoefficients {
    pub a: f64,
    pub b: f64,
}

impl CorrectionCoefficients {
    pub const fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub fn alpha(&self, x: f64) -> f64 {
        let x2 = x * x;
        self.a * x2 + self.b * x2 * x
    }

    /// Multiplicative scale the model predicts at `x`; intensities are divided by it.
    pub fn factor(&self, x: f64) -> f64 {
        1.0 + self.alpha(x)
    }
}

impl Add for CorrectionCoefficients {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.a + rhs.a, self.b + rhs.b)
    }
}

impl AddAssign for CorrectionCoefficients {
    fn add_assign(&mut self, rhs: Self) {
        self.a += rhs.a;
        self.b += rhs.b;
    }
}

impl Display for CorrectionCoefficients {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "a={:.3}, b={:.3}", self.a, self.b)
    }
}
