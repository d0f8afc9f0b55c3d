//! Resolution-binned batch numbers: every reflection gets the scale-factor
//! slot of its sin(theta)/lambda.

use super::fco::ResolutionTable;
use super::hkl::ReflectionFile;
use super::resolution::ResolutionModel;
use crate::common::constants::{
    CALCULATED_FILE, MASTER_FILE, REFLECTION_FILE, SCALED_REFLECTION_FILE,
};
use crate::domain::{TdsError, TdsResult};
use crate::modules::serialization::read_text_input;
use crate::numerics::{ResolutionBins, max_finite, min_finite};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FCO_MAXIMUM_TOLERANCE: f64 = 1.0e-4;

/// Range the equal-width bins are laid over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinRange {
    /// Smallest to largest resolution present in the data.
    Observed,
    /// Zero to the largest resolution present in the data.
    FromOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchAssignment {
    pub bins: ResolutionBins,
    /// Reflections removed because their resolution is unknown.
    pub dropped: usize,
}

pub fn assign_resolution_batches(
    file: &mut ReflectionFile,
    model: &ResolutionModel,
    count: usize,
    range: BinRange,
) -> TdsResult<BatchAssignment> {
    let before = file.reflections.len();
    let mut located = Vec::with_capacity(before);
    for (index, reflection) in file.reflections.drain(..).enumerate() {
        if let Some(x) = model.resolution_of(&reflection) {
            located.push((index, reflection, x));
        }
    }

    let resolutions = located.iter().map(|(_, _, x)| *x).collect::<Vec<_>>();
    let upper = max_finite(&resolutions);
    let lower = match range {
        BinRange::Observed => min_finite(&resolutions),
        BinRange::FromOrigin => upper.map(|_| 0.0),
    };
    let bins = lower
        .zip(upper)
        .and_then(|(lower, upper)| ResolutionBins::spanning(lower, upper, count))
        .ok_or_else(|| {
            TdsError::computation(
                "RUN.BIN_RANGE",
                format!(
                    "cannot split the resolution range of {} reflections into {} bins",
                    located.len(),
                    count
                ),
            )
        })?;

    file.replace_reflections(
        located
            .into_iter()
            .map(|(index, mut reflection, x)| {
                reflection.batch = bins.batch_of(x);
                (index, reflection)
            })
            .collect(),
    );

    let dropped = before - file.reflections.len();
    debug!(
        bins = count,
        lower = bins.lower(),
        upper = bins.upper(),
        dropped,
        "assigned resolution batches"
    );
    Ok(BatchAssignment { bins, dropped })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledReflectionReport {
    pub output_path: PathBuf,
    pub reflections: usize,
    pub scale_count: usize,
    pub max_resolution: f64,
    /// Largest accepted sin(theta)/lambda in `xd.fco`, when that file exists.
    pub fco_max_resolution: Option<f64>,
}

impl ScaledReflectionReport {
    pub fn fco_disagrees(&self) -> bool {
        self.fco_max_resolution
            .is_some_and(|fco| (fco - self.max_resolution).abs() > FCO_MAXIMUM_TOLERANCE)
    }
}

/// Writes `xd_scaled.hkl` with batches over `[0, max]` computed from the cell
/// of `xd.mas`. An existing `xd.fco` is only used as a cross-check.
pub fn write_scaled_reflections(
    workdir: &Path,
    count: usize,
    fco_header_lines: usize,
) -> TdsResult<ScaledReflectionReport> {
    let master = read_text_input(&workdir.join(MASTER_FILE), "IO.MAS_READ")?;
    let model = ResolutionModel::from_master(&master)?;
    let mut file = ReflectionFile::read(&workdir.join(REFLECTION_FILE))?;
    let assignment = assign_resolution_batches(&mut file, &model, count, BinRange::FromOrigin)?;

    let output_path = workdir.join(SCALED_REFLECTION_FILE);
    file.write(&output_path)?;

    let fco_path = workdir.join(CALCULATED_FILE);
    let fco_max_resolution = if fco_path.is_file() {
        ResolutionTable::read(&fco_path, fco_header_lines)?.max_resolution()
    } else {
        None
    };

    let report = ScaledReflectionReport {
        output_path,
        reflections: file.reflections.len(),
        scale_count: count,
        max_resolution: assignment.bins.upper(),
        fco_max_resolution,
    };
    if report.fco_disagrees() {
        warn!(
            computed = report.max_resolution,
            fco = report.fco_max_resolution,
            "maximum sin(theta)/lambda from the cell differs from {}",
            CALCULATED_FILE
        );
    }
    Ok(report)
}
