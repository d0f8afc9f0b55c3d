use super::control::parse_cell;
use super::fco::ResolutionTable;
use crate::common::ResolutionSource;
use crate::domain::{Reflection, TdsError, TdsResult};
use crate::modules::serialization::read_text_input;
use crate::numerics::ReciprocalMetric;
use std::path::Path;

/// Per-reflection sin(theta)/lambda, from a refinement's fco table or the cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionModel {
    Table(ResolutionTable),
    Cell(ReciprocalMetric),
}

impl ResolutionModel {
    pub fn from_master(master: &str) -> TdsResult<Self> {
        let cell = parse_cell(master)?;
        ReciprocalMetric::from_cell(&cell)
            .map(Self::Cell)
            .ok_or_else(|| {
                TdsError::input_validation(
                    "INPUT.MAS_CELL",
                    format!("CELL record {:?} does not describe a valid lattice", cell),
                )
            })
    }

    /// Loads the model for `source` from a stage's fco and master files.
    pub fn load(
        source: ResolutionSource,
        fco_path: &Path,
        master_path: &Path,
        fco_header_lines: usize,
    ) -> TdsResult<Self> {
        match source {
            ResolutionSource::Fco => {
                ResolutionTable::read(fco_path, fco_header_lines).map(Self::Table)
            }
            ResolutionSource::Cell => {
                Self::from_master(&read_text_input(master_path, "IO.MAS_READ")?)
            }
        }
    }

    /// `None` when the fco table has no accepted row for the reflection.
    pub fn resolution_of(&self, reflection: &Reflection) -> Option<f64> {
        let (h, k, l) = reflection.indices();
        match self {
            Self::Table(table) => table.get(h, k, l),
            Self::Cell(metric) => Some(metric.sin_theta_over_lambda(h, k, l)),
        }
    }
}
