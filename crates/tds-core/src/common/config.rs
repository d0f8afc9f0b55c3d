//! Runtime configuration of the correction workflow.
//!
//! Every value that used to be edited into the driver script (program
//! location, number of scale factors, number of cycles) is an explicit,
//! validated field here. Configs load from camelCase JSON and fall back to
//! the documented defaults for missing fields.

use super::constants::{
    DEFAULT_CYCLES, DEFAULT_FCO_HEADER_LINES, DEFAULT_PROGRAM, DEFAULT_SAVED_EXTENSIONS,
    DEFAULT_SCALE_COUNT, REQUIRED_SAVED_EXTENSIONS,
};
use crate::domain::{TdsError, TdsResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Where each reflection's sin(theta)/lambda comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Read from the refinement's `xd.fco`; reflections XD rejected are dropped.
    #[default]
    Fco,
    /// Computed from the `CELL` record of `xd.mas`; every reflection is kept.
    Cell,
}

impl ResolutionSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fco => "fco",
            Self::Cell => "cell",
        }
    }
}

impl Display for ResolutionSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for ResolutionSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "fco" => Ok(Self::Fco),
            "cell" => Ok(Self::Cell),
            other => Err(format!(
                "unknown resolution source '{}'; expected 'fco' or 'cell'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TdsConfig {
    /// Refinement executable, resolved through `PATH` when not absolute.
    pub program_path: PathBuf,
    pub program_args: Vec<String>,
    /// Number of resolution bins, each with its own refined scale factor.
    pub scale_count: usize,
    /// Number of fit-and-correct iterations.
    pub cycles: usize,
    pub saved_extensions: Vec<String>,
    pub resolution_source: ResolutionSource,
    /// Bins centered above this sin(theta)/lambda are left out of the fit.
    pub max_fit_resolution: Option<f64>,
    pub fco_header_lines: usize,
}

impl Default for TdsConfig {
    fn default() -> Self {
        Self {
            program_path: PathBuf::from(DEFAULT_PROGRAM),
            program_args: Vec::new(),
            scale_count: DEFAULT_SCALE_COUNT,
            cycles: DEFAULT_CYCLES,
            saved_extensions: DEFAULT_SAVED_EXTENSIONS
                .iter()
                .map(|extension| extension.to_string())
                .collect(),
            resolution_source: ResolutionSource::default(),
            max_fit_resolution: None,
            fco_header_lines: DEFAULT_FCO_HEADER_LINES,
        }
    }
}

impl TdsConfig {
    pub fn from_json_str(source: &str) -> TdsResult<Self> {
        let config: Self = serde_json::from_str(source).map_err(|source| {
            TdsError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("failed to parse configuration JSON: {}", source),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TdsResult<()> {
        if self.program_path.as_os_str().is_empty() {
            return Err(TdsError::input_validation(
                "INPUT.CONFIG_PROGRAM",
                "refinement program path must not be empty",
            ));
        }

        if self.scale_count < 2 {
            return Err(TdsError::input_validation(
                "INPUT.CONFIG_SCALE_COUNT",
                format!(
                    "scale factor count must be at least 2 to fit two coefficients, got {}",
                    self.scale_count
                ),
            ));
        }

        for required in REQUIRED_SAVED_EXTENSIONS {
            if !self
                .saved_extensions
                .iter()
                .any(|extension| extension == required)
            {
                return Err(TdsError::input_validation(
                    "INPUT.CONFIG_EXTENSIONS",
                    format!(
                        "saved extensions must include '{}' (got [{}])",
                        required,
                        self.saved_extensions.join(", ")
                    ),
                ));
            }
        }

        if let Some(limit) = self.max_fit_resolution {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(TdsError::input_validation(
                    "INPUT.CONFIG_FIT_RESOLUTION",
                    format!("maximum fit resolution must be positive, got {}", limit),
                ));
            }
        }

        Ok(())
    }
}
