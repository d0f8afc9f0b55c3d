use crate::domain::{CorrectionCoefficients, ScaleFactorBin};
use crate::modules::artifacts::ChainEntry;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle: usize,
    pub coefficients: CorrectionCoefficients,
    /// Normalized scale factors the coefficients were fitted to.
    pub bins: Vec<ScaleFactorBin>,
    pub corrected: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub workdir: PathBuf,
    pub scale_count: usize,
    pub bin_centers: Vec<f64>,
    pub stages: Vec<ChainEntry>,
    pub cycles: Vec<CycleReport>,
    pub combined: CorrectionCoefficients,
    pub final_reflections: usize,
    pub manifest_path: PathBuf,
}

impl WorkflowReport {
    pub fn invocation_count(&self) -> usize {
        self.stages.len()
    }
}

pub fn render_human_summary(report: &WorkflowReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "TDS correction: {} refinements, {} scale factors, {} cycles",
        report.invocation_count(),
        report.scale_count,
        report.cycles.len()
    ));

    for stage in &report.stages {
        let files = if stage.files.is_empty() {
            "no files saved".to_string()
        } else {
            stage.files.join(" ")
        };
        lines.push(format!(
            "  {}.*  {} ({} scale factor{}): {}",
            stage.stem(),
            stage.label,
            stage.scale_count,
            if stage.scale_count == 1 { "" } else { "s" },
            files
        ));
    }

    for cycle in &report.cycles {
        lines.push(format!(
            "Cycle {}: {} ({} reflections corrected, {} dropped)",
            cycle.cycle, cycle.coefficients, cycle.corrected, cycle.dropped
        ));
    }

    lines.push(format!(
        "Combined correction: {} applied to {} reflections",
        report.combined, report.final_reflections
    ));
    lines.push(format!("Chain manifest: {}", report.manifest_path.display()));
    lines.join("\n")
}
