//! The iterative TDS correction run.
//!
//! Stage order is fixed: a 1-scale baseline refinement, the first
//! resolution-binned refinement, one binned refinement per correction cycle,
//! and a final 1-scale refinement on data corrected once with the summed
//! coefficients. Each stage except the last is snapshotted as `xdNN.*`.

mod report;

pub use report::{CycleReport, WorkflowReport, render_human_summary};

use super::artifacts::{ArtifactChain, ChainEntry};
use super::control::{binned_instructions, set_master_scale_flags};
use super::correction::{CorrectionSummary, apply_correction, fit_correction};
use super::hkl::ReflectionFile;
use super::res::read_scale_factors;
use super::resolution::ResolutionModel;
use super::runner::{RefinementOutcome, RefinementRunner};
use super::scaling::{BinRange, assign_resolution_batches};
use crate::common::constants::{INSTRUCTION_FILE, MASTER_FILE, REFLECTION_FILE};
use crate::common::{ResolutionSource, TdsConfig};
use crate::domain::{CorrectionCoefficients, RefinementStage, StageKind, TdsError, TdsResult};
use crate::modules::serialization::{read_text_input, write_text_output};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Control files rewritten for the binned stages, prepared before anything runs.
#[derive(Debug, Clone)]
struct BinnedControlFiles {
    master: String,
    instructions: String,
}

#[derive(Debug)]
pub struct TdsWorkflow<R> {
    workdir: PathBuf,
    config: TdsConfig,
    runner: R,
}

impl<R> TdsWorkflow<R>
where
    R: RefinementRunner,
{
    pub fn new(workdir: impl Into<PathBuf>, config: TdsConfig, runner: R) -> TdsResult<Self> {
        config.validate()?;
        Ok(Self {
            workdir: workdir.into(),
            config,
            runner,
        })
    }

    fn working_path(&self, name: &str) -> PathBuf {
        self.workdir.join(name)
    }

    pub fn run(&self) -> TdsResult<WorkflowReport> {
        let binned = self.preflight()?;
        let mut chain = ArtifactChain::open(&self.workdir, &self.config.saved_extensions)?;
        let hkl_path = self.working_path(REFLECTION_FILE);

        let (stage, outcome) = self.refine(StageKind::Baseline)?;
        let baseline = chain.snapshot(&stage, None)?.clone();
        chain.write_manifest()?;

        let model =
            self.resolution_model(&outcome.calculated_path, &self.working_path(MASTER_FILE))?;
        let mut working = ReflectionFile::read(&hkl_path)?;
        let assignment = assign_resolution_batches(
            &mut working,
            &model,
            self.config.scale_count,
            BinRange::Observed,
        )?;
        if assignment.dropped > 0 {
            warn!(
                dropped = assignment.dropped,
                "reflections without a known resolution were left out of the binned data"
            );
        }
        working.write(&hkl_path)?;
        write_text_output(
            &self.working_path(INSTRUCTION_FILE),
            &binned.instructions,
            "IO.INP_WRITE",
        )?;
        write_text_output(&self.working_path(MASTER_FILE), &binned.master, "IO.MAS_WRITE")?;
        let bin_centers = assignment.bins.centers();

        let (stage, mut outcome) = self.refine(StageKind::Initial)?;
        chain.snapshot(&stage, None)?;
        chain.write_manifest()?;

        let mut combined = CorrectionCoefficients::default();
        let mut cycles = Vec::with_capacity(self.config.cycles);
        for cycle in 1..=self.config.cycles {
            let bins = read_scale_factors(&outcome.result_path, &bin_centers)?;
            let coefficients = fit_correction(&bins, self.config.max_fit_resolution)?;

            let model =
                self.resolution_model(&outcome.calculated_path, &self.working_path(MASTER_FILE))?;
            let mut working = ReflectionFile::read(&hkl_path)?;
            let summary = apply_correction(&mut working, &model, coefficients)?;
            working.write(&hkl_path)?;
            info!(
                cycle,
                a = coefficients.a,
                b = coefficients.b,
                corrected = summary.corrected,
                dropped = summary.dropped,
                "applied TDS correction"
            );

            let (stage, next) = self.refine(StageKind::Cycle(cycle))?;
            chain.snapshot(&stage, Some(coefficients))?;
            chain.write_manifest()?;
            outcome = next;

            combined += coefficients;
            cycles.push(CycleReport {
                cycle,
                coefficients,
                bins,
                corrected: summary.corrected,
                dropped: summary.dropped,
            });
        }

        let final_summary = self.write_combined_correction(&chain, &baseline, combined)?;
        info!(
            a = combined.a,
            b = combined.b,
            corrected = final_summary.corrected,
            "wrote combined TDS correction"
        );
        let (stage, _) = self.refine(StageKind::Final)?;
        chain.record_final(&stage, Some(combined));
        let manifest_path = chain.write_manifest()?;

        Ok(WorkflowReport {
            workdir: self.workdir.clone(),
            scale_count: self.config.scale_count,
            bin_centers,
            stages: chain.entries().to_vec(),
            cycles,
            combined,
            final_reflections: final_summary.corrected,
            manifest_path,
        })
    }

    /// Everything that can be checked without running the refinement program.
    fn preflight(&self) -> TdsResult<BinnedControlFiles> {
        if !self.workdir.is_dir() {
            return Err(TdsError::input_validation(
                "INPUT.WORKDIR",
                format!("working directory '{}' does not exist", self.workdir.display()),
            ));
        }
        for name in [MASTER_FILE, INSTRUCTION_FILE, REFLECTION_FILE] {
            if !self.working_path(name).is_file() {
                return Err(TdsError::input_validation(
                    "INPUT.WORKDIR_FILE",
                    format!("'{}' is missing from '{}'", name, self.workdir.display()),
                ));
            }
        }

        // Parsing enforces the six-column minimum on every data row.
        ReflectionFile::read(&self.working_path(REFLECTION_FILE))?;

        let master = read_text_input(&self.working_path(MASTER_FILE), "IO.MAS_READ")?;
        let instructions = read_text_input(&self.working_path(INSTRUCTION_FILE), "IO.INP_READ")?;
        if self.config.resolution_source == ResolutionSource::Cell {
            ResolutionModel::from_master(&master)?;
        }

        Ok(BinnedControlFiles {
            master: set_master_scale_flags(&master, self.config.scale_count)?,
            instructions: binned_instructions(&instructions, self.config.scale_count)?,
        })
    }

    fn refine(&self, kind: StageKind) -> TdsResult<(RefinementStage, RefinementOutcome)> {
        let stage = RefinementStage::new(kind, self.config.scale_count);
        info!(
            stage = %kind,
            scale_count = stage.scale_count,
            "running refinement"
        );
        let outcome = self.runner.run(&self.workdir, &stage)?;
        Ok((stage, outcome))
    }

    fn resolution_model(&self, fco_path: &Path, master_path: &Path) -> TdsResult<ResolutionModel> {
        ResolutionModel::load(
            self.config.resolution_source,
            fco_path,
            master_path,
            self.config.fco_header_lines,
        )
    }

    /// Corrects the baseline reflections once with `combined` and restores
    /// the baseline 1-scale control files.
    fn write_combined_correction(
        &self,
        chain: &ArtifactChain,
        baseline: &ChainEntry,
        combined: CorrectionCoefficients,
    ) -> TdsResult<CorrectionSummary> {
        let model = self.resolution_model(
            &chain.path_of(baseline, "fco"),
            &chain.path_of(baseline, "mas"),
        )?;
        let mut original = ReflectionFile::read(&chain.path_of(baseline, "hkl"))?;
        let summary = apply_correction(&mut original, &model, combined)?;
        original.write(&self.working_path(REFLECTION_FILE))?;

        for (extension, name) in [("mas", MASTER_FILE), ("inp", INSTRUCTION_FILE)] {
            let source = chain.path_of(baseline, extension);
            let target = self.working_path(name);
            fs::copy(&source, &target).map_err(|error| {
                TdsError::io_system(
                    "IO.RESTORE_COPY",
                    format!(
                        "failed to restore '{}' from '{}': {}",
                        target.display(),
                        source.display(),
                        error
                    ),
                )
            })?;
        }
        Ok(summary)
    }
}
