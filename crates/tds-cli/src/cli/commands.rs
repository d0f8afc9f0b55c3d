use super::CliError;
use super::helpers::{in_workdir, load_config, resolve_workdir};
use std::path::{Path, PathBuf};
use tds_core::common::constants::{CALCULATED_FILE, MASTER_FILE, REFLECTION_FILE};
use tds_core::common::{ResolutionSource, TdsConfig};
use tds_core::domain::CorrectionCoefficients;
use tds_core::modules::{
    ProcessRunner, ReflectionFile, ResolutionModel, TdsWorkflow, apply_correction,
    render_human_summary, write_scaled_reflections,
};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct ConfigFlags {
    /// JSON configuration file (camelCase keys)
    #[arg(long, value_name = "path")]
    config: Option<PathBuf>,

    /// Directory holding xd.mas, xd.inp and xd.hkl [default: current directory]
    #[arg(long, value_name = "dir")]
    workdir: Option<PathBuf>,

    /// Number of resolution-binned scale factors
    #[arg(long, value_name = "n")]
    scale_count: Option<usize>,

    /// Header lines before the first xd.fco row
    #[arg(long, value_name = "n")]
    fco_header_lines: Option<usize>,
}

impl ConfigFlags {
    fn resolve(&self) -> Result<(PathBuf, TdsConfig), CliError> {
        let workdir = resolve_workdir(self.workdir.clone())?;
        let mut config = load_config(self.config.as_deref())?;
        if let Some(scale_count) = self.scale_count {
            config.scale_count = scale_count;
        }
        if let Some(lines) = self.fco_header_lines {
            config.fco_header_lines = lines;
        }
        Ok((workdir, config))
    }
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    #[command(flatten)]
    common: ConfigFlags,

    /// Refinement program [default: xdlsm]
    #[arg(long, value_name = "path")]
    program: Option<PathBuf>,

    /// Extra argument passed to the refinement program (repeatable)
    #[arg(long = "program-arg", value_name = "arg", allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Number of fit-and-correct cycles
    #[arg(long, value_name = "n")]
    cycles: Option<usize>,

    /// Source of each reflection's sin(theta)/lambda
    #[arg(long, value_name = "fco|cell")]
    resolution_source: Option<ResolutionSource>,

    /// Leave bins centered above this sin(theta)/lambda out of the fit
    #[arg(long, value_name = "x")]
    max_fit_resolution: Option<f64>,
}

#[derive(clap::Args)]
pub(super) struct ApplyArgs {
    #[command(flatten)]
    common: ConfigFlags,

    /// Coefficient of the x^2 term
    #[arg(long, allow_hyphen_values = true)]
    a: f64,

    /// Coefficient of the x^3 term
    #[arg(long, allow_hyphen_values = true)]
    b: f64,

    /// Source of each reflection's sin(theta)/lambda
    #[arg(long, value_name = "fco|cell")]
    resolution_source: Option<ResolutionSource>,

    /// Reflection file to correct [default: xd.hkl]
    #[arg(long, value_name = "path")]
    input: Option<PathBuf>,

    /// Corrected output [default: overwrite the input]
    #[arg(long, value_name = "path")]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct BinArgs {
    #[command(flatten)]
    common: ConfigFlags,
}

pub(super) fn run_workflow_command(args: RunArgs) -> Result<i32, CliError> {
    let (workdir, mut config) = args.common.resolve()?;
    if let Some(program) = args.program {
        config.program_path = program;
    }
    if !args.program_args.is_empty() {
        config.program_args = args.program_args;
    }
    if let Some(cycles) = args.cycles {
        config.cycles = cycles;
    }
    if let Some(source) = args.resolution_source {
        config.resolution_source = source;
    }
    if args.max_fit_resolution.is_some() {
        config.max_fit_resolution = args.max_fit_resolution;
    }

    let runner = ProcessRunner::new(config.program_path.clone(), config.program_args.clone());
    info!(
        workdir = %workdir.display(),
        program = %runner.program().display(),
        scale_count = config.scale_count,
        cycles = config.cycles,
        resolution_source = %config.resolution_source,
        "starting TDS correction"
    );
    let report = TdsWorkflow::new(workdir, config, runner)?.run()?;
    println!("{}", render_human_summary(&report));
    Ok(0)
}

pub(super) fn run_apply_command(args: ApplyArgs) -> Result<i32, CliError> {
    let (workdir, mut config) = args.common.resolve()?;
    if let Some(source) = args.resolution_source {
        config.resolution_source = source;
    }
    config.validate()?;

    let input = in_workdir(
        &workdir,
        args.input.as_deref().unwrap_or(Path::new(REFLECTION_FILE)),
    );
    let output = args
        .output
        .as_deref()
        .map_or_else(|| input.clone(), |path| in_workdir(&workdir, path));

    let model = ResolutionModel::load(
        config.resolution_source,
        &workdir.join(CALCULATED_FILE),
        &workdir.join(MASTER_FILE),
        config.fco_header_lines,
    )?;
    let mut file = ReflectionFile::read(&input)?;
    let coefficients = CorrectionCoefficients::new(args.a, args.b);
    let summary = apply_correction(&mut file, &model, coefficients)?;
    file.write(&output)?;

    println!(
        "Applied TDS correction {} to {} reflections ({} dropped)",
        coefficients, summary.corrected, summary.dropped
    );
    println!("Corrected reflections: {}", output.display());
    Ok(0)
}

pub(super) fn run_bin_command(args: BinArgs) -> Result<i32, CliError> {
    let (workdir, config) = args.common.resolve()?;
    config.validate()?;

    let report = write_scaled_reflections(&workdir, config.scale_count, config.fco_header_lines)?;
    println!(
        "Assigned {} reflections to {} resolution bins up to sin(theta)/lambda {:.4}",
        report.reflections, report.scale_count, report.max_resolution
    );
    match report.fco_max_resolution {
        Some(fco) if report.fco_disagrees() => println!(
            "WARNING: {} maximum sin(theta)/lambda {:.4} differs from the cell value",
            CALCULATED_FILE, fco
        ),
        Some(_) => println!("{} maximum sin(theta)/lambda agrees", CALCULATED_FILE),
        None => println!("{} not found, skipping consistency check", CALCULATED_FILE),
    }
    println!("Binned reflections: {}", report.output_path.display());
    Ok(0)
}
