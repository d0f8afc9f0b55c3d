mod commands;
mod helpers;

use clap::Parser;
use tds_core::domain::TdsError;

pub fn run_from_env() -> i32 {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let tds_error = error.as_tds_error();
            eprintln!("{}", tds_error.diagnostic_line());
            eprintln!("{}", tds_error.fatal_exit_line());
            tds_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("xdtds".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "xdtds",
    version,
    about = "Iterative TDS scale-factor correction driver for XD refinements"
)]
struct Cli {
    /// Log file-level details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run the full correction workflow in a working directory
    Run(commands::RunArgs),
    /// Apply given TDS coefficients to a reflection file
    Apply(commands::ApplyArgs),
    /// Assign resolution-binned batch numbers and write xd_scaled.hkl
    Bin(commands::BinArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_workflow_command(args),
        CliCommand::Apply(args) => commands::run_apply_command(args),
        CliCommand::Bin(args) => commands::run_bin_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(TdsError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TdsError> for CliError {
    fn from(error: TdsError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_tds_error(&self) -> TdsError {
        match self {
            Self::Usage(message) => TdsError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => TdsError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
