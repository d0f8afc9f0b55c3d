use super::CliError;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tds_core::common::TdsConfig;
use tds_core::domain::{TdsError, TdsResult};
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
pub(super) fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second call within the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn current_working_dir() -> TdsResult<PathBuf> {
    std::env::current_dir().map_err(|source| {
        TdsError::io_system(
            "IO.CLI_CURRENT_DIR",
            format!("failed to read current working directory: {}", source),
        )
    })
}

pub(super) fn resolve_workdir(workdir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match workdir {
        Some(path) => Ok(path),
        None => current_working_dir().map_err(CliError::Compute),
    }
}

/// Reads `path` if given, otherwise starts from the defaults. Flags are
/// overlaid by the caller and validated afterwards.
pub(super) fn load_config(path: Option<&Path>) -> Result<TdsConfig, CliError> {
    let Some(path) = path else {
        return Ok(TdsConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration '{}'", path.display()))?;
    TdsConfig::from_json_str(&content).map_err(CliError::Compute)
}

/// Resolves `path` against `workdir` unless it is absolute.
pub(super) fn in_workdir(workdir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}
