use crate::common::constants::{CALCULATED_FILE, RESULT_FILE};
use crate::domain::{RefinementStage, TdsError, TdsResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Files a finished refinement leaves in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementOutcome {
    pub result_path: PathBuf,
    pub calculated_path: PathBuf,
}

impl RefinementOutcome {
    pub fn in_workdir(workdir: &Path) -> Self {
        Self {
            result_path: workdir.join(RESULT_FILE),
            calculated_path: workdir.join(CALCULATED_FILE),
        }
    }

    /// Fails unless both the result and the fco file exist.
    pub fn verified(workdir: &Path) -> TdsResult<Self> {
        let outcome = Self::in_workdir(workdir);
        for path in [&outcome.result_path, &outcome.calculated_path] {
            if !path.is_file() {
                return Err(TdsError::computation(
                    "RUN.XDLSM_OUTPUT",
                    format!("refinement did not produce '{}'", path.display()),
                ));
            }
        }
        Ok(outcome)
    }

    /// Removes the result and fco files a previous stage left behind, so
    /// only files written by the next invocation can satisfy [`Self::verified`].
    pub fn clear_previous(workdir: &Path) -> TdsResult<()> {
        let outcome = Self::in_workdir(workdir);
        for path in [&outcome.result_path, &outcome.calculated_path] {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed previous refinement output"),
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(TdsError::io_system(
                        "IO.XDLSM_CLEAR_OUTPUT",
                        format!("failed to remove '{}': {}", path.display(), error),
                    ));
                }
            }
        }
        Ok(())
    }
}

pub trait RefinementRunner {
    fn run(&self, workdir: &Path, stage: &RefinementStage) -> TdsResult<RefinementOutcome>;
}

impl<T> RefinementRunner for &T
where
    T: RefinementRunner + ?Sized,
{
    fn run(&self, workdir: &Path, stage: &RefinementStage) -> TdsResult<RefinementOutcome> {
        (**self).run(workdir, stage)
    }
}

/// Runs the external refinement program synchronously inside the workdir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RefinementRunner for ProcessRunner {
    fn run(&self, workdir: &Path, stage: &RefinementStage) -> TdsResult<RefinementOutcome> {
        debug!(
            program = %self.program.display(),
            workdir = %workdir.display(),
            stage = %stage.kind,
            scale_count = stage.scale_count,
            "starting refinement program"
        );
        RefinementOutcome::clear_previous(workdir)?;
        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(workdir)
            .status()
            .map_err(|source| {
                TdsError::io_system(
                    "IO.XDLSM_EXEC",
                    format!("failed to start '{}': {}", self.program.display(), source),
                )
            })?;

        if !status.success() {
            let reason = status
                .code()
                .map_or_else(|| "was terminated by a signal".to_string(), |code| {
                    format!("exited with status {}", code)
                });
            return Err(TdsError::computation(
                "RUN.XDLSM_EXIT",
                format!(
                    "'{}' {} during the {}",
                    self.program.display(),
                    reason,
                    stage.kind
                ),
            ));
        }

        RefinementOutcome::verified(workdir)
    }
}
