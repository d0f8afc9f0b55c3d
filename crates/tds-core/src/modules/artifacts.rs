//! Versioned record of every refinement stage: numbered `xdNN.*` copies plus
//! the `xd-tds-chain.json` manifest describing them.

use crate::common::constants::{CHAIN_MANIFEST_FILE, XD_STEM};
use crate::domain::{CorrectionCoefficients, RefinementStage, StageKind, TdsError, TdsResult};
use crate::modules::serialization::write_text_output;
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_SNAPSHOT_INDEX: usize = 99;
const SNAPSHOT_GLOB: &str = "xd[0-9][0-9].hkl";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    /// Snapshot number; `None` for the final stage, which stays as `xd.*`.
    pub index: Option<usize>,
    pub label: String,
    pub stage: StageKind,
    pub scale_count: usize,
    pub files: Vec<String>,
    pub coefficients: Option<CorrectionCoefficients>,
}

impl ChainEntry {
    pub fn stem(&self) -> String {
        match self.index {
            Some(index) => snapshot_stem(index),
            None => XD_STEM.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainManifest<'a> {
    workdir: String,
    first_index: usize,
    entries: &'a [ChainEntry],
}

#[derive(Debug, Clone)]
pub struct ArtifactChain {
    workdir: PathBuf,
    extensions: Vec<String>,
    first_index: usize,
    entries: Vec<ChainEntry>,
}

pub fn snapshot_stem(index: usize) -> String {
    format!("{}{:02}", XD_STEM, index)
}

fn snapshot_matcher() -> TdsResult<GlobMatcher> {
    Glob::new(SNAPSHOT_GLOB)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| {
            TdsError::internal(
                "INTERNAL.SNAPSHOT_GLOB",
                format!("invalid snapshot pattern '{}': {}", SNAPSHOT_GLOB, source),
            )
        })
}

/// Number of `xdNN.hkl` snapshots already present in `workdir`.
pub fn count_existing_snapshots(workdir: &Path) -> TdsResult<usize> {
    let matcher = snapshot_matcher()?;
    let entries = fs::read_dir(workdir).map_err(|source| {
        TdsError::io_system(
            "IO.WORKDIR_READ",
            format!("failed to list '{}': {}", workdir.display(), source),
        )
    })?;

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|source| {
            TdsError::io_system(
                "IO.WORKDIR_READ",
                format!("failed to list '{}': {}", workdir.display(), source),
            )
        })?;
        if matcher.is_match(entry.file_name()) {
            count += 1;
        }
    }
    Ok(count)
}

impl ArtifactChain {
    /// Starts numbering after the snapshots a previous run left behind.
    pub fn open(workdir: &Path, extensions: &[String]) -> TdsResult<Self> {
        let first_index = count_existing_snapshots(workdir)?;
        debug!(first_index, workdir = %workdir.display(), "opened artifact chain");
        Ok(Self {
            workdir: workdir.to_path_buf(),
            extensions: extensions.to_vec(),
            first_index,
            entries: Vec::new(),
        })
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn path_of(&self, entry: &ChainEntry, extension: &str) -> PathBuf {
        self.workdir.join(format!("{}.{}", entry.stem(), extension))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.workdir.join(CHAIN_MANIFEST_FILE)
    }

    fn working_path(&self, extension: &str) -> PathBuf {
        self.workdir.join(format!("{}.{}", XD_STEM, extension))
    }

    /// Copies the current `xd.*` files to the next `xdNN.*` set.
    pub fn snapshot(
        &mut self,
        stage: &RefinementStage,
        coefficients: Option<CorrectionCoefficients>,
    ) -> TdsResult<&ChainEntry> {
        let index = self.first_index + self.entries.len();
        if index > MAX_SNAPSHOT_INDEX {
            return Err(TdsError::io_system(
                "IO.SNAPSHOT_LIMIT",
                format!(
                    "snapshot number {} exceeds two digits; move earlier xdNN files away",
                    index
                ),
            ));
        }

        let stem = snapshot_stem(index);
        let mut files = Vec::with_capacity(self.extensions.len());
        for extension in &self.extensions {
            let source = self.working_path(extension);
            if !source.is_file() {
                continue;
            }
            let name = format!("{}.{}", stem, extension);
            let target = self.workdir.join(&name);
            fs::copy(&source, &target).map_err(|error| {
                TdsError::io_system(
                    "IO.SNAPSHOT_COPY",
                    format!(
                        "failed to copy '{}' to '{}': {}",
                        source.display(),
                        target.display(),
                        error
                    ),
                )
            })?;
            files.push(name);
        }
        debug!(snapshot = %stem, files = files.len(), "saved stage snapshot");

        Ok(self.push(Some(index), stage, files, coefficients))
    }

    /// Records the final stage, whose artifacts stay as the unnumbered set.
    pub fn record_final(
        &mut self,
        stage: &RefinementStage,
        coefficients: Option<CorrectionCoefficients>,
    ) -> &ChainEntry {
        let files = self
            .extensions
            .iter()
            .filter(|extension| self.working_path(extension).is_file())
            .map(|extension| format!("{}.{}", XD_STEM, extension))
            .collect();
        self.push(None, stage, files, coefficients)
    }

    fn push(
        &mut self,
        index: Option<usize>,
        stage: &RefinementStage,
        files: Vec<String>,
        coefficients: Option<CorrectionCoefficients>,
    ) -> &ChainEntry {
        let position = self.entries.len();
        self.entries.push(ChainEntry {
            index,
            label: stage.kind.label(),
            stage: stage.kind,
            scale_count: stage.scale_count,
            files,
            coefficients,
        });
        &self.entries[position]
    }

    pub fn write_manifest(&self) -> TdsResult<PathBuf> {
        let manifest = ChainManifest {
            workdir: self.workdir.to_string_lossy().replace('\\', "/"),
            first_index: self.first_index,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|source| {
            TdsError::internal(
                "INTERNAL.CHAIN_SERIALIZE",
                format!("failed to serialize artifact chain: {}", source),
            )
        })?;
        let path = self.manifest_path();
        write_text_output(&path, &json, "IO.CHAIN_WRITE")?;
        Ok(path)
    }
}
