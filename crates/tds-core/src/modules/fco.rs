//! Calculated-structure-factor table (`xd.fco`) written by each refinement.
//!
//! After a fixed header the rows read `h k l F^2c F^2o sigma sin(theta)/lambda
//! flag ...`; a nonzero flag marks a reflection XD left out of the refinement.

use super::hkl::parse_integer_token;
use crate::domain::{ParserResult, TdsError, TdsResult};
use crate::modules::serialization::read_text_input;
use std::collections::HashMap;
use std::path::Path;

const FCO_MIN_COLUMNS: usize = 8;
const FCO_RESOLUTION_COLUMN: usize = 6;
const FCO_FLAG_COLUMN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FcoEntry {
    pub h: i32,
    pub k: i32,
    pub l: i32,
    pub resolution: f64,
    pub accepted: bool,
}

/// sin(theta)/lambda per Miller index for the reflections XD accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionTable {
    entries: HashMap<(i32, i32, i32), f64>,
    rejected: usize,
}

impl ResolutionTable {
    pub fn from_entries(entries: &[FcoEntry]) -> Self {
        let mut table = Self::default();
        for entry in entries {
            if entry.accepted {
                table
                    .entries
                    .entry((entry.h, entry.k, entry.l))
                    .or_insert(entry.resolution);
            } else {
                table.rejected += 1;
            }
        }
        table
    }

    pub fn read(path: &Path, header_lines: usize) -> TdsResult<Self> {
        let source = read_text_input(path, "IO.FCO_READ")?;
        let entries = parse_fco(&source, header_lines, &path.display().to_string())?;
        Ok(Self::from_entries(&entries))
    }

    pub fn get(&self, h: i32, k: i32, l: i32) -> Option<f64> {
        self.entries.get(&(h, k, l)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn max_resolution(&self) -> Option<f64> {
        self.entries.values().copied().reduce(f64::max)
    }
}

pub fn parse_fco(source: &str, header_lines: usize, origin: &str) -> ParserResult<Vec<FcoEntry>> {
    let mut entries = Vec::new();
    for (index, line) in source.lines().enumerate().skip(header_lines) {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < FCO_MIN_COLUMNS {
            return Err(TdsError::input_validation(
                "INPUT.FCO_COLUMNS",
                format!(
                    "fco row at {}:{} has {} columns, expected at least {}",
                    origin,
                    index + 1,
                    tokens.len(),
                    FCO_MIN_COLUMNS
                ),
            ));
        }

        let invalid = |column: usize| {
            TdsError::input_validation(
                "INPUT.FCO_VALUE",
                format!(
                    "invalid value '{}' in column {} at {}:{}",
                    tokens[column],
                    column + 1,
                    origin,
                    index + 1
                ),
            )
        };
        let h = parse_integer_token(tokens[0]).ok_or_else(|| invalid(0))?;
        let k = parse_integer_token(tokens[1]).ok_or_else(|| invalid(1))?;
        let l = parse_integer_token(tokens[2]).ok_or_else(|| invalid(2))?;
        let resolution = tokens[FCO_RESOLUTION_COLUMN]
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .ok_or_else(|| invalid(FCO_RESOLUTION_COLUMN))?;
        let flag = tokens[FCO_FLAG_COLUMN]
            .parse::<f64>()
            .map_err(|_| invalid(FCO_FLAG_COLUMN))?;

        entries.push(FcoEntry {
            h,
            k,
            l,
            resolution,
            accepted: flag == 0.0,
        });
    }

    if entries.is_empty() {
        return Err(TdsError::input_validation(
            "INPUT.FCO_EMPTY",
            format!("fco file '{}' contains no reflections", origin),
        ));
    }
    Ok(entries)
}
