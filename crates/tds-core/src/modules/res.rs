//! Scale factors from the refinement result file (`xd.res`).
//!
//! XD writes parameters in Fortran E notation and the scale factors come
//! last, so the final `count` such numbers in the file are taken.

use crate::domain::{ScaleFactorBin, TdsError, TdsResult};
use crate::modules::serialization::read_text_input;
use std::path::Path;

/// Every `d.dE+dd` number in `source`, in file order.
///
/// Numbers may be glued together without whitespace, as fixed-width
/// Fortran output often does, so the scan is character based.
pub fn fortran_exponent_values(source: &str) -> Vec<f64> {
    let bytes = source.as_bytes();
    let mut values = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }

        match match_exponent_number(bytes, index) {
            Some(end) => {
                if let Ok(value) = source[index..end].parse::<f64>() {
                    values.push(value);
                }
                index = end;
            }
            None => {
                while index < bytes.len() && bytes[index].is_ascii_digit() {
                    index += 1;
                }
            }
        }
    }

    values
}

fn match_exponent_number(bytes: &[u8], start: usize) -> Option<usize> {
    let digits = |from: usize| {
        let mut end = from;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        end
    };

    let mut cursor = digits(start);
    if bytes.get(cursor) != Some(&b'.') {
        return None;
    }
    let fraction_end = digits(cursor + 1);
    if fraction_end == cursor + 1 || bytes.get(fraction_end) != Some(&b'E') {
        return None;
    }
    cursor = fraction_end + 1;
    if !matches!(bytes.get(cursor), Some(b'+') | Some(b'-')) {
        return None;
    }
    cursor += 1;
    let exponent_end = cursor + 2;
    if exponent_end > bytes.len() || !bytes[cursor..exponent_end].iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(exponent_end)
}

/// Pairs the last `centers.len()` refined scale factors with their bin centers.
///
/// The refined values are amplitude scales K (F^2o = F^2c K^2), so they are
/// squared and normalized to the largest one before fitting.
pub fn extract_scale_factors(
    source: &str,
    centers: &[f64],
    origin: &str,
) -> TdsResult<Vec<ScaleFactorBin>> {
    let count = centers.len();
    let values = fortran_exponent_values(source);
    if count == 0 || values.len() < count {
        return Err(TdsError::computation(
            "RUN.RES_SCALE_COUNT",
            format!(
                "expected {} scale factors in '{}' but found {} E-format values",
                count,
                origin,
                values.len()
            ),
        ));
    }

    let squared = values[values.len() - count..]
        .iter()
        .map(|value| value * value)
        .collect::<Vec<_>>();
    let maximum = squared.iter().copied().fold(0.0, f64::max);
    if !(maximum.is_finite() && maximum > 0.0) {
        return Err(TdsError::computation(
            "RUN.RES_SCALE_VALUE",
            format!("scale factors in '{}' are all zero or non-finite", origin),
        ));
    }

    Ok(centers
        .iter()
        .zip(squared)
        .map(|(resolution, value)| ScaleFactorBin {
            resolution: *resolution,
            scale_factor: value / maximum,
        })
        .collect())
}

pub fn read_scale_factors(path: &Path, centers: &[f64]) -> TdsResult<Vec<ScaleFactorBin>> {
    let source = read_text_input(path, "IO.RES_READ")?;
    extract_scale_factors(&source, centers, &path.display().to_string())
}
