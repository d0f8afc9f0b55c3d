//! Edits to the XD master (`xd.mas`) and instruction (`xd.inp`) files that
//! switch a single-scale model to resolution-binned scale factors.

use crate::common::constants::{SCALE_VALUES_PER_LINE, USAGE_SCALE_COUNT_INDEX};
use crate::domain::{TdsError, TdsResult};
use crate::numerics::UnitCell;

/// Byte spans of whitespace-separated tokens.
fn token_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (index, ch) in line.char_indices() {
        match (ch.is_whitespace(), start) {
            (false, None) => start = Some(index),
            (true, Some(from)) => {
                spans.push((from, index));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(from) = start {
        spans.push((from, line.len()));
    }
    spans
}

fn first_token_is(line: &str, keyword: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|token| token.eq_ignore_ascii_case(keyword))
}

/// Rebuilds `source` line by line, keeping its trailing newline state.
fn join_lines(lines: Vec<String>, source: &str) -> String {
    let mut out = lines.join("\n");
    if source.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Reads `CELL a b c alpha beta gamma` from the master file.
pub fn parse_cell(master: &str) -> TdsResult<UnitCell> {
    let line = master
        .lines()
        .find(|line| first_token_is(line, "CELL"))
        .ok_or_else(|| {
            TdsError::input_validation("INPUT.MAS_CELL", "master file has no CELL record")
        })?;

    let values = line
        .split_whitespace()
        .skip(1)
        .take(6)
        .map(|token| token.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| {
            TdsError::input_validation(
                "INPUT.MAS_CELL",
                format!("invalid CELL record '{}': {}", line.trim(), source),
            )
        })?;
    if values.len() != 6 {
        return Err(TdsError::input_validation(
            "INPUT.MAS_CELL",
            format!("CELL record '{}' needs six values", line.trim()),
        ));
    }

    Ok(UnitCell::new(
        values[0], values[1], values[2], values[3], values[4], values[5],
    ))
}

/// Sets the `SCALE` record to refine `count` scale factors (`1` repeated).
pub fn set_master_scale_flags(master: &str, count: usize) -> TdsResult<String> {
    let mut found = false;
    let lines = master
        .lines()
        .map(|line| {
            if found || !first_token_is(line, "SCALE") {
                return line.to_string();
            }
            let spans = token_spans(line);
            let Some(&(start, end)) = spans.get(1) else {
                return line.to_string();
            };
            if !line[start..end].bytes().all(|byte| byte.is_ascii_digit()) {
                return line.to_string();
            }
            found = true;
            format!("{}{}{}", &line[..start], "1".repeat(count), &line[end..])
        })
        .collect::<Vec<_>>();

    if !found {
        return Err(TdsError::input_validation(
            "INPUT.MAS_SCALE",
            "master file has no 'SCALE <flags>' record",
        ));
    }
    Ok(join_lines(lines, master))
}

/// Sets the scale-factor count of the `USAGE` record in the instruction file.
pub fn set_usage_scale_count(instructions: &str, count: usize) -> TdsResult<String> {
    let mut found = false;
    let lines = instructions
        .lines()
        .map(|line| {
            if found || !first_token_is(line, "USAGE") {
                return line.to_string();
            }
            let spans = token_spans(line);
            let Some(&(_, end)) = spans.get(USAGE_SCALE_COUNT_INDEX + 1) else {
                return line.to_string();
            };
            let field_start = spans[USAGE_SCALE_COUNT_INDEX].1;
            found = true;
            let digits = count.to_string();
            let width = (end - field_start).max(digits.len() + 1);
            format!(
                "{}{:>width$}{}",
                &line[..field_start],
                digits,
                &line[end..],
                width = width
            )
        })
        .collect::<Vec<_>>();

    if !found {
        return Err(TdsError::input_validation(
            "INPUT.INP_USAGE",
            format!(
                "instruction file has no USAGE record with at least {} values",
                USAGE_SCALE_COUNT_INDEX + 1
            ),
        ));
    }
    Ok(join_lines(lines, instructions))
}

fn is_lone_exponent_value(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && line.starts_with(char::is_whitespace)
        && trimmed.split_whitespace().count() == 1
        && trimmed.contains('.')
        && trimmed
            .split_once('E')
            .is_some_and(|(mantissa, exponent)| {
                mantissa.parse::<f64>().is_ok()
                    && exponent.len() == 3
                    && (exponent.starts_with('+') || exponent.starts_with('-'))
                    && exponent[1..].bytes().all(|byte| byte.is_ascii_digit())
            })
}

/// Replaces the single scale-factor starting value with `count` copies,
/// `SCALE_VALUES_PER_LINE` per line.
pub fn replicate_scale_start_value(instructions: &str, count: usize) -> TdsResult<String> {
    let mut found = false;
    let mut lines = Vec::new();
    for line in instructions.lines() {
        if found || !is_lone_exponent_value(line) {
            lines.push(line.to_string());
            continue;
        }
        found = true;
        let field = line.trim_end();
        let mut remaining = count;
        while remaining > 0 {
            let in_row = remaining.min(SCALE_VALUES_PER_LINE);
            lines.push(field.repeat(in_row));
            remaining -= in_row;
        }
    }

    if !found {
        return Err(TdsError::input_validation(
            "INPUT.INP_SCALE_VALUES",
            "instruction file has no single scale-factor starting value line",
        ));
    }
    Ok(join_lines(lines, instructions))
}

/// Applies both instruction-file edits for `count` scale factors.
pub fn binned_instructions(instructions: &str, count: usize) -> TdsResult<String> {
    let with_usage = set_usage_scale_count(instructions, count)?;
    replicate_scale_start_value(&with_usage, count)
}

#[cfg(test)]
mod tests {
    use super::{
        binned_instructions, parse_cell, replicate_scale_start_value, set_master_scale_flags,
        set_usage_scale_count,
    };

    const MASTER: &str = concat!(
        "XDPARFILE VERSION 2\n",
        "CELL  10.1230  11.2000   9.8760  90.0000 101.2500  90.0000\n",
        "WAVE   0.71073\n",
        "SCALE 1\n",
        "END XDLSM\n",
    );

    #[test]
    fn cell_record_is_parsed() {
        let cell = parse_cell(MASTER).expect("cell present");
        assert_eq!(cell.a, 10.123);
        assert_eq!(cell.beta, 101.25);
        assert_eq!(
            parse_cell("CELL 1.0 2.0\n")
                .expect_err("short record")
                .placeholder(),
            "INPUT.MAS_CELL"
        );
        assert_eq!(
            parse_cell("WAVE 0.7\n").expect_err("missing").placeholder(),
            "INPUT.MAS_CELL"
        );
    }

    #[test]
    fn scale_record_refines_every_bin() {
        let edited = set_master_scale_flags(MASTER, 12).expect("SCALE record present");
        assert!(edited.contains("\nSCALE 111111111111\n"), "{}", edited);
        assert!(edited.ends_with("END XDLSM\n"));

        let error = set_master_scale_flags("CELL 1 1 1 90 90 90\n", 4).expect_err("no SCALE");
        assert_eq!(error.placeholder(), "INPUT.MAS_SCALE");
    }

    #[test]
    fn usage_record_gets_new_scale_count() {
        let inp = "XDPARFILE\nUSAGE    12   3   0   0   1   1   0   1   0   0   0   0   0   0\n";
        let edited = set_usage_scale_count(inp, 12).expect("USAGE present");
        assert_eq!(
            edited,
            "XDPARFILE\nUSAGE    12   3   0   0   1  12   0   1   0   0   0   0   0   0\n"
        );

        let error = set_usage_scale_count("USAGE 1 2 3\n", 12).expect_err("too short");
        assert_eq!(error.placeholder(), "INPUT.INP_USAGE");
    }

    #[test]
    fn lone_scale_value_is_replicated_six_per_line() {
        let inp = "  0.100000E+01  0.000000E+00\n  0.123456E+01\nEND\n";
        let edited = replicate_scale_start_value(inp, 8).expect("lone value present");
        assert_eq!(
            edited,
            concat!(
                "  0.100000E+01  0.000000E+00\n",
                "  0.123456E+01  0.123456E+01  0.123456E+01  0.123456E+01  0.123456E+01  0.123456E+01\n",
                "  0.123456E+01  0.123456E+01\n",
                "END\n",
            )
        );
    }

    #[test]
    fn instruction_edits_require_a_starting_value() {
        let inp = "USAGE    12   3   0   0   1   1   0   1   0   0   0   0   0   0\nEND\n";
        let error = binned_instructions(inp, 4).expect_err("no lone value");
        assert_eq!(error.placeholder(), "INPUT.INP_SCALE_VALUES");
    }
}
