use super::{ReflectionComment, ReflectionFile};
use crate::common::constants::{ANNOTATION_PREFIX, COMMENT_MARKER, MIN_REFLECTION_COLUMNS};
use crate::domain::{CorrectionCoefficients, ParserResult, Reflection, TdsError};
use crate::modules::serialization::{format_fixed_column, format_int_column, format_text_column};

const INDEX_WIDTH: usize = 4;
const VALUE_WIDTH: usize = 12;
const VALUE_PRECISION: usize = 6;
const EXTRA_WIDTH: usize = 8;

pub fn parse_reflection_file(source: &str, origin: &str) -> ParserResult<ReflectionFile> {
    let mut lines = source.lines().enumerate();
    let header = match lines.next() {
        Some((_, header)) if !header.trim().is_empty() => header.trim_end().to_string(),
        _ => {
            return Err(TdsError::input_validation(
                "INPUT.HKL_HEADER",
                format!("reflection file '{}' has no header line", origin),
            ));
        }
    };

    let mut annotation = None;
    let mut comments = Vec::new();
    let mut reflections = Vec::new();

    for (index, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with(ANNOTATION_PREFIX) {
            // Later annotations win; only one is ever written back.
            annotation = Some(trimmed.to_string());
            continue;
        }
        if trimmed.starts_with(COMMENT_MARKER) {
            comments.push(ReflectionComment {
                row: reflections.len(),
                text: line.trim_end().to_string(),
            });
            continue;
        }
        reflections.push(parse_reflection_row(trimmed, index + 1, origin)?);
    }

    if reflections.is_empty() {
        return Err(TdsError::input_validation(
            "INPUT.HKL_EMPTY",
            format!("reflection file '{}' contains no reflections", origin),
        ));
    }

    Ok(ReflectionFile {
        header,
        annotation,
        comments,
        reflections,
    })
}

fn parse_reflection_row(row: &str, line_number: usize, origin: &str) -> ParserResult<Reflection> {
    let tokens = row.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < MIN_REFLECTION_COLUMNS {
        return Err(TdsError::input_validation(
            "INPUT.HKL_COLUMNS",
            format!(
                "reflection row at {}:{} has {} columns, expected at least {}",
                origin,
                line_number,
                tokens.len(),
                MIN_REFLECTION_COLUMNS
            ),
        ));
    }

    let integer = |position: usize, name: &str| {
        parse_integer_token(tokens[position]).ok_or_else(|| {
            TdsError::input_validation(
                "INPUT.HKL_VALUE",
                format!(
                    "invalid {} '{}' at {}:{}",
                    name, tokens[position], origin, line_number
                ),
            )
        })
    };
    let real = |position: usize, name: &str| {
        tokens[position]
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                TdsError::input_validation(
                    "INPUT.HKL_VALUE",
                    format!(
                        "invalid {} '{}' at {}:{}",
                        name, tokens[position], origin, line_number
                    ),
                )
            })
    };

    Ok(Reflection {
        h: integer(0, "h index")?,
        k: integer(1, "k index")?,
        l: integer(2, "l index")?,
        batch: integer(3, "batch number")?,
        intensity: real(4, "intensity")?,
        sigma: real(5, "sigma")?,
        extra: tokens[MIN_REFLECTION_COLUMNS..]
            .iter()
            .map(|token| token.to_string())
            .collect(),
    })
}

/// Accepts `4` as well as integral floats such as `4.0`.
pub(crate) fn parse_integer_token(token: &str) -> Option<i32> {
    if let Ok(value) = token.parse::<i32>() {
        return Some(value);
    }
    let value = token.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value.abs() <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}

pub fn render_reflection_row(reflection: &Reflection) -> String {
    let mut row = String::with_capacity(64);
    for value in [reflection.h, reflection.k, reflection.l, reflection.batch] {
        row.push_str(&format_int_column(value, INDEX_WIDTH));
    }
    row.push_str(&format_fixed_column(
        reflection.intensity,
        VALUE_WIDTH,
        VALUE_PRECISION,
    ));
    row.push_str(&format_fixed_column(
        reflection.sigma,
        VALUE_WIDTH,
        VALUE_PRECISION,
    ));
    for extra in &reflection.extra {
        row.push_str(&format_text_column(extra, EXTRA_WIDTH));
    }
    row
}

/// Reads `a=..., b=...` back out of an annotation line.
pub fn parse_annotation(line: &str) -> Option<CorrectionCoefficients> {
    let body = line.trim().strip_prefix(ANNOTATION_PREFIX)?;
    let mut a = None;
    let mut b = None;
    for part in body.split(',') {
        let (key, value) = part.split_once('=')?;
        let value = value.trim().parse::<f64>().ok()?;
        match key.trim() {
            "a" => a = Some(value),
            "b" => b = Some(value),
            _ => return None,
        }
    }
    Some(CorrectionCoefficients::new(a?, b?))
}

#[cfg(test)]
mod tests {
    use super::{parse_annotation, parse_integer_token, parse_reflection_file};
    use crate::domain::CorrectionCoefficients;

    #[test]
    fn rows_with_fewer_than_six_columns_are_fatal() {
        let source = concat!(
            "XDNAME F^2 NDAT 6\n",
            "   0   0   4   1  142.372624    0.337509\n",
            "   0   0   6  98.000000    0.500000\n",
        );
        let error = parse_reflection_file(source, "xd.hkl").expect_err("row 3 is short");
        assert_eq!(error.placeholder(), "INPUT.HKL_COLUMNS");
        assert!(error.message().contains("xd.hkl:3"), "{}", error.message());
        assert!(error.message().contains("has 5 columns"), "{}", error.message());
    }

    #[test]
    fn annotation_and_comments_are_separated_from_data() {
        let source = concat!(
            "XDNAME F^2 NDAT 6\n",
            "!TDS CORRECTION FACTOR: a=0.100, b=0.200\n",
            "! first comment\n",
            "\n",
            "   0   0   4   1  142.372624    0.337509\n",
            "!TDS CORRECTION FACTOR: a=0.300, b=0.400\n",
            "   0   0   6   1   98.000000    0.500000\n",
        );
        let file = parse_reflection_file(source, "xd.hkl").expect("file parses");

        assert_eq!(file.header, "XDNAME F^2 NDAT 6");
        assert_eq!(file.comments.len(), 1);
        assert_eq!(file.comments[0].text, "! first comment");
        assert_eq!(file.comments[0].row, 0);
        assert_eq!(file.reflections.len(), 2);
        assert_eq!(
            file.annotation_coefficients(),
            Some(CorrectionCoefficients::new(0.3, 0.4))
        );
        assert_eq!(file.reflections[1].indices(), (0, 0, 6));
        assert!(file.reflections[1].extra.is_empty());
    }

    #[test]
    fn empty_files_and_bad_values_are_rejected() {
        assert_eq!(
            parse_reflection_file("", "xd.hkl")
                .expect_err("no header")
                .placeholder(),
            "INPUT.HKL_HEADER"
        );
        assert_eq!(
            parse_reflection_file("XDNAME F^2 NDAT 6\n! only comments\n", "xd.hkl")
                .expect_err("no rows")
                .placeholder(),
            "INPUT.HKL_EMPTY"
        );
        assert_eq!(
            parse_reflection_file(
                "XDNAME F^2 NDAT 6\n   0   0   x   1  1.0  0.1\n",
                "xd.hkl"
            )
            .expect_err("bad index")
            .placeholder(),
            "INPUT.HKL_VALUE"
        );
    }

    #[test]
    fn integer_tokens_accept_integral_floats() {
        assert_eq!(parse_integer_token("-3"), Some(-3));
        assert_eq!(parse_integer_token("4.0"), Some(4));
        assert_eq!(parse_integer_token("4.5"), None);
        assert_eq!(parse_integer_token("h"), None);
    }

    #[test]
    fn annotation_parsing_requires_both_coefficients() {
        assert_eq!(
            parse_annotation("!TDS CORRECTION FACTOR: a=-0.125, b=2.000"),
            Some(CorrectionCoefficients::new(-0.125, 2.0))
        );
        assert_eq!(parse_annotation("!TDS CORRECTION FACTOR: a=0.1"), None);
        assert_eq!(parse_annotation("! unrelated"), None);
    }
}
