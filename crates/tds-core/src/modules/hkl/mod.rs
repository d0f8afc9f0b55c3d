//! XD reflection file (`xd.hkl`) reading and writing.
//!
//! Layout: one header line, then free-format rows `h k l batch F^2 sigma
//! [extra...]`. Lines starting with `!` are comments to XD and keep their
//! place among the rows. One of them may be the TDS correction annotation,
//! which is kept directly below the header and replaced rather than
//! duplicated on every write.

mod parser;

use crate::common::constants::ANNOTATION_PREFIX;
use crate::domain::{CorrectionCoefficients, Reflection, TdsResult};
use crate::modules::serialization::{read_text_input, write_text_output};
use std::path::Path;

pub use parser::{parse_annotation, parse_reflection_file, render_reflection_row};
pub(crate) use parser::parse_integer_token;

/// A `!` line and the index of the data row it precedes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionComment {
    pub row: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionFile {
    pub header: String,
    /// Raw annotation line, without trailing newline.
    pub annotation: Option<String>,
    /// Other `!` lines in file order.
    pub comments: Vec<ReflectionComment>,
    pub reflections: Vec<Reflection>,
}

impl ReflectionFile {
    pub fn read(path: &Path) -> TdsResult<Self> {
        let source = read_text_input(path, "IO.HKL_READ")?;
        parse_reflection_file(&source, &path.display().to_string())
    }

    pub fn write(&self, path: &Path) -> TdsResult<()> {
        write_text_output(path, &self.render(), "IO.HKL_WRITE")
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.reflections.len() * 64 + 128);
        out.push_str(&self.header);
        out.push('\n');
        if let Some(annotation) = &self.annotation {
            out.push_str(annotation);
            out.push('\n');
        }
        let mut comments = self.comments.iter().peekable();
        for (row, reflection) in self.reflections.iter().enumerate() {
            while let Some(comment) = comments.next_if(|comment| comment.row <= row) {
                out.push_str(&comment.text);
                out.push('\n');
            }
            out.push_str(&render_reflection_row(reflection));
            out.push('\n');
        }
        for comment in comments {
            out.push_str(&comment.text);
            out.push('\n');
        }
        out
    }

    /// Replaces the data rows with `rows`, each tagged with its index in the
    /// current row list and in increasing order. Comments stay ahead of the
    /// same surviving row.
    pub fn replace_reflections(&mut self, rows: Vec<(usize, Reflection)>) {
        for comment in &mut self.comments {
            comment.row = rows.partition_point(|(original, _)| *original < comment.row);
        }
        self.reflections = rows.into_iter().map(|(_, reflection)| reflection).collect();
    }

    pub fn set_annotation(&mut self, coefficients: CorrectionCoefficients) {
        self.annotation = Some(annotation_line(coefficients));
    }

    /// Coefficients recorded by the annotation, if present and readable.
    pub fn annotation_coefficients(&self) -> Option<CorrectionCoefficients> {
        self.annotation.as_deref().and_then(parse_annotation)
    }

    /// Smallest column count over all rows.
    pub fn column_count(&self) -> usize {
        self.reflections
            .iter()
            .map(|reflection| 6 + reflection.extra.len())
            .min()
            .unwrap_or(0)
    }
}

pub fn annotation_line(coefficients: CorrectionCoefficients) -> String {
    format!("{} {}", ANNOTATION_PREFIX, coefficients)
}
