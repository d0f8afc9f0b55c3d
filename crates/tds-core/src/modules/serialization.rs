use crate::domain::{TdsError, TdsResult};
use std::fs;
use std::path::Path;

/// Right-aligned integer column that always keeps one separating space.
pub fn format_int_column(value: i32, width: usize) -> String {
    format!(" {value:>width$}", width = width.saturating_sub(1))
}

/// Right-aligned fixed-point column that always keeps one separating space.
pub fn format_fixed_column(value: f64, width: usize, precision: usize) -> String {
    format!(
        " {value:>width$.precision$}",
        width = width.saturating_sub(1),
        precision = precision
    )
}

pub fn format_text_column(value: &str, width: usize) -> String {
    format!(" {value:>width$}", width = width.saturating_sub(1))
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

pub(crate) fn read_text_input(path: &Path, placeholder: &'static str) -> TdsResult<String> {
    fs::read_to_string(path).map_err(|source| {
        TdsError::io_system(
            placeholder,
            format!("failed to read '{}': {}", path.display(), source),
        )
    })
}

pub(crate) fn write_text_output(
    path: &Path,
    content: &str,
    placeholder: &'static str,
) -> TdsResult<()> {
    write_text_artifact(path, content).map_err(|source| {
        TdsError::io_system(
            placeholder,
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{
        format_fixed_column, format_int_column, format_text_column, normalize_text_artifact,
        write_text_artifact,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn columns_keep_width_and_separation() {
        assert_eq!(format_int_column(4, 4), "   4");
        assert_eq!(format_int_column(-12, 4), " -12");
        assert_eq!(format_int_column(-123, 4), " -123");
        assert_eq!(format_fixed_column(142.372624, 12, 6), "  142.372624");
        assert_eq!(format_fixed_column(123456.5, 12, 6), " 123456.500000");
        assert_eq!(format_text_column("0.95", 8), "    0.95");
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn repeated_text_writes_produce_identical_bytes() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("xd.hkl");
        let input = "line 1\r\nline 2\rline 3";

        write_text_artifact(&path, input).expect("first write should succeed");
        let first = fs::read(&path).expect("artifact should be readable");

        write_text_artifact(&path, input).expect("second write should succeed");
        let second = fs::read(&path).expect("artifact should be readable");

        assert_eq!(first, second);
        assert_eq!(second, b"line 1\nline 2\nline 3\n");
    }
}
