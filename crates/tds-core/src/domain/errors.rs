use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TdsResult<T> = Result<T, TdsError>;
pub type ParserResult<T> = TdsResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TdsErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl TdsErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Fatal condition raised anywhere in the correction workflow.
///
/// `placeholder` is a stable dotted code (`INPUT.HKL_COLUMNS`,
/// `RUN.XDLSM_EXIT`, ...) that scripts can match on; `message` carries the
/// human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdsError {
    category: TdsErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl TdsError {
    pub fn new(
        category: TdsErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TdsErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TdsErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TdsErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TdsErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> TdsErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for TdsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for TdsError {}

#[cfg(test)]
mod tests {
    use super::{TdsError, TdsErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (TdsErrorCategory::InputValidationError, 2, "InputValidationError"),
            (TdsErrorCategory::IoSystemError, 3, "IoSystemError"),
            (TdsErrorCategory::ComputationError, 4, "ComputationError"),
            (TdsErrorCategory::InternalError, 5, "InternalError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), name);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = TdsError::input_validation(
            "INPUT.HKL_COLUMNS",
            "reflection row at line 3 has 5 columns, expected at least 6",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.HKL_COLUMNS] reflection row at line 3 has 5 columns, expected at least 6"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 2");
        assert_eq!(
            error.to_string(),
            "InputValidationError [INPUT.HKL_COLUMNS] reflection row at line 3 has 5 columns, expected at least 6"
        );
    }
}
