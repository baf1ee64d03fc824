//! Formula error types: parse-time failures and the Excel-visible error
//! domain arithmetic and functions propagate through.

use thiserror::Error;

pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while parsing or typechecking a formula. These are
/// recovered only at the explicit boundary of `parse_formula`/`typecheck` —
/// they never silently become an Excel `#`-error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("formula text is empty")]
    EmptyInput,

    #[error("formula text exceeds the 8192-character limit ({0} chars)")]
    TooLong(usize),

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unknown function '{name}'{suggestion}")]
    UnknownFunction { name: String, suggestion: String },

    #[error("unbalanced parenthesis or bracket")]
    UnbalancedDelimiter,

    #[error("expected {expected}, found '{found}'")]
    Unexpected { expected: String, found: String },

    #[error("wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("argument {index} to {function} must be {expected}")]
    ArgumentKind {
        function: String,
        index: usize,
        expected: String,
    },

    #[error("invalid cell or range reference '{0}'")]
    InvalidReference(String),

    #[error("unexpected end of formula")]
    UnexpectedEnd,
}

impl FormulaError {
    pub fn unknown_function(name: &str, suggestions: &[String]) -> Self {
        let suggestion = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" (did you mean: {})", suggestions.join(", "))
        };
        FormulaError::UnknownFunction {
            name: name.to_string(),
            suggestion,
        }
    }
}
