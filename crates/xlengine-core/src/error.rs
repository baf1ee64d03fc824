//! Error types for xlengine-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in xlengine-core
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed A1-notation address
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    /// Malformed A1-notation range
    #[error("invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of the sheet's bounds
    #[error("row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of the sheet's bounds
    #[error("column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    /// Sheet index out of the workbook's bounds
    #[error("sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// No sheet with the given name
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet name violates Excel's naming rules (length, forbidden characters)
    #[error("invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Sheet name already used in this workbook
    #[error("sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Defined name is not a legal identifier
    #[error("invalid defined name: {0}")]
    InvalidDefinedName(String),

    /// Style index does not index a present registry entry
    #[error("invalid style index: {0}")]
    InvalidStyleIndex(u32),

    /// A cell's codec read failed; carries the offending address
    #[error("type mismatch at {at}: expected {expected}, got {actual}")]
    TypeMismatch {
        at: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A cell's codec parse failed; carries the offending address
    #[error("parse error at {at}: could not parse {value:?} as {target}: {detail}")]
    CellParseError {
        at: String,
        value: String,
        target: &'static str,
        detail: String,
    },

    /// Attempted edit would straddle an existing merge region's non-anchor cell
    #[error("cell {0} is part of a merged region")]
    MergedCellConflict(String),

    /// Two merge regions overlap
    #[error("merge region {0} overlaps an existing merge")]
    MergeOverlap(String),

    /// Generic error with message, for cases not worth a dedicated variant
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a generic error from a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
