//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] / [`CellRange`] - A cell's location and ranges of cells
//! - [`CellData`] / [`CellStorage`] - Sparse per-sheet cell storage
//! - [`CellCodec`] - Typed bidirectional marshaling between host values and cells

mod address;
mod codec;
mod storage;
mod value;

pub use address::{
    render_sheet_name, sheet_name_needs_quoting, validate_sheet_name, AxisSpan, CellAddress,
    CellRange, CellRangeIterator, SheetAddress, SheetRange,
};
pub use codec::{datetime_to_serial, parse_decimal, serial_to_datetime, CellCodec, StyleHint};
pub use storage::{CellData, CellStorage};
pub use value::{CellError, CellValue, RichTextRun, SharedString, StringPool};
