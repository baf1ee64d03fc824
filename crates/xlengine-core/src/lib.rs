//! # xlengine-core
//!
//! Core data structures for the xlengine spreadsheet engine: cell
//! addressing and values, the typed cell codec, the style registry, and
//! the persistent sheet/workbook model.
//!
//! - [`CellValue`] — cell contents (numbers, strings, booleans, errors, formulas)
//! - [`CellAddress`] and [`CellRange`] — cell addressing and ranges
//! - [`Style`] — cell formatting (fonts, fills, borders, etc.)
//! - [`Workbook`], [`Worksheet`] — the document structures
//! - [`Patch`] — the composable edit type sheets are mutated through
//!
//! ## Example
//!
//! ```rust
//! use xlengine_core::{Workbook, CellValue};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Hello").unwrap();
//! sheet.set_cell_value("B1", 42i64).unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::text("World")).unwrap();
//! ```

pub mod cell;
pub mod error;
pub mod named_range;
pub mod patch;
pub mod preserved;
pub mod range;
pub mod style;
pub mod workbook;
pub mod worksheet;

pub use cell::{
    datetime_to_serial, render_sheet_name, serial_to_datetime, sheet_name_needs_quoting,
    validate_sheet_name, CellAddress, CellCodec, CellData, CellError, CellRange, CellValue,
};
pub use error::{Error, Result};
pub use named_range::{NameScope, NamedRange, NamedRangeCollection};
pub use patch::{Patch, PatchOp};
pub use workbook::{Workbook, WorkbookSettings};
pub use worksheet::{SheetVisibility, Worksheet};

pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, Style, StyleRegistry, VerticalAlignment,
};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
