//! # xlengine
//!
//! Facade crate tying together the formula engine ([`xlengine_formula`]),
//! the cell/workbook model ([`xlengine_core`]), and the OOXML reader/writer
//! ([`xlengine_ooxml`]) into a single entry point: open an `.xlsx`, mutate
//! cells, recalculate formulas, save it back.
//!
//! ```rust,ignore
//! use xlengine::prelude::*;
//!
//! let mut workbook = Workbook::open("book.xlsx")?;
//! workbook.worksheet_mut(0).unwrap().set_cell_formula("A3", "=A1+A2")?;
//! workbook.calculate()?;
//! workbook.save("book.xlsx")?;
//! ```

pub mod calculation;
pub mod prelude;

use std::path::Path;

pub use xlengine_core::{
    datetime_to_serial, render_sheet_name, serial_to_datetime, sheet_name_needs_quoting,
    validate_sheet_name, Alignment, BorderEdge, BorderLineStyle, BorderStyle, CellAddress,
    CellCodec, CellData, CellError, CellRange, CellValue, Color, Error, FillStyle, FontStyle,
    HorizontalAlignment, NameScope, NamedRange, NamedRangeCollection, NumberFormat, Result,
    SheetVisibility, Style, StyleRegistry, VerticalAlignment, Workbook, WorkbookSettings,
    Worksheet, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

pub use xlengine_formula::{
    eval_expr, parse_formula, print_formula, EvalCtx, EvalOptions, Env, FormulaError,
    FormulaResult, FormulaValue, FunctionSpec, TExpr,
};

pub use xlengine_ooxml::{OoxmlError, OoxmlResult, PartManifest, XlsxReader, XlsxWriter};

pub use calculation::{CalculationOptions, CalculationStats, WorkbookCalculationExt};

/// Extension trait adding file-based open/save to [`Workbook`], dispatching
/// on extension the way the reader/writer pair expects (`.xlsx`/`.xlsm`
/// only — this crate has no CSV or legacy `.xls` support).
pub trait WorkbookExt: Sized {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match extension_of(path) {
            "xlsx" | "xlsm" => {
                XlsxReader::read_file(path).map_err(|e| Error::other(e.to_string()))
            }
            other => Err(Error::other(format!("unsupported file extension: {other}"))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension_of(path) {
            "xlsx" | "xlsm" => {
                XlsxWriter::write_file(self, path).map_err(|e| Error::other(e.to_string()))
            }
            other => Err(Error::other(format!("unsupported file extension: {other}"))),
        }
    }
}

fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn open_rejects_unknown_extension() {
        let err = Workbook::open("book.ods").unwrap_err();
        assert!(err.to_string().contains("unsupported file extension"));
    }

    #[test]
    fn write_then_read_round_trips_a_cell() {
        let mut workbook = Workbook::new();
        workbook
            .worksheet_mut(0)
            .unwrap()
            .set_cell_value("A1", "hello")
            .unwrap();

        let mut buf = Vec::new();
        XlsxWriter::write(&workbook, Cursor::new(&mut buf)).unwrap();
        let read_back = XlsxReader::read(Cursor::new(&buf)).unwrap();
        assert_eq!(
            read_back.worksheet(0).unwrap().get_value_at(0, 0).as_str(),
            Some("hello")
        );
    }
}
