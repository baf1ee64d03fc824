//! Prelude module - common imports for xlengine users
//!
//! ```rust
//! use xlengine::prelude::*;
//! ```

pub use crate::{
    // Style types
    Alignment,
    BorderEdge,
    BorderLineStyle,
    BorderStyle,
    // Calculation types
    CalculationOptions,
    CalculationStats,
    CellAddress,
    CellError,

    CellRange,
    // Cell types
    CellValue,

    Color,

    // Error types
    Error,
    FillStyle,
    FontStyle,
    HorizontalAlignment,

    // Formula types
    FormulaError,
    FormulaValue,
    NamedRange,
    NameScope,
    NumberFormat,
    Result,

    Style,
    TExpr,
    VerticalAlignment,
    // Main types
    Workbook,
    // Extension traits
    WorkbookCalculationExt,
    WorkbookExt,
    Worksheet,

    // I/O types
    OoxmlError,
    PartManifest,
    XlsxReader,
    XlsxWriter,

    parse_formula,
    print_formula,
};
