//! The worksheet model: cell data plus the sheet-level properties a
//! workbook keeps per tab.

use crate::cell::{CellAddress, CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::preserved::PreservedElements;
use crate::{MAX_COLS, MAX_ROWS};

/// Sheet visibility state, one of Excel's three states: shown in the tab
/// strip, hidden but unhideable from the UI alone, or hidden and only
/// revealable through VBA/XML editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not un-hidable from the Excel UI without VBA/XML editing
    VeryHidden,
}

/// A worksheet: cell data, row/column properties regenerated as part of
/// `sheetData`, merge regions, plus the XML elements this crate does not
/// model structurally (captured verbatim at read time; see [`preserved`](crate::preserved)).
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    /// Original `sheetId` from workbook.xml, preserved across writes as
    /// long as the sheet keeps its position in the workbook
    sheet_id: Option<u32>,
    cells: CellStorage,
    visibility: SheetVisibility,
    /// `sheetPr`, `dimension`, `sheetViews`, `sheetFormatPr`, `cols`,
    /// `conditionalFormatting*`, `printOptions`, `pageMargins`,
    /// `pageSetup`, `headerFooter`, `rowBreaks`, `colBreaks`,
    /// `customProperties`, `drawing`, `legacyDrawing`, `picture`,
    /// `oleObjects`, `controls`, `extLst` — everything besides `sheetData`
    /// and `mergeCells`, which this crate regenerates from the cell model.
    pub preserved: PreservedElements,
}

impl Worksheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            sheet_id: None,
            cells: CellStorage::new(),
            visibility: SheetVisibility::Visible,
            preserved: PreservedElements::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn sheet_id(&self) -> Option<u32> {
        self.sheet_id
    }

    pub fn set_sheet_id(&mut self, id: u32) {
        self.sheet_id = Some(id);
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: SheetVisibility) {
        self.visibility = visibility;
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == SheetVisibility::Visible
    }

    // === Cell access ===

    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.get(addr.row, addr.col))
    }

    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    pub fn cell_at_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.cells.get_mut(row, col)
    }

    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells.get(row, col).map(|c| c.value.clone()).unwrap_or(CellValue::Empty)
    }

    pub fn cell_style_index(&self, address: &str) -> Result<u32> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_style_index_at(addr.row, addr.col))
    }

    pub fn cell_style_index_at(&self, row: u32, col: u16) -> u32 {
        self.cells.get(row, col).map(|c| c.style_index).unwrap_or(0)
    }

    // === Cell modification ===

    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    pub fn set_cell_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Infallible variant used by [`crate::patch::Patch::apply`], which
    /// has already range-checked via the originating address.
    pub(crate) fn set_value_at(&mut self, row: u32, col: u16, value: CellValue) {
        self.cells.set_value(row, col, value);
    }

    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_formula_at(addr.row, addr.col, formula)
    }

    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, formula: &str) -> Result<()> {
        self.validate_cell_position(row, col)?;
        let source = formula.strip_prefix('=').unwrap_or(formula).to_string();
        self.cells.set_value(row, col, CellValue::formula(source));
        Ok(())
    }

    pub fn set_style_at(&mut self, row: u32, col: u16, style_index: u32) {
        self.cells.set_style(row, col, style_index);
    }

    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.cells.remove(addr.row, addr.col);
        Ok(())
    }

    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(row, col);
    }

    pub(crate) fn remove_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(row, col);
    }

    // === Range operations ===

    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| CellRange::from_indices(min_row, min_col, max_row, max_col))
    }

    pub fn clear_range(&mut self, range: &CellRange) {
        for addr in range.cells() {
            self.cells.remove(addr.row, addr.col);
        }
    }

    pub fn fill_range<V: Into<CellValue> + Clone>(&mut self, range: &CellRange, value: V) -> Result<()> {
        let value = value.into();
        for addr in range.cells() {
            self.validate_cell_position(addr.row, addr.col)?;
            self.cells.set_value(addr.row, addr.col, value.clone());
        }
        Ok(())
    }

    // === Row/column properties ===

    pub fn row_height(&self, row: u32) -> f64 {
        self.cells.row_height(row)
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.cells.set_row_height(row, height);
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.cells.is_row_hidden(row)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        self.cells.set_row_hidden(row, hidden);
    }

    pub fn column_width(&self, col: u16) -> f64 {
        self.cells.column_width(col)
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.cells.set_column_width(col, width);
    }

    pub fn is_column_hidden(&self, col: u16) -> bool {
        self.cells.is_column_hidden(col)
    }

    pub fn set_column_hidden(&mut self, col: u16, hidden: bool) {
        self.cells.set_column_hidden(col, hidden);
    }

    pub fn custom_row_heights(&self) -> &std::collections::BTreeMap<u32, f64> {
        self.cells.custom_row_heights()
    }

    pub fn hidden_rows(&self) -> &std::collections::BTreeMap<u32, bool> {
        self.cells.hidden_rows()
    }

    pub fn custom_column_widths(&self) -> &std::collections::BTreeMap<u16, f64> {
        self.cells.custom_column_widths()
    }

    pub fn hidden_columns(&self) -> &std::collections::BTreeMap<u16, bool> {
        self.cells.hidden_columns()
    }

    // === Merged cells ===

    pub fn merged_regions(&self) -> &[CellRange] {
        self.cells.merged_regions()
    }

    pub fn merge(&mut self, range: CellRange) -> Result<()> {
        self.cells.add_merged_region(range)
    }

    pub fn merge_cells(&mut self, range: &CellRange) -> Result<()> {
        self.cells.add_merged_region(*range).map_err(|_| Error::MergedCellConflict(range.to_string()))
    }

    pub fn unmerge_containing(&mut self, addr: CellAddress) -> Option<CellRange> {
        self.cells.remove_merged_region_containing(addr)
    }

    pub fn unmerge_cells(&mut self, range: &CellRange) -> bool {
        self.unmerge_containing(range.start).is_some()
    }

    pub fn is_merged(&self, row: u32, col: u16) -> bool {
        self.cells.is_merged(row, col)
    }

    pub fn is_merge_anchor(&self, row: u32, col: u16) -> bool {
        self.cells.is_merge_anchor(row, col)
    }

    // === Internal access for the formula orchestrator and OOXML layer ===

    pub(crate) fn cells(&self) -> &CellStorage {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut CellStorage {
        &mut self.cells
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter()
    }

    /// Iterate over formula cells: (row, col, formula source text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.cells.iter().filter_map(|(row, col, cell)| match &cell.value {
            CellValue::Formula { source, .. } => Some((row, col, source.as_str())),
            _ => None,
        })
    }

    pub fn formula_at(&self, row: u32, col: u16) -> Option<&str> {
        match self.cells.get(row, col).map(|c| &c.value) {
            Some(CellValue::Formula { source, .. }) => Some(source),
            _ => None,
        }
    }

    /// Set the cached result of a formula cell (written by the
    /// calculation orchestrator after evaluation).
    pub fn set_formula_result(&mut self, row: u32, col: u16, value: CellValue) -> Result<()> {
        let cell = self
            .cells
            .get_mut(row, col)
            .ok_or_else(|| Error::InvalidAddress(format!("no cell at ({row}, {col})")))?;
        match &mut cell.value {
            CellValue::Formula { cached, .. } => {
                *cached = Some(Box::new(value));
                Ok(())
            }
            _ => Err(Error::Other(format!("cell at ({row}, {col}) is not a formula"))),
        }
    }

    /// The displayable value at a position: a formula's cached result, or
    /// the cell's own value.
    pub fn effective_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells
            .get(row, col)
            .map(|c| c.value.effective_value().clone())
            .unwrap_or(CellValue::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_worksheet() {
        let ws = Worksheet::new("Test");
        assert_eq!(ws.name(), "Test");
        assert!(ws.is_visible());
        assert!(ws.is_empty());
    }

    #[test]
    fn test_set_cell_values() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_value("A1", "Hello").unwrap();
        ws.set_cell_value("B1", 42i64).unwrap();
        ws.set_cell_value("C1", true).unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_str(), Some("Hello"));
        assert_eq!(
            ws.get_value("B1").unwrap().as_number(),
            Some(rust_decimal::Decimal::from(42))
        );
        assert_eq!(ws.get_value("C1").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_set_cell_formula() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_formula("A1", "=SUM(B1:B10)").unwrap();
        let value = ws.get_value("A1").unwrap();
        assert!(value.is_formula());
        assert_eq!(value.formula_text(), Some("SUM(B1:B10)"));
    }

    #[test]
    fn test_used_range() {
        let mut ws = Worksheet::new("Test");
        assert!(ws.used_range().is_none());
        ws.set_cell_value_at(5, 3, "A").unwrap();
        ws.set_cell_value_at(10, 7, "B").unwrap();
        let range = ws.used_range().unwrap();
        assert_eq!(range.start.row, 5);
        assert_eq!(range.start.col, 3);
        assert_eq!(range.end.row, 10);
        assert_eq!(range.end.col, 7);
    }

    #[test]
    fn test_row_column_dimensions() {
        let mut ws = Worksheet::new("Test");
        assert!((ws.row_height(0) - 15.0).abs() < 0.001);
        assert!((ws.column_width(0) - 8.43).abs() < 0.001);
        ws.set_row_height(5, 30.0);
        ws.set_column_width(3, 20.0);
        assert!((ws.row_height(5) - 30.0).abs() < 0.001);
        assert!((ws.column_width(3) - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_merge_cells() {
        let mut ws = Worksheet::new("Test");
        let range = CellRange::parse("A1:C3").unwrap();
        ws.merge_cells(&range).unwrap();
        assert_eq!(ws.merged_regions().len(), 1);
        let range2 = CellRange::parse("B2:D4").unwrap();
        assert!(ws.merge_cells(&range2).is_err());
    }

    #[test]
    fn test_formula_result_cache() {
        use rust_decimal::Decimal;
        let mut ws = Worksheet::new("Test");
        ws.set_cell_formula("A1", "=1+1").unwrap();
        ws.set_formula_result(0, 0, CellValue::Number(Decimal::from(2))).unwrap();
        assert_eq!(ws.effective_value_at(0, 0).as_number(), Some(Decimal::from(2)));
    }
}
