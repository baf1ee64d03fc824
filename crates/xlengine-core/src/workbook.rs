//! Workbook type — the main document structure: an ordered sequence of
//! worksheets plus the settings and resources shared across them.

use crate::cell::{CellAddress, CellValue, StringPool};
use crate::error::{Error, Result};
use crate::named_range::{NameScope, NamedRange, NamedRangeCollection};
use crate::style::{Style, StyleRegistry};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook: an ordered sequence of sheets plus everything shared across
/// them — defined names, the style registry, the shared-strings table, and
/// the workbook-root XML this crate does not model structurally.
#[derive(Debug)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    settings: WorkbookSettings,
    active_sheet: usize,
    named_ranges: NamedRangeCollection,
    style_registry: StyleRegistry,
    string_pool: StringPool,
    /// `fileVersion`, `workbookPr`, `bookViews`, `calcPr`, `extLst`, and any
    /// unknown top-level workbook.xml elements, captured verbatim at read
    /// time.
    pub preserved: crate::preserved::PreservedElements,
    /// Root attributes and namespace bindings of `workbook.xml`, re-emitted
    /// unchanged on write.
    pub root_attributes: Vec<(String, String)>,
}

impl Workbook {
    /// Create a new empty workbook with one worksheet
    pub fn new() -> Self {
        let mut wb = Self::empty();
        wb.add_worksheet_with_name("Sheet1").unwrap();
        wb
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            settings: WorkbookSettings::default(),
            active_sheet: 0,
            named_ranges: NamedRangeCollection::new(),
            style_registry: StyleRegistry::new(),
            string_pool: StringPool::new(),
            preserved: crate::preserved::PreservedElements::new(),
            root_attributes: Vec::new(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.name() == name)
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        let index = self.worksheets.len();
        self.worksheets.push(Worksheet::new(name));
        Ok(index)
    }

    pub fn insert_worksheet(&mut self, index: usize, name: &str) -> Result<()> {
        if index > self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(name)?;
        self.worksheets.insert(index, Worksheet::new(name));
        if self.active_sheet >= index && !self.worksheets.is_empty() {
            self.active_sheet = self.active_sheet.saturating_add(1);
        }
        Ok(())
    }

    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name())?;
        let index = self.worksheets.len();
        self.worksheets.push(worksheet);
        Ok(index)
    }

    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        let worksheet = self.worksheets.remove(index);
        if !self.worksheets.is_empty() {
            if self.active_sheet >= self.worksheets.len() {
                self.active_sheet = self.worksheets.len() - 1;
            }
        } else {
            self.active_sheet = 0;
        }
        Ok(worksheet)
    }

    pub fn move_worksheet(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(from, self.worksheets.len()));
        }
        if to >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(to, self.worksheets.len()));
        }
        let worksheet = self.worksheets.remove(from);
        self.worksheets.insert(to, worksheet);
        if self.active_sheet == from {
            self.active_sheet = to;
        } else if from < self.active_sheet && to >= self.active_sheet {
            self.active_sheet = self.active_sheet.saturating_sub(1);
        } else if from > self.active_sheet && to <= self.active_sheet {
            self.active_sheet = self.active_sheet.saturating_add(1);
        }
        Ok(())
    }

    /// Rename a worksheet. The sheet's original `sheetId` is kept
    /// (position-based identity, not tied to the name), so a rename alone
    /// does not disturb it.
    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name_excluding(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.active_sheet = index;
        Ok(())
    }

    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    // === Style registry ===

    pub fn style_registry(&self) -> &StyleRegistry {
        &self.style_registry
    }

    pub fn style_registry_mut(&mut self) -> &mut StyleRegistry {
        &mut self.style_registry
    }

    /// Apply a style to a cell, registering it in the workbook-wide
    /// registry first (styles are interned once per registry, not per sheet).
    pub fn set_cell_style(&mut self, sheet: usize, row: u32, col: u16, style: Style) -> Result<()> {
        let style_index = self.style_registry.get_or_insert(style);
        let sheet_count = self.worksheets.len();
        let ws = self
            .worksheets
            .get_mut(sheet)
            .ok_or(Error::SheetOutOfBounds(sheet, sheet_count))?;
        ws.set_style_at(row, col, style_index);
        Ok(())
    }

    pub fn cell_style(&self, sheet: usize, row: u32, col: u16) -> Option<&Style> {
        let ws = self.worksheets.get(sheet)?;
        let idx = ws.cell_style_index_at(row, col);
        if idx == 0 {
            None
        } else {
            self.style_registry.get(idx)
        }
    }

    // === Shared strings ===

    pub fn string_pool(&self) -> &StringPool {
        &self.string_pool
    }

    pub fn string_pool_mut(&mut self) -> &mut StringPool {
        &mut self.string_pool
    }

    /// Write an interned string value to a cell via the shared-strings
    /// table
    pub fn set_cell_text(&mut self, sheet: usize, row: u32, col: u16, text: &str) -> Result<()> {
        let (shared, _) = self.string_pool.intern(text);
        let sheet_count = self.worksheets.len();
        let ws = self
            .worksheets
            .get_mut(sheet)
            .ok_or(Error::SheetOutOfBounds(sheet, sheet_count))?;
        ws.set_cell_value_at(row, col, CellValue::Text(shared))
    }

    // === Defined names ===

    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        self.define_name_with_scope(name, refers_to, NameScope::Workbook)
    }

    pub fn define_name_with_scope(&mut self, name: &str, refers_to: &str, scope: NameScope) -> Result<()> {
        let range = NamedRange::new(name, refers_to, scope);
        self.named_ranges.define(range)
    }

    pub fn define_name_for_sheet(&mut self, name: &str, refers_to: &str, sheet_index: usize) -> Result<()> {
        self.define_name_with_scope(name, refers_to, NameScope::Sheet(sheet_index))
    }

    pub fn get_named_range(&self, name: &str, current_sheet: usize) -> Option<&NamedRange> {
        self.named_ranges.get(name, current_sheet)
    }

    pub fn remove_name(&mut self, name: &str) -> Option<NamedRange> {
        self.named_ranges.remove(name, &NameScope::Workbook)
    }

    pub fn remove_name_from_sheet(&mut self, name: &str, sheet_index: usize) -> Option<NamedRange> {
        self.named_ranges.remove(name, &NameScope::Sheet(sheet_index))
    }

    pub fn named_ranges(&self) -> &NamedRangeCollection {
        &self.named_ranges
    }

    pub fn named_ranges_mut(&mut self) -> &mut NamedRangeCollection {
        &mut self.named_ranges
    }

    // === Internal helpers ===

    /// Resolve a sheet-qualified address's current value, used by the
    /// formula evaluator's environment implementation.
    pub fn value_at(&self, sheet: usize, addr: CellAddress) -> CellValue {
        self.worksheets
            .get(sheet)
            .map(|ws| ws.effective_value_at(addr.row, addr.col))
            .unwrap_or(CellValue::Empty)
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        self.validate_sheet_name_excluding(name, None)
    }

    fn validate_sheet_name_excluding(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        crate::cell::validate_sheet_name(name)?;
        let name_lower = name.to_lowercase();
        for (i, ws) in self.worksheets.iter().enumerate() {
            if Some(i) != exclude_index && ws.name().to_lowercase() == name_lower {
                return Err(Error::DuplicateSheetName(name.into()));
            }
        }
        Ok(())
    }

    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{n}");
            if self.validate_sheet_name(&name).is_ok() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Workbook-level settings carried alongside the preserved `workbookPr`
/// and `calcPr` elements
#[derive(Debug, Clone)]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (Mac)
    pub date_1904: bool,
    pub calc_on_open: bool,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self {
            date_1904: false,
            calc_on_open: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();
        let idx = wb.add_worksheet().unwrap();
        assert_eq!(idx, 1);
        assert_eq!(wb.sheet_count(), 2);
        let idx = wb.add_worksheet_with_name("Data").unwrap();
        assert_eq!(idx, 2);
        assert_eq!(wb.worksheet(2).unwrap().name(), "Data");
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new();
        assert!(wb.add_worksheet_with_name("SHEET1").is_err());
        assert!(wb.add_worksheet_with_name("sheet1").is_err());
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();
        assert!(wb.add_worksheet_with_name("").is_err());
        assert!(wb.add_worksheet_with_name("Sheet/1").is_err());
        assert!(wb.add_worksheet_with_name("Sheet:1").is_err());
        assert!(wb.add_worksheet_with_name("Sheet[1]").is_err());
        let long_name = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(wb.add_worksheet_with_name(&long_name).is_err());
    }

    #[test]
    fn test_move_worksheet() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("A").unwrap();
        wb.add_worksheet_with_name("B").unwrap();
        wb.add_worksheet_with_name("C").unwrap();
        wb.move_worksheet(3, 1).unwrap();
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
        assert_eq!(wb.worksheet(1).unwrap().name(), "C");
        assert_eq!(wb.worksheet(2).unwrap().name(), "A");
        assert_eq!(wb.worksheet(3).unwrap().name(), "B");
    }

    #[test]
    fn test_worksheet_by_name() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        assert!(wb.worksheet_by_name("Data").is_some());
        assert!(wb.worksheet_by_name("NonExistent").is_none());
    }

    #[test]
    fn test_style_registry_dedup() {
        let mut wb = Workbook::new();
        wb.set_cell_style(0, 0, 0, Style::new().bold(true)).unwrap();
        wb.set_cell_style(0, 1, 0, Style::new().bold(true)).unwrap();
        let ws = wb.worksheet(0).unwrap();
        assert_eq!(ws.cell_style_index_at(0, 0), ws.cell_style_index_at(1, 0));
    }
}
