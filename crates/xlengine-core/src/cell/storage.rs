//! Sparse cell storage backing a [`crate::worksheet::Worksheet`]
//!
//! Only non-empty cells are stored, in a row-major `BTreeMap` so that
//! iteration (needed for deterministic writes) is in row order without an
//! explicit sort, and single-cell edits do not scan the whole sheet.

use std::collections::BTreeMap;

use super::CellValue;
use crate::CellRange;

/// Complete data for a single cell: its value plus a style-registry index.
#[derive(Debug, Clone)]
pub struct CellData {
    pub value: CellValue,
    /// Index into the workbook's style registry (0 = default style)
    pub style_index: u32,
}

impl CellData {
    pub fn new(value: CellValue) -> Self {
        Self { value, style_index: 0 }
    }

    pub fn with_style(value: CellValue, style_index: u32) -> Self {
        Self { value, style_index }
    }

    pub fn empty() -> Self {
        Self {
            value: CellValue::Empty,
            style_index: 0,
        }
    }

    /// A cell is storage-empty (and thus elided) only when it has both no
    /// value and the default style — a styled-but-blank cell must still be
    /// retained so the style survives a round trip.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

impl Default for CellData {
    fn default() -> Self {
        Self::empty()
    }
}

/// Sparse row-major cell storage plus per-row/column properties and merge
/// regions for one worksheet.
#[derive(Debug, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
    default_row_height: f64,
    default_column_width: f64,
    row_heights: BTreeMap<u32, f64>,
    hidden_rows: BTreeMap<u32, bool>,
    row_outline_levels: BTreeMap<u32, u8>,
    column_widths: BTreeMap<u16, f64>,
    hidden_columns: BTreeMap<u16, bool>,
    column_outline_levels: BTreeMap<u16, u8>,
    merged_regions: Vec<CellRange>,
}

impl CellStorage {
    pub fn new() -> Self {
        Self {
            default_row_height: 15.0,
            default_column_width: 8.43,
            ..Default::default()
        }
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// Write or remove a cell; writing an empty-and-default-styled cell
    /// removes it entirely rather than leaving a tombstone.
    pub fn set(&mut self, row: u32, col: u16, data: CellData) {
        if data.is_empty() {
            if let Some(row_map) = self.rows.get_mut(&row) {
                row_map.remove(&col);
                if row_map.is_empty() {
                    self.rows.remove(&row);
                }
            }
        } else {
            self.rows.entry(row).or_default().insert(col, data);
        }
    }

    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        if let Some(cell) = self.get_mut(row, col) {
            cell.value = value;
            if cell.is_empty() {
                self.set(row, col, CellData::empty());
            }
        } else if !value.is_empty() {
            self.set(row, col, CellData::new(value));
        }
    }

    pub fn set_style(&mut self, row: u32, col: u16, style_index: u32) {
        if let Some(cell) = self.get_mut(row, col) {
            cell.style_index = style_index;
        } else if style_index != 0 {
            self.set(row, col, CellData::with_style(CellValue::Empty, style_index));
        }
    }

    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let result = self.rows.get_mut(&row).and_then(|r| r.remove(&col));
        if let Some(row_map) = self.rows.get(&row) {
            if row_map.is_empty() {
                self.rows.remove(&row);
            }
        }
        result
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.merged_regions.clear();
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bounding box of non-empty cells: the worksheet's "used range"
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        if self.rows.is_empty() {
            return None;
        }
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;
        let mut min_col = u16::MAX;
        let mut max_col = 0u16;
        for row_data in self.rows.values() {
            if let Some(&col) = row_data.keys().next() {
                min_col = min_col.min(col);
            }
            if let Some(&col) = row_data.keys().next_back() {
                max_col = max_col.max(col);
            }
        }
        Some((min_row, min_col, max_row, max_col))
    }

    /// The used range as a [`CellRange`], or a single-cell default at A1
    /// when the sheet is entirely empty.
    pub fn used_range(&self) -> CellRange {
        match self.used_bounds() {
            Some((min_row, min_col, max_row, max_col)) => {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            }
            None => CellRange::from_indices(0, 0, 0, 0),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows.iter().flat_map(|(&row, cols)| cols.iter().map(move |(&col, data)| (row, col, data)))
    }

    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &CellData)> {
        self.rows.get(&row).into_iter().flat_map(|cols| cols.iter().map(|(&col, data)| (col, data)))
    }

    pub fn row_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn default_row_height(&self) -> f64 {
        self.default_row_height
    }

    pub fn set_default_row_height(&mut self, height: f64) {
        self.default_row_height = height;
    }

    pub fn row_height(&self, row: u32) -> f64 {
        self.row_heights.get(&row).copied().unwrap_or(self.default_row_height)
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        if (height - self.default_row_height).abs() < 0.001 {
            self.row_heights.remove(&row);
        } else {
            self.row_heights.insert(row, height);
        }
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.get(&row).copied().unwrap_or(false)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        if hidden {
            self.hidden_rows.insert(row, true);
        } else {
            self.hidden_rows.remove(&row);
        }
    }

    pub fn row_outline_level(&self, row: u32) -> u8 {
        self.row_outline_levels.get(&row).copied().unwrap_or(0)
    }

    pub fn set_row_outline_level(&mut self, row: u32, level: u8) {
        if level == 0 {
            self.row_outline_levels.remove(&row);
        } else {
            self.row_outline_levels.insert(row, level);
        }
    }

    pub fn default_column_width(&self) -> f64 {
        self.default_column_width
    }

    pub fn set_default_column_width(&mut self, width: f64) {
        self.default_column_width = width;
    }

    pub fn column_width(&self, col: u16) -> f64 {
        self.column_widths.get(&col).copied().unwrap_or(self.default_column_width)
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        if (width - self.default_column_width).abs() < 0.001 {
            self.column_widths.remove(&col);
        } else {
            self.column_widths.insert(col, width);
        }
    }

    pub fn is_column_hidden(&self, col: u16) -> bool {
        self.hidden_columns.get(&col).copied().unwrap_or(false)
    }

    pub fn set_column_hidden(&mut self, col: u16, hidden: bool) {
        if hidden {
            self.hidden_columns.insert(col, true);
        } else {
            self.hidden_columns.remove(&col);
        }
    }

    pub fn column_outline_level(&self, col: u16) -> u8 {
        self.column_outline_levels.get(&col).copied().unwrap_or(0)
    }

    pub fn set_column_outline_level(&mut self, col: u16, level: u8) {
        if level == 0 {
            self.column_outline_levels.remove(&col);
        } else {
            self.column_outline_levels.insert(col, level);
        }
    }

    pub fn custom_row_heights(&self) -> &BTreeMap<u32, f64> {
        &self.row_heights
    }

    pub fn hidden_rows(&self) -> &BTreeMap<u32, bool> {
        &self.hidden_rows
    }

    pub fn custom_column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    pub fn hidden_columns(&self) -> &BTreeMap<u16, bool> {
        &self.hidden_columns
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged_regions
    }

    /// Add a merge region, rejecting overlaps with any existing merge.
    pub fn add_merged_region(&mut self, range: CellRange) -> crate::error::Result<()> {
        if self.merged_regions.iter().any(|r| r.overlaps(&range)) {
            return Err(crate::error::Error::MergeOverlap(range.to_a1_string()));
        }
        self.merged_regions.push(range);
        Ok(())
    }

    pub fn remove_merged_region_containing(&mut self, addr: crate::CellAddress) -> Option<CellRange> {
        let idx = self.merged_regions.iter().position(|r| r.contains(&addr))?;
        Some(self.merged_regions.remove(idx))
    }

    pub fn clear_merged_regions(&mut self) {
        self.merged_regions.clear();
    }

    pub fn is_merged(&self, row: u32, col: u16) -> bool {
        let addr = crate::CellAddress::new(row, col);
        self.merged_regions.iter().any(|r| r.contains(&addr))
    }

    /// Whether a cell is a merge anchor (top-left of its merge), the only
    /// position that carries the value.
    pub fn is_merge_anchor(&self, row: u32, col: u16) -> bool {
        self.merged_regions.iter().any(|r| r.start.row == row && r.start.col == col)
    }
}

impl Clone for CellStorage {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            default_row_height: self.default_row_height,
            default_column_width: self.default_column_width,
            row_heights: self.row_heights.clone(),
            hidden_rows: self.hidden_rows.clone(),
            row_outline_levels: self.row_outline_levels.clone(),
            column_widths: self.column_widths.clone(),
            hidden_columns: self.hidden_columns.clone(),
            column_outline_levels: self.column_outline_levels.clone(),
            merged_regions: self.merged_regions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_basic_operations() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, CellData::new(CellValue::Number(Decimal::from(42))));
        let cell = storage.get(0, 0).unwrap();
        assert_eq!(cell.value.as_number(), Some(Decimal::from(42)));
        assert!(storage.get(1, 1).is_none());
    }

    #[test]
    fn test_empty_cells_not_stored() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, CellData::new(CellValue::Number(Decimal::from(42))));
        assert_eq!(storage.cell_count(), 1);
        storage.set(0, 0, CellData::empty());
        assert_eq!(storage.cell_count(), 0);
    }

    #[test]
    fn test_used_bounds() {
        let mut storage = CellStorage::new();
        assert!(storage.used_bounds().is_none());
        storage.set(5, 3, CellData::new(CellValue::Number(Decimal::ONE)));
        storage.set(10, 7, CellData::new(CellValue::Number(Decimal::from(2))));
        storage.set(2, 1, CellData::new(CellValue::Number(Decimal::from(3))));
        let (min_row, min_col, max_row, max_col) = storage.used_bounds().unwrap();
        assert_eq!((min_row, min_col, max_row, max_col), (2, 1, 10, 7));
    }

    #[test]
    fn test_merge_overlap_rejected() {
        let mut storage = CellStorage::new();
        storage.add_merged_region(CellRange::parse("A1:B2").unwrap()).unwrap();
        assert!(storage.add_merged_region(CellRange::parse("B2:C3").unwrap()).is_err());
        assert!(storage.add_merged_region(CellRange::parse("D1:E2").unwrap()).is_ok());
    }

    #[test]
    fn test_merge_anchor() {
        let mut storage = CellStorage::new();
        storage.add_merged_region(CellRange::parse("A1:B2").unwrap()).unwrap();
        assert!(storage.is_merge_anchor(0, 0));
        assert!(!storage.is_merge_anchor(0, 1));
        assert!(storage.is_merged(1, 1));
    }
}
