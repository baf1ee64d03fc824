//! Patch monoid for sheet edits.
//!
//! A [`Patch`] is a list of [`PatchOp`]s applied left-to-right, later ops
//! overriding earlier ones that touch the same cell. Concatenation
//! (`Patch::then`) is associative and the empty patch is an identity
//! under [`Patch::apply`], so callers can build up an edit out of smaller
//! pieces in any grouping and get the same result.

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::worksheet::Worksheet;

/// A single edit operation making up a [`Patch`].
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Write a cell's value. Writing [`CellValue::Empty`] removes the cell.
    Put(CellAddress, CellValue),
    /// Remove a cell's value and style, restoring it to storage-empty
    Remove(CellAddress),
    /// Assign a style-registry index to a cell
    SetStyle(CellAddress, u32),
    /// Merge a range of cells
    Merge(CellRange),
    /// Unmerge the region containing an address, if any
    Unmerge(CellAddress),
    /// Set a row's height
    SetRowHeight(u32, f64),
    /// Set a row's hidden flag
    SetRowHidden(u32, bool),
    /// Set a column's width
    SetColumnWidth(u16, f64),
    /// Set a column's hidden flag
    SetColumnHidden(u16, bool),
}

/// An ordered sequence of [`PatchOp`]s. Forms a monoid under [`Patch::then`]
/// with [`Patch::empty`] as identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

impl Patch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(op: PatchOp) -> Self {
        Self { ops: vec![op] }
    }

    pub fn put(addr: CellAddress, value: CellValue) -> Self {
        Self::of(PatchOp::Put(addr, value))
    }

    pub fn remove(addr: CellAddress) -> Self {
        Self::of(PatchOp::Remove(addr))
    }

    pub fn set_style(addr: CellAddress, style_index: u32) -> Self {
        Self::of(PatchOp::SetStyle(addr, style_index))
    }

    /// Concatenate two patches; the result replays `self`'s ops followed
    /// by `other`'s, so ops in `other` win where they touch the same cell.
    pub fn then(mut self, other: Patch) -> Self {
        self.ops.extend(other.ops);
        self
    }

    pub fn push(&mut self, op: PatchOp) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Apply every op in order to a worksheet, mutating it in place.
    pub fn apply(&self, sheet: &mut Worksheet) -> crate::error::Result<()> {
        for op in &self.ops {
            apply_op(sheet, op)?;
        }
        Ok(())
    }
}

fn apply_op(sheet: &mut Worksheet, op: &PatchOp) -> crate::error::Result<()> {
    match op {
        PatchOp::Put(addr, value) => {
            sheet.set_value_at(addr.row, addr.col, value.clone());
        }
        PatchOp::Remove(addr) => {
            sheet.remove_cell_at(addr.row, addr.col);
        }
        PatchOp::SetStyle(addr, style_index) => {
            sheet.set_style_at(addr.row, addr.col, *style_index);
        }
        PatchOp::Merge(range) => {
            sheet.merge(*range)?;
        }
        PatchOp::Unmerge(addr) => {
            sheet.unmerge_containing(*addr);
        }
        PatchOp::SetRowHeight(row, height) => {
            sheet.set_row_height(*row, *height);
        }
        PatchOp::SetRowHidden(row, hidden) => {
            sheet.set_row_hidden(*row, *hidden);
        }
        PatchOp::SetColumnWidth(col, width) => {
            sheet.set_column_width(*col, *width);
        }
        PatchOp::SetColumnHidden(col, hidden) => {
            sheet.set_column_hidden(*col, *hidden);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_monoid_identity() {
        let addr = CellAddress::new(0, 0);
        let p = Patch::put(addr, CellValue::Number(Decimal::ONE));
        assert_eq!(p.clone().then(Patch::empty()), p);
        assert_eq!(Patch::empty().then(p.clone()), p);
    }

    #[test]
    fn test_monoid_associativity() {
        let addr = CellAddress::new(0, 0);
        let p1 = Patch::put(addr, CellValue::Number(Decimal::from(1)));
        let p2 = Patch::put(addr, CellValue::Number(Decimal::from(2)));
        let p3 = Patch::set_style(addr, 5);

        let left = p1.clone().then(p2.clone()).then(p3.clone());
        let right = p1.then(p2.then(p3));
        assert_eq!(left, right);
    }

    #[test]
    fn test_apply_later_overrides_earlier() {
        let mut sheet = Worksheet::new("Sheet1");
        let addr = CellAddress::new(0, 0);
        let patch = Patch::put(addr, CellValue::Number(Decimal::from(1)))
            .then(Patch::put(addr, CellValue::Number(Decimal::from(2))))
            .then(Patch::set_style(addr, 7));
        patch.apply(&mut sheet).unwrap();
        let cell = sheet.cell_at(0, 0).unwrap();
        assert_eq!(cell.value.as_number(), Some(Decimal::from(2)));
        assert_eq!(cell.style_index, 7);
    }
}
