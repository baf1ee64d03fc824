//! Workbook calculation orchestrator.
//!
//! Walks every formula cell in a [`Workbook`], typechecks and parses it,
//! builds a [`DependencyGraph`] from the references it reads, and
//! evaluates every formula cell in dependency order. A cell involved in a
//! cycle gets `#REF!` rather than an iterative guess — this engine has no
//! iterative-calculation mode.
//!
//! # Example
//!
//! ```rust,ignore
//! use xlengine::prelude::*;
//! use xlengine::calculation::WorkbookCalculationExt;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10i64).unwrap();
//! sheet.set_cell_value("A2", 20i64).unwrap();
//! sheet.set_cell_formula("A3", "=A1+A2").unwrap();
//!
//! let stats = workbook.calculate().unwrap();
//! println!("Calculated {} cells", stats.cells_calculated);
//! ```

use std::collections::HashMap;

use xlengine_core::{CellAddress, CellError, CellRange, CellValue, Error, Result, Workbook};
use xlengine_formula::dependency::{collect_refs, CellKey, DependencyGraph};
use xlengine_formula::evaluator::{EvalCtx, EvalOptions, Env, FormulaValue};
use xlengine_formula::parser::parse_formula;
use xlengine_formula::typecheck::{typecheck, ExpectedType};
use xlengine_formula::ast::TExpr;

/// Options for workbook calculation.
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Whether volatile functions (NOW, TODAY, RAND, RANDBETWEEN) are
    /// recalculated on every pass, or left at their cached value.
    pub calculate_volatile: bool,
    pub eval: EvalOptions,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            calculate_volatile: true,
            eval: EvalOptions::default(),
        }
    }
}

/// Statistics from a calculation run.
#[derive(Debug, Clone, Default)]
pub struct CalculationStats {
    pub formula_count: usize,
    pub cells_calculated: usize,
    pub circular_references: usize,
    pub volatile_cells: usize,
    pub parse_errors: usize,
}

/// Extension trait adding full-workbook recalculation to [`Workbook`].
pub trait WorkbookCalculationExt {
    fn calculate(&mut self) -> Result<CalculationStats>;
    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> Result<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats> {
        let mut stats = CalculationStats::default();
        let mut parsed: HashMap<CellKey, TExpr> = HashMap::new();
        let mut graph = DependencyGraph::new();

        let sheet_names: Vec<String> = self.worksheets().map(|s| s.name().to_string()).collect();
        let sheet_index = |name: &str| sheet_names.iter().position(|n| n == name);

        for sheet_idx in 0..self.sheet_count() {
            let sheet = self
                .worksheet(sheet_idx)
                .ok_or_else(|| Error::other(format!("sheet {sheet_idx} not found")))?;

            let formulas: Vec<(u32, u16, String)> = sheet
                .formula_cells()
                .map(|(row, col, text)| (row, col, text.to_string()))
                .collect();

            for (row, col, text) in formulas {
                let key = CellKey::new(sheet_idx, row, col);
                match parse_formula(&text).and_then(|expr| typecheck(expr, ExpectedType::Any)) {
                    Ok(expr) => {
                        if options.calculate_volatile && expr_is_volatile(&expr) {
                            stats.volatile_cells += 1;
                        }
                        for precedent in collect_refs(&expr, sheet_idx, &sheet_index) {
                            graph.add_dependency(precedent, key);
                        }
                        parsed.insert(key, expr);
                    }
                    Err(_) => {
                        stats.parse_errors += 1;
                    }
                }
            }
        }

        stats.formula_count = parsed.len() + stats.parse_errors;
        if parsed.is_empty() {
            return Ok(stats);
        }

        let all_cells: Vec<CellKey> = parsed.keys().copied().collect();
        let order = graph.get_recalc_order(&all_cells);
        stats.circular_references = all_cells
            .iter()
            .filter(|&&k| graph.has_circular_reference(k))
            .count();

        // Cells that never made it into `order` because they participate
        // in a cycle still need a value written — `#REF!`.
        let cyclic: Vec<CellKey> = all_cells
            .iter()
            .copied()
            .filter(|k| !order.contains(k))
            .collect();

        for key in order.into_iter().filter(|k| parsed.contains_key(k)) {
            let expr = parsed.get(&key).expect("filtered on contains_key above");
            let value = {
                let env = WorkbookEnv {
                    workbook: self,
                    sheet_names: &sheet_names,
                    current_sheet: key.sheet,
                    current_row: key.row,
                    current_col: key.col,
                };
                let ctx = EvalCtx::new(&env, options.eval);
                ctx.eval(expr)
            };
            write_result(self, key, value);
            stats.cells_calculated += 1;
        }

        for key in cyclic {
            write_result(self, key, FormulaValue::Error(CellError::Ref));
            stats.cells_calculated += 1;
        }

        Ok(stats)
    }
}

fn write_result(workbook: &mut Workbook, key: CellKey, value: FormulaValue) {
    if let Some(sheet) = workbook.worksheet_mut(key.sheet) {
        let _ = sheet.set_formula_result(key.row, key.col, value.into());
    }
}

fn expr_is_volatile(expr: &TExpr) -> bool {
    match expr {
        TExpr::Call { spec, args } => {
            spec.volatile
                || args.iter().any(|arg| match arg {
                    xlengine_formula::ast::Arg::Expr(e) => expr_is_volatile(e),
                    xlengine_formula::ast::Arg::Range(_) => false,
                })
        }
        TExpr::Arith { left, right, .. } | TExpr::Compare { left, right, .. } => {
            expr_is_volatile(left) || expr_is_volatile(right)
        }
        TExpr::Concat { left, right } => expr_is_volatile(left) || expr_is_volatile(right),
        TExpr::Neg(inner)
        | TExpr::Percent(inner)
        | TExpr::ToInt(inner)
        | TExpr::DateToSerial(inner)
        | TExpr::DateTimeToSerial(inner) => expr_is_volatile(inner),
        TExpr::Array(rows) => rows.iter().any(|row| row.iter().any(expr_is_volatile)),
        _ => false,
    }
}

/// [`Env`] bound to a live [`Workbook`] at a fixed current-cell position,
/// constructed fresh for each formula since `EvalCtx` borrows it and the
/// workbook is mutated (for `set_formula_result`) between formulas.
struct WorkbookEnv<'a> {
    workbook: &'a Workbook,
    sheet_names: &'a [String],
    current_sheet: usize,
    current_row: u32,
    current_col: u16,
}

impl<'a> Env for WorkbookEnv<'a> {
    fn cell_value(&self, sheet: Option<&str>, row: u32, col: u16) -> CellValue {
        let sheet_idx = match sheet {
            Some(name) => match self.sheet_index(name) {
                Some(idx) => idx,
                None => return CellValue::Error(CellError::Ref),
            },
            None => self.current_sheet,
        };
        self.workbook.value_at(sheet_idx, CellAddress::new(row, col))
    }

    fn current_sheet(&self) -> &str {
        &self.sheet_names[self.current_sheet]
    }

    fn current_row(&self) -> u32 {
        self.current_row
    }

    fn current_col(&self) -> u16 {
        self.current_col
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheet_names.iter().position(|n| n == name)
    }

    fn used_range(&self, sheet: Option<&str>) -> Option<CellRange> {
        let idx = match sheet {
            Some(name) => self.sheet_index(name)?,
            None => self.current_sheet,
        };
        self.workbook.worksheet(idx)?.used_range()
    }

    fn resolve_name(&self, name: &str) -> Option<String> {
        self.workbook
            .get_named_range(name, self.current_sheet)
            .map(|range| range.refers_to.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn calculates_simple_sum() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 10i64).unwrap();
        sheet.set_cell_value("A2", 20i64).unwrap();
        sheet.set_cell_formula("A3", "=A1+A2").unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(
            sheet.effective_value_at(2, 0).as_number(),
            Some(Decimal::from(30))
        );
    }

    #[test]
    fn calculates_a_dependency_chain_in_order() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 5i64).unwrap();
        sheet.set_cell_formula("A2", "=A1*2").unwrap();
        sheet.set_cell_formula("A3", "=A2+10").unwrap();

        workbook.calculate().unwrap();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(
            sheet.effective_value_at(1, 0).as_number(),
            Some(Decimal::from(10))
        );
        assert_eq!(
            sheet.effective_value_at(2, 0).as_number(),
            Some(Decimal::from(20))
        );
    }

    #[test]
    fn sum_over_a_range() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        for (row, v) in [1i64, 2, 3, 4].into_iter().enumerate() {
            sheet.set_cell_value_at(row as u32, 0, v).unwrap();
        }
        sheet.set_cell_formula("A5", "=SUM(A1:A4)").unwrap();

        workbook.calculate().unwrap();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(
            sheet.effective_value_at(4, 0).as_number(),
            Some(Decimal::from(10))
        );
    }

    #[test]
    fn circular_reference_resolves_to_ref_error() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_formula("A1", "=B1").unwrap();
        sheet.set_cell_formula("B1", "=A1").unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.circular_references, 2);

        let sheet = workbook.worksheet(0).unwrap();
        assert!(matches!(
            sheet.effective_value_at(0, 0),
            CellValue::Error(CellError::Ref)
        ));
        assert!(matches!(
            sheet.effective_value_at(0, 1),
            CellValue::Error(CellError::Ref)
        ));
    }

    #[test]
    fn volatile_function_is_counted() {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_formula("A1", "=NOW()").unwrap();
        sheet.set_cell_formula("A2", "=SUM(1,2)").unwrap();

        let stats = workbook.calculate().unwrap();
        assert_eq!(stats.volatile_cells, 1);
    }

    #[test]
    fn cross_sheet_reference_resolves_by_name() {
        let mut workbook = Workbook::new();
        workbook.worksheet_mut(0).unwrap().set_cell_value("A1", 100i64).unwrap();
        workbook.add_worksheet_with_name("Sheet2").unwrap();
        let sheet2 = workbook.worksheet_mut(1).unwrap();
        sheet2.set_cell_value("A1", 50i64).unwrap();
        sheet2.set_cell_formula("A2", "=Sheet1!A1+A1").unwrap();

        workbook.calculate().unwrap();

        let sheet2 = workbook.worksheet(1).unwrap();
        assert_eq!(
            sheet2.effective_value_at(1, 0).as_number(),
            Some(Decimal::from(150))
        );
    }
}
