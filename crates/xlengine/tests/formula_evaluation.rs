//! End-to-end formula evaluation tests: set formulas on a live workbook,
//! recalculate, and check the stored result — rather than driving the
//! evaluator directly, since that exercises the typecheck -> evaluate
//! pipeline the same way a caller actually uses it.

use rust_decimal::Decimal;
use xlengine::prelude::*;

fn calc(wb: &mut Workbook) {
    wb.calculate().unwrap();
}

#[test]
fn evaluates_arithmetic_and_precedence() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_formula("A1", "=1+2*3").unwrap();
    calc(&mut wb);
    assert_eq!(
        wb.worksheet(0).unwrap().effective_value_at(0, 0).as_number(),
        Some(Decimal::from(7))
    );
}

#[test]
fn evaluates_string_concatenation() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0)
        .unwrap()
        .set_cell_formula("A1", "=\"Hello \"&\"World\"")
        .unwrap();
    calc(&mut wb);
    assert_eq!(
        wb.worksheet(0).unwrap().effective_value_at(0, 0).as_str(),
        Some("Hello World")
    );
}

#[test]
fn evaluates_comparison() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_formula("A1", "=5>3").unwrap();
    calc(&mut wb);
    assert_eq!(
        wb.worksheet(0).unwrap().effective_value_at(0, 0).as_bool(),
        Some(true)
    );
}

#[test]
fn evaluates_sum_of_literals() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0)
        .unwrap()
        .set_cell_formula("A1", "=SUM(1,2,3,4,5)")
        .unwrap();
    calc(&mut wb);
    assert_eq!(
        wb.worksheet(0).unwrap().effective_value_at(0, 0).as_number(),
        Some(Decimal::from(15))
    );
}

#[test]
fn evaluates_if_branches() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_formula("A1", "=IF(1>0,\"Yes\",\"No\")").unwrap();
    sheet.set_cell_formula("A2", "=IF(1<0,\"Yes\",\"No\")").unwrap();
    calc(&mut wb);
    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(sheet.effective_value_at(0, 0).as_str(), Some("Yes"));
    assert_eq!(sheet.effective_value_at(1, 0).as_str(), Some("No"));
}

#[test]
fn evaluates_with_cell_references() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 10i64).unwrap();
    sheet.set_cell_value("B1", 5i64).unwrap();
    sheet.set_cell_formula("A2", "=A1").unwrap();
    sheet.set_cell_formula("A3", "=A1+B1").unwrap();
    sheet.set_cell_formula("A4", "=A1>B1").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(sheet.effective_value_at(1, 0).as_number(), Some(Decimal::from(10)));
    assert_eq!(sheet.effective_value_at(2, 0).as_number(), Some(Decimal::from(15)));
    assert_eq!(sheet.effective_value_at(3, 0).as_bool(), Some(true));
}

#[test]
fn evaluates_aggregates_over_a_range() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 10i64).unwrap();
    sheet.set_cell_value("A2", 20i64).unwrap();
    sheet.set_cell_value("A3", 30i64).unwrap();
    sheet.set_cell_formula("B1", "=SUM(A1:A3)").unwrap();
    sheet.set_cell_formula("B2", "=AVERAGE(A1:A3)").unwrap();
    sheet.set_cell_formula("B3", "=MIN(A1:A3)").unwrap();
    sheet.set_cell_formula("B4", "=MAX(A1:A3)").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(sheet.effective_value_at(0, 1).as_number(), Some(Decimal::from(60)));
    assert_eq!(sheet.effective_value_at(1, 1).as_number(), Some(Decimal::from(20)));
    assert_eq!(sheet.effective_value_at(2, 1).as_number(), Some(Decimal::from(10)));
    assert_eq!(sheet.effective_value_at(3, 1).as_number(), Some(Decimal::from(30)));
}

#[test]
fn evaluates_nested_formulas() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 100i64).unwrap();
    sheet.set_cell_value("A2", 50i64).unwrap();
    sheet.set_cell_value("B1", "0.1").unwrap();
    sheet.set_cell_formula("C1", "=IF(A1>A2,A1*B1,A2*B1)").unwrap();
    sheet.set_cell_formula("C2", "=SUM(A1,A2)*B1").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(
        sheet.effective_value_at(0, 2).as_number(),
        Some(Decimal::new(10, 0))
    );
    assert_eq!(
        sheet.effective_value_at(1, 2).as_number(),
        Some(Decimal::new(15, 0))
    );
}

#[test]
fn division_by_zero_yields_an_error() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_formula("A1", "=1/0").unwrap();
    sheet.set_cell_formula("A2", "=1/0+5").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert!(matches!(sheet.effective_value_at(0, 0), CellValue::Error(_)));
    assert!(matches!(sheet.effective_value_at(1, 0), CellValue::Error(_)));
}

#[test]
fn empty_cells_act_as_zero_in_arithmetic_but_are_skipped_by_sum() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 10i64).unwrap();
    // A2 left empty
    sheet.set_cell_value("A3", 30i64).unwrap();
    sheet.set_cell_formula("B1", "=A1+A2").unwrap();
    sheet.set_cell_formula("B2", "=SUM(A1:A3)").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(sheet.effective_value_at(0, 1).as_number(), Some(Decimal::from(10)));
    assert_eq!(sheet.effective_value_at(1, 1).as_number(), Some(Decimal::from(40)));
}

#[test]
fn concatenates_cell_text() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Hello").unwrap();
    sheet.set_cell_value("B1", "World").unwrap();
    sheet.set_cell_formula("C1", "=A1&\" \"&B1").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(sheet.effective_value_at(0, 2).as_str(), Some("Hello World"));
}

#[test]
fn evaluates_boolean_functions() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_formula("A1", "=AND(TRUE,TRUE,TRUE)").unwrap();
    sheet.set_cell_formula("A2", "=AND(TRUE,FALSE,TRUE)").unwrap();
    sheet.set_cell_formula("A3", "=OR(FALSE,FALSE,TRUE)").unwrap();
    sheet.set_cell_formula("A4", "=NOT(FALSE)").unwrap();
    sheet.set_cell_formula("A5", "=AND(NOT(FALSE),OR(TRUE,FALSE))").unwrap();
    calc(&mut wb);

    let sheet = wb.worksheet(0).unwrap();
    assert_eq!(sheet.effective_value_at(0, 0).as_bool(), Some(true));
    assert_eq!(sheet.effective_value_at(1, 0).as_bool(), Some(false));
    assert_eq!(sheet.effective_value_at(2, 0).as_bool(), Some(true));
    assert_eq!(sheet.effective_value_at(3, 0).as_bool(), Some(true));
    assert_eq!(sheet.effective_value_at(4, 0).as_bool(), Some(true));
}
