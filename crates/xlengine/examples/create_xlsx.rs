//! Build a small workbook with formulas, calculate it, and save it as
//! `.xlsx`.

use xlengine::prelude::*;

fn main() -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();

    sheet.set_cell_value("A1", "Name")?;
    sheet.set_cell_value("B1", "Value")?;
    sheet.set_cell_value("C1", "Double")?;

    sheet.set_cell_value("A2", "Item 1")?;
    sheet.set_cell_value("B2", 100i64)?;
    sheet.set_cell_formula("C2", "=B2*2")?;

    sheet.set_cell_value("A3", "Item 2")?;
    sheet.set_cell_value("B3", 200i64)?;
    sheet.set_cell_formula("C3", "=B3*2")?;

    sheet.set_cell_value("A4", "Total")?;
    sheet.set_cell_formula("B4", "=SUM(B2:B3)")?;
    sheet.set_cell_formula("C4", "=SUM(C2:C3)")?;

    let stats = workbook.calculate()?;
    println!(
        "calculated {} formulas ({} parse errors)",
        stats.cells_calculated, stats.parse_errors
    );

    workbook.save("/tmp/test.xlsx")?;
    println!("wrote /tmp/test.xlsx");

    let sheet = workbook.worksheet(0).unwrap();
    println!("C2 (=B2*2): {:?}", sheet.effective_value_at(1, 2));
    println!("C3 (=B3*2): {:?}", sheet.effective_value_at(2, 2));
    println!("B4 (=SUM(B2:B3)): {:?}", sheet.effective_value_at(3, 1));
    println!("C4 (=SUM(C2:C3)): {:?}", sheet.effective_value_at(3, 2));

    Ok(())
}
