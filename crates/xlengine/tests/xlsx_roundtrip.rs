//! End-to-end tests: build a workbook in memory, write it to an `.xlsx`
//! byte buffer, read it back, and check the model round-trips.

use rust_decimal::Decimal;
use std::io::Cursor;
use xlengine::prelude::*;

fn round_trip(wb: &Workbook) -> Workbook {
    let mut buf = Vec::new();
    XlsxWriter::write(wb, Cursor::new(&mut buf)).unwrap();
    XlsxReader::read(Cursor::new(&buf)).unwrap()
}

#[test]
fn round_trips_numbers() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 42i64).unwrap();
    sheet.set_cell_value("B1", Decimal::new(314159, 5)).unwrap();
    sheet.set_cell_value("C1", Decimal::new(-1005, 1)).unwrap();
    sheet.set_cell_value("A2", 0i64).unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert_eq!(sheet2.get_value("A1").unwrap().as_number(), Some(Decimal::from(42)));
    assert_eq!(
        sheet2.get_value("B1").unwrap().as_number(),
        Some(Decimal::new(314159, 5))
    );
    assert_eq!(
        sheet2.get_value("C1").unwrap().as_number(),
        Some(Decimal::new(-1005, 1))
    );
    assert_eq!(sheet2.get_value("A2").unwrap().as_number(), Some(Decimal::ZERO));
}

#[test]
fn round_trips_strings_including_xml_special_characters() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Hello, World!").unwrap();
    sheet.set_cell_value("C1", "Special: <>&\"'").unwrap();
    sheet.set_cell_value("A2", "Multi\nLine").unwrap();
    sheet.set_cell_value("B2", "Unicode: \u{1F600}").unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert_eq!(sheet2.get_value("A1").unwrap().as_str(), Some("Hello, World!"));
    assert_eq!(sheet2.get_value("C1").unwrap().as_str(), Some("Special: <>&\"'"));
    assert_eq!(sheet2.get_value("A2").unwrap().as_str(), Some("Multi\nLine"));
    assert_eq!(sheet2.get_value("B2").unwrap().as_str(), Some("Unicode: \u{1F600}"));
}

#[test]
fn round_trips_booleans() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", true).unwrap();
    sheet.set_cell_value("B1", false).unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert_eq!(sheet2.get_value("A1").unwrap().as_bool(), Some(true));
    assert_eq!(sheet2.get_value("B1").unwrap().as_bool(), Some(false));
}

#[test]
fn round_trips_formula_source_text() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", 10i64).unwrap();
    sheet.set_cell_value("A2", 20i64).unwrap();
    sheet.set_cell_formula("A3", "=SUM(A1:A2)").unwrap();
    sheet.set_cell_formula("B1", "=A1*2").unwrap();
    sheet.set_cell_formula("C1", "=IF(A1>5,\"Yes\",\"No\")").unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert!(sheet2.get_value("A3").unwrap().is_formula());
    assert_eq!(sheet2.get_value("A3").unwrap().formula_text(), Some("SUM(A1:A2)"));
    assert_eq!(sheet2.get_value("B1").unwrap().formula_text(), Some("A1*2"));
    assert_eq!(
        sheet2.get_value("C1").unwrap().formula_text(),
        Some("IF(A1>5,\"Yes\",\"No\")")
    );
}

#[test]
fn round_trips_multiple_sheets() {
    let mut wb = Workbook::new();
    wb.add_worksheet_with_name("Data").unwrap();
    wb.add_worksheet_with_name("Summary").unwrap();

    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Sheet 1 Data").unwrap();
    let sheet2 = wb.worksheet_mut(1).unwrap();
    sheet2.set_cell_value("A1", "Data Sheet").unwrap();
    sheet2.set_cell_value("B1", 100i64).unwrap();
    wb.worksheet_mut(2).unwrap().set_cell_value("A1", "Summary").unwrap();

    let wb2 = round_trip(&wb);
    assert_eq!(wb2.sheet_count(), 3);
    assert_eq!(wb2.worksheet(0).unwrap().name(), "Sheet1");
    assert_eq!(wb2.worksheet(1).unwrap().name(), "Data");
    assert_eq!(wb2.worksheet(2).unwrap().name(), "Summary");

    assert_eq!(
        wb2.worksheet(0).unwrap().get_value("A1").unwrap().as_str(),
        Some("Sheet 1 Data")
    );
    assert_eq!(
        wb2.worksheet(1).unwrap().get_value("B1").unwrap().as_number(),
        Some(Decimal::from(100))
    );
    assert_eq!(
        wb2.worksheet(2).unwrap().get_value("A1").unwrap().as_str(),
        Some("Summary")
    );
}

#[test]
fn round_trips_mixed_types_in_one_sheet() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Name").unwrap();
    sheet.set_cell_value("A2", "Item 1").unwrap();
    sheet.set_cell_value("B2", Decimal::new(425, 1)).unwrap();
    sheet.set_cell_value("C2", true).unwrap();
    sheet.set_cell_formula("B3", "=SUM(B2:B2)").unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert_eq!(sheet2.get_value("A1").unwrap().as_str(), Some("Name"));
    assert_eq!(sheet2.get_value("B2").unwrap().as_number(), Some(Decimal::new(425, 1)));
    assert_eq!(sheet2.get_value("C2").unwrap().as_bool(), Some(true));
    assert!(sheet2.get_value("B3").unwrap().is_formula());
}

#[test]
fn round_trips_cells_at_large_row_and_column_indices() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value_at(0, 0, "A1").unwrap();
    sheet.set_cell_value_at(100, 25, "Z101").unwrap();
    sheet.set_cell_value_at(999, 51, "AZ1000").unwrap();
    sheet.set_cell_value_at(9999, 701, "ZZ10000").unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert_eq!(sheet2.get_value_at(0, 0).as_str(), Some("A1"));
    assert_eq!(sheet2.get_value_at(100, 25).as_str(), Some("Z101"));
    assert_eq!(sheet2.get_value_at(999, 51).as_str(), Some("AZ1000"));
    assert_eq!(sheet2.get_value_at(9999, 701).as_str(), Some("ZZ10000"));
}

#[test]
fn round_trips_sparse_data_leaving_gaps_empty() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Start").unwrap();
    sheet.set_cell_value("Z50", "Middle").unwrap();
    sheet.set_cell_value("A100", "End").unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert_eq!(sheet2.get_value("A1").unwrap().as_str(), Some("Start"));
    assert_eq!(sheet2.get_value("Z50").unwrap().as_str(), Some("Middle"));
    assert_eq!(sheet2.get_value("A100").unwrap().as_str(), Some("End"));
    assert!(sheet2.get_value("B1").unwrap().is_empty());
    assert!(sheet2.get_value("A2").unwrap().is_empty());
}

#[test]
fn round_trips_an_empty_workbook() {
    let wb = Workbook::new();
    let wb2 = round_trip(&wb);
    assert!(wb2.sheet_count() >= 1);
}

#[test]
fn round_trips_sheet_names_with_spaces_and_punctuation() {
    let mut wb = Workbook::empty();
    wb.add_worksheet_with_name("Data 2024").unwrap();
    wb.add_worksheet_with_name("Q1 Report").unwrap();
    wb.add_worksheet_with_name("Sales-Summary").unwrap();

    let wb2 = round_trip(&wb);
    assert_eq!(wb2.sheet_count(), 3);
    assert_eq!(wb2.worksheet(0).unwrap().name(), "Data 2024");
    assert_eq!(wb2.worksheet(1).unwrap().name(), "Q1 Report");
    assert_eq!(wb2.worksheet(2).unwrap().name(), "Sales-Summary");
}

#[test]
fn round_trips_row_heights_and_column_widths() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Tall row").unwrap();
    sheet.set_row_height(0, 30.0);
    sheet.set_row_height(2, 50.0);
    sheet.set_column_width(0, 20.0);
    sheet.set_column_width(2, 5.0);

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert!((sheet2.row_height(0) - 30.0).abs() < 0.1);
    assert!((sheet2.row_height(2) - 50.0).abs() < 0.1);
    assert!((sheet2.column_width(0) - 20.0).abs() < 0.1);
    assert!((sheet2.column_width(2) - 5.0).abs() < 0.1);
}

#[test]
fn round_trips_hidden_rows_and_columns() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "Visible").unwrap();
    sheet.set_cell_value("A2", "Hidden row").unwrap();
    sheet.set_row_hidden(1, true);
    sheet.set_column_hidden(1, true);

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert!(!sheet2.is_row_hidden(0));
    assert!(sheet2.is_row_hidden(1));
    assert!(!sheet2.is_column_hidden(0));
    assert!(sheet2.is_column_hidden(1));
}

#[test]
fn patch_preserves_unmodeled_parts_while_regenerating_cells() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "first").unwrap();

    let mut buf = Vec::new();
    XlsxWriter::write(&wb, Cursor::new(&mut buf)).unwrap();
    let (mut reopened, manifest) = XlsxReader::read_with_manifest(Cursor::new(&buf)).unwrap();
    reopened.worksheet_mut(0).unwrap().set_cell_value("A1", "second").unwrap();

    let mut patched = Vec::new();
    XlsxWriter::patch(&reopened, &manifest, Cursor::new(&mut patched)).unwrap();

    let final_wb = XlsxReader::read(Cursor::new(&patched)).unwrap();
    assert_eq!(
        final_wb.worksheet(0).unwrap().get_value("A1").unwrap().as_str(),
        Some("second")
    );
}
