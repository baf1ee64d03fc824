//! Round-trip tests for cell styling: fonts, borders, fills, alignment,
//! and number formats survive a write/read cycle through the style
//! registry.

use rust_decimal::Decimal;
use std::io::Cursor;
use xlengine::prelude::*;

fn round_trip(wb: &Workbook) -> Workbook {
    let mut buf = Vec::new();
    XlsxWriter::write(wb, Cursor::new(&mut buf)).unwrap();
    XlsxReader::read(Cursor::new(&buf)).unwrap()
}

fn addr(a1: &str) -> (u32, u16) {
    let addr = CellAddress::parse(a1).unwrap();
    (addr.row, addr.col)
}

#[test]
fn round_trips_font_styles() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Bold").unwrap();
    wb.worksheet_mut(0).unwrap().set_cell_value("A2", "Italic").unwrap();

    let (r1, c1) = addr("A1");
    let style_a1 = Style::new().bold(true).font_color(Color::rgb(255, 0, 0));
    wb.set_cell_style(0, r1, c1, style_a1).unwrap();

    let (r2, c2) = addr("A2");
    let mut style_a2 = Style::new().italic(true).font_size(14.0);
    style_a2.font.name = "Arial".to_string();
    wb.set_cell_style(0, r2, c2, style_a2).unwrap();

    let wb2 = round_trip(&wb);
    let style1 = wb2.cell_style(0, r1, c1).unwrap();
    assert!(style1.font.bold);
    assert_eq!(style1.font.color, Color::rgb(255, 0, 0));

    let style2 = wb2.cell_style(0, r2, c2).unwrap();
    assert!(style2.font.italic);
    assert_eq!(style2.font.size, 14.0);
    assert_eq!(style2.font.name, "Arial");
}

#[test]
fn round_trips_border_styles() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Boxed").unwrap();
    wb.worksheet_mut(0).unwrap().set_cell_value("B1", "Mixed").unwrap();

    let (r1, c1) = addr("A1");
    let mut style1 = Style::new();
    style1.border = BorderStyle::outline(BorderLineStyle::Thin, Color::BLACK);
    wb.set_cell_style(0, r1, c1, style1).unwrap();

    let (r2, c2) = addr("B1");
    let mut style2 = Style::new();
    style2.border = BorderStyle::new()
        .with_left(BorderLineStyle::Thick, Color::rgb(255, 0, 0))
        .with_right(BorderLineStyle::Dashed, Color::rgb(0, 255, 0))
        .with_top(BorderLineStyle::Double, Color::rgb(0, 0, 255))
        .with_bottom(BorderLineStyle::MediumDashed, Color::rgb(0, 0, 255));
    wb.set_cell_style(0, r2, c2, style2).unwrap();

    let wb2 = round_trip(&wb);
    let border1 = &wb2.cell_style(0, r1, c1).unwrap().border;
    assert_eq!(border1.left, Some(BorderEdge::new(BorderLineStyle::Thin, Color::BLACK)));
    assert_eq!(border1.right, Some(BorderEdge::new(BorderLineStyle::Thin, Color::BLACK)));
    assert_eq!(border1.top, Some(BorderEdge::new(BorderLineStyle::Thin, Color::BLACK)));
    assert_eq!(border1.bottom, Some(BorderEdge::new(BorderLineStyle::Thin, Color::BLACK)));

    let border2 = &wb2.cell_style(0, r2, c2).unwrap().border;
    assert_eq!(
        border2.left,
        Some(BorderEdge::new(BorderLineStyle::Thick, Color::rgb(255, 0, 0)))
    );
    assert_eq!(
        border2.right,
        Some(BorderEdge::new(BorderLineStyle::Dashed, Color::rgb(0, 255, 0)))
    );
    assert_eq!(
        border2.top,
        Some(BorderEdge::new(BorderLineStyle::Double, Color::rgb(0, 0, 255)))
    );
    assert_eq!(
        border2.bottom,
        Some(BorderEdge::new(BorderLineStyle::MediumDashed, Color::rgb(0, 0, 255)))
    );
}

#[test]
fn round_trips_fill_styles() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Filled").unwrap();

    let (row, col) = addr("A1");
    let style = Style::new().fill_color(Color::rgb(255, 255, 0));
    wb.set_cell_style(0, row, col, style).unwrap();

    let wb2 = round_trip(&wb);
    let style = wb2.cell_style(0, row, col).unwrap();
    match &style.fill {
        FillStyle::Solid { color } => assert_eq!(color.to_rgb(), (255, 255, 0)),
        other => panic!("expected a solid fill, got {other:?}"),
    }
}

#[test]
fn round_trips_alignment_styles() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Centered").unwrap();

    let (row, col) = addr("A1");
    let style = Style::new()
        .horizontal_alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Top)
        .wrap_text(true);
    wb.set_cell_style(0, row, col, style).unwrap();

    let wb2 = round_trip(&wb);
    let style = wb2.cell_style(0, row, col).unwrap();
    assert_eq!(style.alignment.horizontal, HorizontalAlignment::Center);
    assert_eq!(style.alignment.vertical, VerticalAlignment::Top);
    assert!(style.alignment.wrap_text);
}

#[test]
fn round_trips_number_format_styles() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", Decimal::new(12345, 1)).unwrap();
    sheet.set_cell_value("A2", Decimal::new(5, 1)).unwrap();

    let (r1, c1) = addr("A1");
    wb.set_cell_style(0, r1, c1, Style::new().number_format("$#,##0.00")).unwrap();

    let (r2, c2) = addr("A2");
    let mut style2 = Style::new();
    style2.number_format = NumberFormat::BuiltIn(NumberFormat::ID_PERCENT_INT);
    wb.set_cell_style(0, r2, c2, style2).unwrap();

    let wb2 = round_trip(&wb);
    match &wb2.cell_style(0, r1, c1).unwrap().number_format {
        NumberFormat::Custom(fmt) => assert_eq!(fmt, "$#,##0.00"),
        other => panic!("expected a custom number format, got {other:?}"),
    }
    match &wb2.cell_style(0, r2, c2).unwrap().number_format {
        NumberFormat::BuiltIn(id) => assert_eq!(*id, NumberFormat::ID_PERCENT_INT),
        other => panic!("expected a built-in number format, got {other:?}"),
    }
}

#[test]
fn round_trips_style_only_cells() {
    let mut wb = Workbook::new();
    let (row, col) = addr("A1");
    wb.set_cell_style(0, row, col, Style::new().fill_color(Color::rgb(200, 200, 200)))
        .unwrap();

    let wb2 = round_trip(&wb);
    let sheet2 = wb2.worksheet(0).unwrap();
    assert!(sheet2.get_value_at(row, col).is_empty());
    let style = wb2.cell_style(0, row, col).unwrap();
    match &style.fill {
        FillStyle::Solid { color } => assert_eq!(color.to_rgb(), (200, 200, 200)),
        other => panic!("expected a solid fill, got {other:?}"),
    }
}

#[test]
fn round_trips_combined_styles() {
    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Header").unwrap();

    let (row, col) = addr("A1");
    let mut style = Style::new()
        .bold(true)
        .font_color(Color::WHITE)
        .fill_color(Color::rgb(0, 0, 128))
        .horizontal_alignment(HorizontalAlignment::Center)
        .number_format("0.00%");
    style.border = BorderStyle::all(BorderLineStyle::Medium, Color::BLACK);
    wb.set_cell_style(0, row, col, style).unwrap();

    let wb2 = round_trip(&wb);
    let style = wb2.cell_style(0, row, col).unwrap();
    assert!(style.font.bold);
    assert_eq!(style.font.color, Color::WHITE);
    match &style.fill {
        FillStyle::Solid { color } => assert_eq!(color.to_rgb(), (0, 0, 128)),
        other => panic!("expected a solid fill, got {other:?}"),
    }
    assert_eq!(style.alignment.horizontal, HorizontalAlignment::Center);
    assert_eq!(style.number_format, NumberFormat::Custom("0.00%".to_string()));
    assert_eq!(
        style.border.left,
        Some(BorderEdge::new(BorderLineStyle::Medium, Color::BLACK))
    );
}

#[test]
fn round_trips_styles_multiple_sheets() {
    let mut wb = Workbook::new();
    wb.add_worksheet_with_name("Sheet2").unwrap();

    wb.worksheet_mut(0).unwrap().set_cell_value("A1", "Sheet1 cell").unwrap();
    wb.worksheet_mut(1).unwrap().set_cell_value("A1", "Sheet2 cell").unwrap();

    wb.set_cell_style(0, 0, 0, Style::new().fill_color(Color::RED)).unwrap();
    wb.set_cell_style(1, 0, 0, Style::new().fill_color(Color::BLUE)).unwrap();

    let wb2 = round_trip(&wb);
    match &wb2.cell_style(0, 0, 0).unwrap().fill {
        FillStyle::Solid { color } => assert_eq!(color.to_rgb(), (255, 0, 0)),
        other => panic!("expected a solid fill, got {other:?}"),
    }
    match &wb2.cell_style(1, 0, 0).unwrap().fill {
        FillStyle::Solid { color } => assert_eq!(color.to_rgb(), (0, 0, 255)),
        other => panic!("expected a solid fill, got {other:?}"),
    }
}
