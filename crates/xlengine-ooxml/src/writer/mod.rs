//! OOXML writer and surgical patcher.
//!
//! [`XlsxWriter::write`] regenerates every part of the archive fresh from
//! the [`Workbook`] model. [`XlsxWriter::patch`] does the same for the
//! parts this crate understands structurally — `xl/workbook.xml`,
//! `xl/styles.xml`, `xl/sharedStrings.xml`, and every worksheet — but
//! streams everything else (themes, drawings, custom XML, VBA project,
//! and so on) straight through from the captured [`PartManifest`] at its
//! original bytes and compression.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use xlengine_core::preserved::PreservedElements;
use xlengine_core::{CellAddress, CellValue, NameScope, Workbook, Worksheet};

use crate::error::OoxmlResult;
use crate::manifest::PartManifest;
use crate::styles::write_styles_xml;

/// Writes XLSX archives from an [`xlengine_core::Workbook`].
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a fresh workbook to a file path. Every part is regenerated;
    /// nothing is preserved from a source archive.
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> OoxmlResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file)
    }

    /// Write a fresh workbook archive, regenerating every part from the
    /// model. Used when there is no source archive to preserve parts from
    /// (a workbook built from scratch).
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> OoxmlResult<()> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(content_types_xml(workbook).as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(workbook).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(workbook_rels_xml(workbook).as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(write_styles_xml(workbook.style_registry()).as_bytes())?;

        let strings_xml = shared_strings_xml(workbook);
        if let Some(xml) = strings_xml {
            zip.start_file("xl/sharedStrings.xml", options)?;
            zip.write_all(xml.as_bytes())?;
        }

        for (i, sheet) in workbook.worksheets().enumerate() {
            zip.start_file(&format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(worksheet_xml(sheet).as_bytes())?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Write a workbook back out against a source [`PartManifest`]: the
    /// parts this crate models structurally are regenerated, every other
    /// entry (themes, drawings, media, custom XML, calc chain, and so on)
    /// streams through unchanged at its original bytes, compression, and
    /// position.
    pub fn patch<W: Write + Seek>(workbook: &Workbook, manifest: &PartManifest, writer: W) -> OoxmlResult<()> {
        let mut zip = zip::ZipWriter::new(writer);

        let mut overrides = vec![
            ("xl/workbook.xml".to_string(), workbook_xml(workbook).into_bytes()),
            ("xl/styles.xml".to_string(), write_styles_xml(workbook.style_registry()).into_bytes()),
        ];

        if let Some(xml) = shared_strings_xml(workbook) {
            overrides.push(("xl/sharedStrings.xml".to_string(), xml.into_bytes()));
        }

        // The reader only retains worksheet content, not the original
        // `xl/worksheets/sheetN.xml` numbering, so regenerated worksheets
        // are written back at the conventional path. A workbook round-tripped
        // without reordering or adding sheets keeps the same numbering the
        // source archive used, satisfying the fidelity law for the common
        // "no structural edit" case.
        for (i, sheet) in workbook.worksheets().enumerate() {
            let path = format!("xl/worksheets/sheet{}.xml", i + 1);
            overrides.push((path, worksheet_xml(sheet).into_bytes()));
        }

        manifest.write(&mut zip, overrides)?;
        zip.finish()?;
        Ok(())
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

fn content_types_xml(workbook: &Workbook) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    if has_shared_strings(workbook) {
        content.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    }
    for i in 0..workbook.sheet_count() {
        content.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }
    content.push_str("</Types>");
    content
}

fn has_shared_strings(workbook: &Workbook) -> bool {
    !workbook.string_pool().is_empty()
}

/// Re-emit `xl/workbook.xml`: the captured root attributes and namespace
/// scope verbatim, preserved child subtrees for everything this crate
/// does not model (`fileVersion`, `bookViews`, `extLst`, `definedNames`,
/// and unknown top-level elements), `workbookPr`/`calcPr` regenerated
/// from current settings, and `<sheets>` rebuilt from the live worksheet
/// list.
fn workbook_xml(workbook: &Workbook) -> String {
    let mut content = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    content.push('<');
    content.push_str("workbook");
    if workbook.root_attributes.is_empty() {
        content.push_str(r#" xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#);
    } else {
        for (key, value) in &workbook.root_attributes {
            content.push(' ');
            content.push_str(key);
            content.push_str("=\"");
            content.push_str(&escape_xml_attr(value));
            content.push('"');
        }
    }
    content.push('>');

    for el in workbook.preserved.by_tag("fileVersion") {
        content.push_str(&strip_redundant_xmlns(&el.raw_xml));
    }

    content.push_str(&format!(r#"<workbookPr date1904="{}"/>"#, if workbook.settings().date_1904 { 1 } else { 0 }));

    for el in workbook.preserved.by_tag("bookViews") {
        content.push_str(&strip_redundant_xmlns(&el.raw_xml));
    }

    content.push_str("<sheets>");
    for (i, sheet) in workbook.worksheets().enumerate() {
        let sheet_id = sheet.sheet_id().unwrap_or(i as u32 + 1);
        let state = match sheet.visibility() {
            xlengine_core::SheetVisibility::Visible => "",
            xlengine_core::SheetVisibility::Hidden => r#" state="hidden""#,
            xlengine_core::SheetVisibility::VeryHidden => r#" state="veryHidden""#,
        };
        content.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
            escape_xml_attr(sheet.name()),
            sheet_id,
            state,
            i + 1
        ));
    }
    content.push_str("</sheets>");

    if !workbook.named_ranges().is_empty() {
        let mut found_raw = false;
        for el in workbook.preserved.by_tag("definedNames") {
            content.push_str(&strip_redundant_xmlns(&el.raw_xml));
            found_raw = true;
        }
        if !found_raw {
            content.push_str(&defined_names_xml(workbook));
        }
    }

    content.push_str(&format!(
        r#"<calcPr fullCalcOnLoad="{}"/>"#,
        if workbook.settings().calc_on_open { 1 } else { 0 }
    ));

    for el in workbook.preserved.by_tag("extLst") {
        content.push_str(&strip_redundant_xmlns(&el.raw_xml));
    }
    for el in workbook_unknown_tail(&workbook.preserved) {
        content.push_str(&strip_redundant_xmlns(&el.raw_xml));
    }

    content.push_str("</workbook>");
    content
}

/// Rebuild `<definedNames>` from the model — used only when the source
/// archive had no preserved subtree to fall back on (a workbook built
/// from scratch that later gained named ranges).
fn defined_names_xml(workbook: &Workbook) -> String {
    let mut out = String::from("<definedNames>");
    for nr in workbook.named_ranges().iter() {
        let local_attr = match nr.scope {
            NameScope::Sheet(idx) => format!(r#" localSheetId="{idx}""#),
            NameScope::Workbook => String::new(),
        };
        let hidden_attr = if nr.hidden { r#" hidden="1""# } else { "" };
        out.push_str(&format!(
            r#"<definedName name="{}"{}{}>{}</definedName>"#,
            escape_xml_attr(&nr.name),
            local_attr,
            hidden_attr,
            escape_xml_text(&nr.refers_to)
        ));
    }
    out.push_str("</definedNames>");
    out
}

/// Preserved workbook-root elements this crate never placed at a named
/// slot above (`fileVersion`, `workbookPr`, `calcPr`, `bookViews`,
/// `extLst`, `definedNames`) — re-emitted as a trailing unknown slot,
/// mirroring [`PreservedElements::unknown_tail`] for the worksheet side.
fn workbook_unknown_tail(preserved: &PreservedElements) -> impl Iterator<Item = &xlengine_core::preserved::PreservedElement> {
    const KNOWN: &[&str] = &["fileVersion", "workbookPr", "calcPr", "bookViews", "extLst", "definedNames"];
    preserved.all().iter().filter(|e| !KNOWN.contains(&e.tag.as_str()))
}

fn workbook_rels_xml(workbook: &Workbook) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 0..workbook.sheet_count() {
        content.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }
    let styles_rid = workbook.sheet_count() + 1;
    content.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        styles_rid
    ));
    if has_shared_strings(workbook) {
        content.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
            styles_rid + 1
        ));
    }
    content.push_str("</Relationships>");
    content
}

fn shared_strings_xml(workbook: &Workbook) -> Option<String> {
    let pool = workbook.string_pool();
    if pool.is_empty() {
        return None;
    }
    let strings: Vec<&str> = pool.iter_in_order().collect();
    let mut content = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    );
    for s in &strings {
        content.push_str(&format!("<si><t xml:space=\"preserve\">{}</t></si>", escape_xml_text(s)));
    }
    content.push_str("</sst>");
    Some(content)
}

///// Re-emit one worksheet: `sheetData` and `mergeCells` are rebuilt from
/// the cell model, every other child is the captured subtree re-emitted
/// in schema order, with an unknown tail for anything this crate never
/// recognized.
fn worksheet_xml(sheet: &Worksheet) -> String {
    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );

    emit_preserved_tag(&mut content, &sheet.preserved, "sheetPr");
    emit_preserved_tag(&mut content, &sheet.preserved, "dimension");
    emit_preserved_tag(&mut content, &sheet.preserved, "sheetViews");
    emit_preserved_tag(&mut content, &sheet.preserved, "sheetFormatPr");
    if sheet.preserved.by_tag("cols").next().is_some() {
        emit_preserved_tag(&mut content, &sheet.preserved, "cols");
    } else {
        content.push_str(&cols_xml(sheet));
    }

    content.push_str(&sheet_data_xml(sheet));
    content.push_str(&merge_cells_xml(sheet));

    for tag in [
        "conditionalFormatting",
        "printOptions",
        "pageMargins",
        "pageSetup",
        "headerFooter",
        "rowBreaks",
        "colBreaks",
        "customProperties",
        "drawing",
        "legacyDrawing",
        "picture",
        "oleObjects",
        "controls",
        "extLst",
    ] {
        emit_preserved_tag(&mut content, &sheet.preserved, tag);
    }

    for el in sheet.preserved.unknown_tail() {
        content.push_str(&strip_redundant_xmlns(&el.raw_xml));
    }

    content.push_str("</worksheet>");
    content
}

fn emit_preserved_tag(content: &mut String, preserved: &PreservedElements, tag: &str) {
    for el in preserved.by_tag(tag) {
        content.push_str(&strip_redundant_xmlns(&el.raw_xml));
    }
}

/// Rows are keyed by row index: a row with custom height/hidden state but
/// no cells still needs a `<row>` element to carry those attributes, so
/// the emitted row set is cell rows unioned with height/hidden rows, not
/// just `iter_cells()`'s rows.
fn sheet_data_xml(sheet: &Worksheet) -> String {
    use std::collections::BTreeMap;

    let mut rows: BTreeMap<u32, Vec<(u16, &xlengine_core::CellData)>> = BTreeMap::new();
    for (row, col, cell) in sheet.iter_cells() {
        rows.entry(row).or_default().push((col, cell));
    }
    for &row in sheet.custom_row_heights().keys() {
        rows.entry(row).or_default();
    }
    for (&row, &hidden) in sheet.hidden_rows() {
        if hidden {
            rows.entry(row).or_default();
        }
    }

    let mut content = String::from("<sheetData>");
    for (row, cells) in rows {
        let mut row_attrs = format!(r#"<row r="{}""#, row + 1);
        if let Some(&ht) = sheet.custom_row_heights().get(&row) {
            row_attrs.push_str(&format!(r#" customHeight="1" ht="{ht}""#));
        }
        if sheet.is_row_hidden(row) {
            row_attrs.push_str(r#" hidden="1""#);
        }
        row_attrs.push('>');
        content.push_str(&row_attrs);

        for (col, cell) in cells {
            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let style_attr = if cell.style_index != 0 {
                format!(r#" s="{}""#, cell.style_index)
            } else {
                String::new()
            };
            write_cell_xml(&mut content, &cell_ref, &style_attr, &cell.value);
        }

        content.push_str("</row>");
    }
    content.push_str("</sheetData>");
    content
}

/// `<cols>` regenerated from live column width/visibility state rather
/// than preserved verbatim, since column width/hidden are mutable
/// through the cell model.
fn cols_xml(sheet: &Worksheet) -> String {
    use std::collections::BTreeSet;

    let mut cols: BTreeSet<u16> = sheet.custom_column_widths().keys().copied().collect();
    for (&col, &hidden) in sheet.hidden_columns() {
        if hidden {
            cols.insert(col);
        }
    }
    if cols.is_empty() {
        return String::new();
    }

    let mut content = String::from("<cols>");
    for col in cols {
        let idx = col as u32 + 1;
        let mut attrs = format!(r#"<col min="{idx}" max="{idx}""#);
        if let Some(&w) = sheet.custom_column_widths().get(&col) {
            attrs.push_str(&format!(r#" width="{w}" customWidth="1""#));
        }
        if sheet.is_column_hidden(col) {
            attrs.push_str(r#" hidden="1""#);
        }
        attrs.push_str("/>");
        content.push_str(&attrs);
    }
    content.push_str("</cols>");
    content
}

fn write_cell_xml(content: &mut String, cell_ref: &str, style_attr: &str, value: &CellValue) {
    match value {
        CellValue::Number(n) => {
            content.push_str(&format!(r#"<c r="{cell_ref}"{style_attr}><v>{n}</v></c>"#));
        }
        CellValue::Text(s) => {
            content.push_str(&format!(
                r#"<c r="{cell_ref}"{style_attr} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                escape_xml_text(s.as_str())
            ));
        }
        CellValue::RichText(runs) => {
            let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
            content.push_str(&format!(
                r#"<c r="{cell_ref}"{style_attr} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                escape_xml_text(&joined)
            ));
        }
        CellValue::Bool(b) => {
            content.push_str(&format!(r#"<c r="{cell_ref}"{style_attr} t="b"><v>{}</v></c>"#, if *b { 1 } else { 0 }));
        }
        CellValue::DateTime(dt) => {
            let serial = xlengine_core::datetime_to_serial(*dt);
            content.push_str(&format!(r#"<c r="{cell_ref}"{style_attr}><v>{serial}</v></c>"#));
        }
        CellValue::Formula { source, cached } => {
            content.push_str(&format!(r#"<c r="{cell_ref}"{style_attr}>"#));
            content.push_str(&format!("<f>{}</f>", escape_xml_text(source)));
            if let Some(cached) = cached {
                write_formula_cache_xml(content, cached);
            }
            content.push_str("</c>");
        }
        CellValue::Error(e) => {
            content.push_str(&format!(r#"<c r="{cell_ref}"{style_attr} t="e"><v>{}</v></c>"#, e.as_str()));
        }
        CellValue::Empty => {
            if !style_attr.is_empty() {
                content.push_str(&format!(r#"<c r="{cell_ref}"{style_attr}/>"#));
            }
        }
    }
}

fn write_formula_cache_xml(content: &mut String, cached: &CellValue) {
    match cached {
        CellValue::Number(n) => content.push_str(&format!("<v>{n}</v>")),
        CellValue::Bool(b) => {
            content.push_str("<v>");
            content.push_str(if *b { "1" } else { "0" });
            content.push_str("</v>");
        }
        CellValue::Text(s) => {
            content.push_str(&format!("<v>{}</v>", escape_xml_text(s.as_str())));
        }
        CellValue::Error(e) => content.push_str(&format!("<v>{}</v>", e.as_str())),
        CellValue::DateTime(dt) => {
            content.push_str(&format!("<v>{}</v>", xlengine_core::datetime_to_serial(*dt)));
        }
        _ => {}
    }
}

fn merge_cells_xml(sheet: &Worksheet) -> String {
    let regions = sheet.merged_regions();
    if regions.is_empty() {
        return String::new();
    }
    let mut content = format!(r#"<mergeCells count="{}">"#, regions.len());
    for range in regions {
        content.push_str(&format!(r#"<mergeCell ref="{range}"/>"#));
    }
    content.push_str("</mergeCells>");
    content
}

fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn escape_xml_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Best-effort removal of a redundant default-namespace declaration from
/// a preserved subtree's start tag — the workbook/worksheet root already
/// declares the spreadsheetml namespace, so re-declaring it on every
/// preserved child would otherwise leak into an unmodified round trip.
fn strip_redundant_xmlns(raw: &str) -> String {
    raw.replacen(r#" xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main""#, "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use xlengine_core::style::Style;

    fn sample_workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.set_cell_text(0, 0, 0, "hello").unwrap();
        wb.worksheet_mut(0).unwrap().set_cell_value_at(1, 0, 42i64).unwrap();
        wb.set_cell_style(0, 0, 0, Style::new().bold(true)).unwrap();
        wb
    }

    #[test]
    fn write_produces_readable_archive() {
        let wb = sample_workbook();
        let mut buf = Vec::new();
        XlsxWriter::write(&wb, Cursor::new(&mut buf)).unwrap();

        let read_back = crate::reader::XlsxReader::read(Cursor::new(&buf)).unwrap();
        assert_eq!(read_back.sheet_count(), 1);
        assert_eq!(read_back.worksheet(0).unwrap().get_value_at(1, 0).as_number(), Some(rust_decimal::Decimal::from(42)));
    }

    #[test]
    fn patch_passes_through_unmodeled_parts() {
        let wb = sample_workbook();
        let mut source = Vec::new();
        XlsxWriter::write(&wb, Cursor::new(&mut source)).unwrap();

        let (_read_wb, manifest) = crate::reader::XlsxReader::read_with_manifest(Cursor::new(&source)).unwrap();

        let mut patched = Vec::new();
        XlsxWriter::patch(&wb, &manifest, Cursor::new(&mut patched)).unwrap();

        let read_back = crate::reader::XlsxReader::read(Cursor::new(&patched)).unwrap();
        assert_eq!(read_back.worksheet(0).unwrap().get_value_at(0, 0).as_str().map(|s| s.to_string()), Some("hello".to_string()));
    }
}
