//! Opaque preserved XML subtrees.
//!
//! Elements this crate does not structurally model — `conditionalFormatting`,
//! `dataValidations`, `drawing`, `extLst`, and the rest of the schema-order
//! list — are captured verbatim at read time as raw bytes and re-emitted at
//! the same schema slot on write. This is what lets an unmodified sheet
//! round-trip byte-for-byte without this crate understanding every OOXML
//! feature.

/// One child element of a worksheet or workbook root that this crate
/// passes through without parsing: the position it occupies in schema
/// order, plus its exact serialized bytes (including its own tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedElement {
    /// Local element name, used to place it back in schema order
    /// (`"conditionalFormatting"`, `"drawing"`, `"extLst"`, ...)
    pub tag: String,
    /// The exact bytes of the element, start tag through end tag, as read
    pub raw_xml: String,
}

impl PreservedElement {
    pub fn new(tag: impl Into<String>, raw_xml: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            raw_xml: raw_xml.into(),
        }
    }
}

/// The ordered set of preserved elements for one worksheet, keyed by the
/// [`WORKSHEET_SCHEMA_ORDER`] tag list. Elements of the same tag may
/// repeat (e.g. multiple `conditionalFormatting` blocks), so storage is a
/// flat ordered vector rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedElements {
    elements: Vec<PreservedElement>,
}

/// Worksheet child elements in OOXML schema order. `SheetData` and
/// `MergeCells` are regenerated by this crate and never appear in a
/// [`PreservedElements`] set; they are listed for position reference only.
pub const WORKSHEET_SCHEMA_ORDER: &[&str] = &[
    "sheetPr",
    "dimension",
    "sheetViews",
    "sheetFormatPr",
    "cols",
    "sheetData",
    "mergeCells",
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
];

impl PreservedElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: PreservedElement) {
        self.elements.push(element);
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn all(&self) -> &[PreservedElement] {
        &self.elements
    }

    /// All preserved elements with the given tag, in original order
    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a PreservedElement> {
        self.elements.iter().filter(move |e| e.tag == tag)
    }

    /// Elements whose tag is not in [`WORKSHEET_SCHEMA_ORDER`], emitted at
    /// a trailing "unknown" slot so unrecognized elements still round-trip.
    pub fn unknown_tail(&self) -> impl Iterator<Item = &PreservedElement> {
        self.elements
            .iter()
            .filter(|e| !WORKSHEET_SCHEMA_ORDER.contains(&e.tag.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_tag_preserves_repeats() {
        let mut set = PreservedElements::new();
        set.push(PreservedElement::new("conditionalFormatting", "<conditionalFormatting sqref=\"A1:A2\"/>"));
        set.push(PreservedElement::new("conditionalFormatting", "<conditionalFormatting sqref=\"B1:B2\"/>"));
        set.push(PreservedElement::new("drawing", "<drawing r:id=\"rId1\"/>"));
        assert_eq!(set.by_tag("conditionalFormatting").count(), 2);
        assert_eq!(set.by_tag("drawing").count(), 1);
    }

    #[test]
    fn test_unknown_tail() {
        let mut set = PreservedElements::new();
        set.push(PreservedElement::new("dimension", "<dimension ref=\"A1\"/>"));
        set.push(PreservedElement::new("futureFeature", "<futureFeature/>"));
        let unknown: Vec<_> = set.unknown_tail().collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].tag, "futureFeature");
    }
}
