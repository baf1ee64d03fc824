//! Cell value types.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::style::FontStyle;

/// The value stored in a cell. Every constructor is total; there is no
/// partial variant and no exception path.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value
    Empty,
    /// Arbitrary-precision number (spec requires decimal, not binary float)
    Number(Decimal),
    /// Plain text
    Text(SharedString),
    /// TRUE/FALSE
    Bool(bool),
    /// A calendar date/time, stored host-side as a naive local datetime
    DateTime(NaiveDateTime),
    /// Rich text: an ordered run list, each an optional per-run font
    RichText(Arc<[RichTextRun]>),
    /// A formula cell: source text plus an optional cached result used for
    /// display and for reading the formula as a plain value
    Formula {
        source: String,
        cached: Option<Box<CellValue>>,
    },
    /// An Excel-visible error value
    Error(CellError),
}

/// One run of rich text: literal content plus an optional font override.
#[derive(Debug, Clone, PartialEq)]
pub struct RichTextRun {
    pub text: String,
    pub font: Option<FontStyle>,
}

impl CellValue {
    /// Build a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(SharedString::new(s.into()))
    }

    /// Build a formula value with no cached result
    pub fn formula<S: Into<String>>(source: S) -> Self {
        CellValue::Formula {
            source: source.into(),
            cached: None,
        }
    }

    /// Build a formula value with a cached result
    pub fn formula_with_cache<S: Into<String>>(source: S, cached: CellValue) -> Self {
        CellValue::Formula {
            source: source.into(),
            cached: Some(Box::new(cached)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.effective_value(), CellValue::Text(_) | CellValue::RichText(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.effective_value(), CellValue::Number(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.effective_value(), CellValue::Empty)
    }

    /// Number the cell holds, if the effective value is numeric or boolean
    pub fn as_number(&self) -> Option<Decimal> {
        match self.effective_value() {
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(true) => Some(Decimal::ONE),
            CellValue::Bool(false) => Some(Decimal::ZERO),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.effective_value() {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => Some(!n.is_zero()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.effective_value() {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Formula source text, if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The displayable value: for a formula, its cached result; otherwise
    /// the value itself. Never recurses through more than one formula
    /// layer since formulas cannot nest cached formula cells.
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula { cached: Some(v), .. } => v,
            _ => self,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Bool(_) => "bool",
            CellValue::DateTime(_) => "datetime",
            CellValue::RichText(_) => "rich_text",
            CellValue::Formula { .. } => "formula",
            CellValue::Error(_) => "error",
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{}", s.as_str()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::RichText(runs) => {
                for run in runs.iter() {
                    write!(f, "{}", run.text)?;
                }
                Ok(())
            }
            CellValue::Formula { cached: Some(v), .. } => write!(f, "{v}"),
            CellValue::Formula { source, .. } => write!(f, "={source}"),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(Decimal::from(n))
    }
}

impl From<Decimal> for CellValue {
    fn from(n: Decimal) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::text(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Excel-visible error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// `#NULL!` — intersection of ranges that don't intersect
    Null,
    /// `#DIV/0!` — division by zero
    Div0,
    /// `#VALUE!` — wrong type of operand
    Value,
    /// `#REF!` — invalid reference (includes detected dependency cycles)
    Ref,
    /// `#NAME?` — unrecognized name
    Name,
    /// `#NUM!` — invalid numeric value (e.g. solver non-convergence)
    Num,
    /// `#N/A` — value not available
    Na,
    /// `#GETTING_DATA` — external data still loading
    GettingData,
}

impl CellError {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::GettingData => "#GETTING_DATA",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            "#GETTING_DATA" => Some(CellError::GettingData),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interned string, shared across cells via `Arc` to avoid duplicating
/// repeated text such as category labels, mirroring the XLSX
/// shared-strings table.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}

/// Insertion-ordered string interning table, backing the shared-strings
/// part of an XLSX. Canonical order is insertion order, so a no-edit
/// round trip reproduces the original part.
#[derive(Debug, Default)]
pub struct StringPool {
    order: Vec<Arc<str>>,
    index: HashMap<Arc<str>, u32>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its shared-strings-table index
    pub fn intern<S: AsRef<str>>(&mut self, s: S) -> (SharedString, u32) {
        let s = s.as_ref();
        if let Some(&idx) = self.index.get(s) {
            return (SharedString(self.order[idx as usize].clone()), idx);
        }
        let arc: Arc<str> = Arc::from(s);
        let idx = self.order.len() as u32;
        self.order.push(arc.clone());
        self.index.insert(arc.clone(), idx);
        (SharedString(arc), idx)
    }

    /// Look up a string by its shared-strings-table index
    pub fn get(&self, index: u32) -> Option<SharedString> {
        self.order.get(index as usize).map(|s| SharedString(s.clone()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate in canonical (insertion) order, for writing
    pub fn iter_in_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42i64), CellValue::Number(Decimal::from(42)));
        assert_eq!(CellValue::from(true), CellValue::Bool(true));
        assert_eq!(CellValue::from("hello").as_str(), Some("hello"));
    }

    #[test]
    fn test_cell_value_as_number() {
        assert_eq!(CellValue::Number(Decimal::from(42)).as_number(), Some(Decimal::from(42)));
        assert_eq!(CellValue::Bool(true).as_number(), Some(Decimal::ONE));
        assert_eq!(CellValue::text("hello").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_cell_error_roundtrip() {
        assert_eq!(CellError::Div0.to_string(), "#DIV/0!");
        assert_eq!(CellError::from_str("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::from_str("bogus"), None);
    }

    #[test]
    fn test_string_pool_insertion_order() {
        let mut pool = StringPool::new();
        let (_, i0) = pool.intern("zebra");
        let (_, i1) = pool.intern("apple");
        let (_, i2) = pool.intern("zebra");
        assert_eq!(i0, 0);
        assert_eq!(i1, 1);
        assert_eq!(i2, 0);
        let order: Vec<_> = pool.iter_in_order().collect();
        assert_eq!(order, vec!["zebra", "apple"]);
    }

    #[test]
    fn test_effective_value_through_formula() {
        let v = CellValue::formula_with_cache("A1+1", CellValue::Number(Decimal::from_str("2").unwrap()));
        assert_eq!(v.as_number(), Some(Decimal::from(2)));
    }
}
