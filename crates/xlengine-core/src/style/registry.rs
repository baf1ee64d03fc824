//! Style registry for deduplication.

use super::Style;
use std::collections::HashMap;

/// Insert-only style registry, deduplicating by a canonical string key
/// rather than a hash, so two equal styles always compare equal under the
/// registry's key with no collision path to reason about.
///
/// Styles are assigned dense integer IDs in insertion order; index 0 is
/// always the default style, matching the XLSX convention that a cell
/// with no explicit `s` attribute uses style 0.
#[derive(Debug)]
pub struct StyleRegistry {
    styles: Vec<Style>,
    by_key: HashMap<String, u32>,
}

impl StyleRegistry {
    /// Create a new registry with the default style at index 0
    pub fn new() -> Self {
        let mut registry = Self {
            styles: Vec::with_capacity(64),
            by_key: HashMap::with_capacity(64),
        };
        let default = Style::default();
        let key = canonical_key(&default);
        registry.styles.push(default);
        registry.by_key.insert(key, 0);
        registry
    }

    /// The canonical key for a style, exposed so callers can check
    /// membership without inserting.
    pub fn key_for(style: &Style) -> String {
        canonical_key(style)
    }

    /// Get or create a style, returning its index. Identical styles
    /// (same canonical key) always collapse to the same index.
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        let key = canonical_key(&style);
        if let Some(&idx) = self.by_key.get(&key) {
            return idx;
        }
        let idx = self.styles.len() as u32;
        self.by_key.insert(key, idx);
        self.styles.push(style);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    pub fn default_style(&self) -> &Style {
        &self.styles[0]
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Iterate over all styles in insertion (= output) order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Style)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical string key for a style: the `Debug` rendering of each
/// component in a fixed order. Two styles with equal field values always
/// produce byte-identical keys, so there is no hash-collision fallback to
/// get wrong.
fn canonical_key(style: &Style) -> String {
    format!(
        "{:?}|{:?}|{:?}|{:?}|{:?}|{}|{}",
        style.font,
        style.fill,
        style.border,
        style.alignment,
        style.number_format,
        style.protection.locked,
        style.protection.hidden
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, FillStyle};

    #[test]
    fn test_default_style() {
        let registry = StyleRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0), Some(&Style::default()));
    }

    #[test]
    fn test_deduplication() {
        let mut registry = StyleRegistry::new();

        let style1 = Style::new().bold(true);
        let style2 = Style::new().bold(true);
        let style3 = Style::new().italic(true);

        let idx1 = registry.get_or_insert(style1);
        let idx2 = registry.get_or_insert(style2);
        let idx3 = registry.get_or_insert(style3);

        assert_eq!(idx1, idx2);
        assert_ne!(idx1, idx3);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_complex_styles() {
        let mut registry = StyleRegistry::new();

        let style = Style::new()
            .bold(true)
            .italic(true)
            .font_size(14.0)
            .fill_color(Color::RED);

        let idx = registry.get_or_insert(style.clone());
        assert!(idx > 0);
        assert_eq!(registry.get(idx), Some(&style));
    }
}
