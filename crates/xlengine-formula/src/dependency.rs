//! Dependency tracking for the calculation orchestrator.
//!
//! [`DependencyGraph`] itself is agnostic to what a "cell" means; the
//! domain-specific part is [`collect_refs`], which walks a [`TExpr`] and
//! resolves every [`Ref`](TExpr::Ref)/[`Range`](TExpr::Range) it finds into
//! [`CellKey`]s via a sheet-name resolver supplied by the caller.

use std::collections::{HashMap, HashSet};

use xlengine_core::CellAddress;

use crate::ast::{Arg, RangeLocation, TExpr};

/// Unique key for a cell: sheet index + address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub sheet: usize,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new(sheet: usize, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    pub fn from_address(sheet: usize, addr: &CellAddress) -> Self {
        Self::new(sheet, addr.row, addr.col)
    }
}

/// Dependency graph for formula cells.
///
/// Tracks which cells depend on which other cells, enabling efficient
/// recalculation.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: HashMap<CellKey, HashSet<CellKey>>,
    precedents: HashMap<CellKey, HashSet<CellKey>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, precedent: CellKey, dependent: CellKey) {
        self.dependents.entry(precedent).or_default().insert(dependent);
        self.precedents.entry(dependent).or_default().insert(precedent);
    }

    /// Replace `cell`'s outgoing (precedent) edges with `new_precedents`,
    /// used when a formula is re-entered and its reference set changes.
    pub fn set_precedents(&mut self, cell: CellKey, new_precedents: impl IntoIterator<Item = CellKey>) {
        self.clear_dependencies(cell);
        for precedent in new_precedents {
            self.add_dependency(precedent, cell);
        }
    }

    pub fn clear_dependencies(&mut self, cell: CellKey) {
        if let Some(precedents) = self.precedents.remove(&cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&cell);
                }
            }
        }
        if let Some(dependents) = self.dependents.remove(&cell) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(&cell);
                }
            }
        }
    }

    pub fn get_dependents(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        self.dependents.get(&cell).into_iter().flat_map(|set| set.iter().copied())
    }

    pub fn get_precedents(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        self.precedents.get(&cell).into_iter().flat_map(|set| set.iter().copied())
    }

    /// Cells that need recalculating when `changed` change, in dependency
    /// order (a cell's precedents always precede it), excluding any cell
    /// involved in a cycle — the caller writes `#REF!` into those, since
    /// there is no iterative convergence for circular references.
    pub fn get_recalc_order(&self, changed: &[CellKey]) -> Vec<CellKey> {
        let cyclic = self.find_cyclic_cells(changed);
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut in_stack = HashSet::new();

        for &cell in changed {
            self.topological_sort(cell, &cyclic, &mut result, &mut visited, &mut in_stack);
        }

        result
    }

    fn topological_sort(
        &self,
        cell: CellKey,
        cyclic: &HashSet<CellKey>,
        result: &mut Vec<CellKey>,
        visited: &mut HashSet<CellKey>,
        in_stack: &mut HashSet<CellKey>,
    ) {
        if visited.contains(&cell) || cyclic.contains(&cell) {
            return;
        }
        if in_stack.contains(&cell) {
            return;
        }

        in_stack.insert(cell);
        if let Some(dependents) = self.dependents.get(&cell) {
            for &dependent in dependents {
                self.topological_sort(dependent, cyclic, result, visited, in_stack);
            }
        }
        in_stack.remove(&cell);
        visited.insert(cell);
        result.push(cell);
    }

    /// Every cell reachable from `roots` that participates in a cycle.
    fn find_cyclic_cells(&self, roots: &[CellKey]) -> HashSet<CellKey> {
        let mut cyclic = HashSet::new();
        let mut checked = HashSet::new();
        for &root in roots {
            self.collect_cyclic_from(root, &mut checked, &mut cyclic);
        }
        cyclic
    }

    fn collect_cyclic_from(&self, cell: CellKey, checked: &mut HashSet<CellKey>, cyclic: &mut HashSet<CellKey>) {
        if !checked.insert(cell) {
            return;
        }
        if self.has_circular_reference(cell) {
            cyclic.insert(cell);
        }
        if let Some(dependents) = self.dependents.get(&cell) {
            for &dependent in dependents {
                self.collect_cyclic_from(dependent, checked, cyclic);
            }
        }
    }

    pub fn has_circular_reference(&self, cell: CellKey) -> bool {
        let mut visited = HashSet::new();
        let mut in_stack = HashSet::new();
        self.detect_cycle(cell, &mut visited, &mut in_stack)
    }

    fn detect_cycle(&self, cell: CellKey, visited: &mut HashSet<CellKey>, in_stack: &mut HashSet<CellKey>) -> bool {
        if in_stack.contains(&cell) {
            return true;
        }
        if visited.contains(&cell) {
            return false;
        }

        visited.insert(cell);
        in_stack.insert(cell);
        if let Some(precedents) = self.precedents.get(&cell) {
            for &precedent in precedents {
                if self.detect_cycle(precedent, visited, in_stack) {
                    return true;
                }
            }
        }
        in_stack.remove(&cell);
        false
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}

/// Walk `expr` and collect every cell it reads, resolving sheet-qualified
/// refs via `sheet_index` (returns `None` for an unknown sheet name, which
/// `collect_refs` silently drops — an unresolvable sheet means the formula
/// already evaluates to `#REF!` without any dependency edge needed).
pub fn collect_refs(expr: &TExpr, current_sheet: usize, sheet_index: &impl Fn(&str) -> Option<usize>) -> Vec<CellKey> {
    let mut out = Vec::new();
    walk(expr, current_sheet, sheet_index, &mut out);
    out
}

fn walk(expr: &TExpr, current_sheet: usize, sheet_index: &impl Fn(&str) -> Option<usize>, out: &mut Vec<CellKey>) {
    match expr {
        TExpr::Number(_) | TExpr::Text(_) | TExpr::Bool(_) | TExpr::ErrorLit(_) | TExpr::NameRef(_) => {}

        TExpr::PolyRef(node) | TExpr::Ref(node) => {
            if let Some(sheet) = resolve_sheet(node.sheet.as_deref(), current_sheet, sheet_index) {
                out.push(CellKey::from_address(sheet, &node.address));
            }
        }

        TExpr::Range(loc) => walk_range(loc, current_sheet, sheet_index, out),

        TExpr::Arith { left, right, .. } | TExpr::Compare { left, right, .. } | TExpr::Concat { left, right } => {
            walk(left, current_sheet, sheet_index, out);
            walk(right, current_sheet, sheet_index, out);
        }

        TExpr::Neg(inner)
        | TExpr::Percent(inner)
        | TExpr::ToInt(inner)
        | TExpr::DateToSerial(inner)
        | TExpr::DateTimeToSerial(inner) => walk(inner, current_sheet, sheet_index, out),

        TExpr::Aggregate { ranges, .. } => {
            for range in ranges {
                walk_range(range, current_sheet, sheet_index, out);
            }
        }

        TExpr::Call { args, .. } => {
            for arg in args {
                match arg {
                    Arg::Expr(e) => walk(e, current_sheet, sheet_index, out),
                    Arg::Range(r) => walk_range(r, current_sheet, sheet_index, out),
                }
            }
        }

        TExpr::Array(rows) => {
            for row in rows {
                for cell in row {
                    walk(cell, current_sheet, sheet_index, out);
                }
            }
        }
    }
}

fn walk_range(loc: &RangeLocation, current_sheet: usize, sheet_index: &impl Fn(&str) -> Option<usize>, out: &mut Vec<CellKey>) {
    let Some(sheet) = resolve_sheet(loc.sheet(), current_sheet, sheet_index) else {
        return;
    };
    let range = loc.range();
    if range.full_rows || range.full_cols {
        // Full row/column ranges are clamped to the used range at eval
        // time; recording a dependency on the unclamped range would make
        // every formula in the sheet a dependent of every other. The
        // calculation orchestrator instead treats a full-row/column
        // reference as "depends on the whole sheet" out of band.
        return;
    }
    for addr in range.cells() {
        out.push(CellKey::from_address(sheet, &addr));
    }
}

fn resolve_sheet(name: Option<&str>, current_sheet: usize, sheet_index: &impl Fn(&str) -> Option<usize>) -> Option<usize> {
    match name {
        Some(n) => sheet_index(n),
        None => Some(current_sheet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::new();
        let a1 = CellKey::new(0, 0, 0);
        let b1 = CellKey::new(0, 0, 1);
        graph.add_dependency(a1, b1);
        assert!(graph.get_dependents(a1).any(|c| c == b1));
        assert!(graph.get_precedents(b1).any(|c| c == a1));
    }

    #[test]
    fn test_circular_reference() {
        let mut graph = DependencyGraph::new();
        let a1 = CellKey::new(0, 0, 0);
        let b1 = CellKey::new(0, 0, 1);
        let c1 = CellKey::new(0, 0, 2);
        graph.add_dependency(a1, b1);
        graph.add_dependency(b1, c1);
        graph.add_dependency(c1, a1);
        assert!(graph.has_circular_reference(a1));
        assert!(graph.has_circular_reference(b1));
        assert!(graph.has_circular_reference(c1));
    }

    #[test]
    fn test_recalc_order_excludes_cycle() {
        let mut graph = DependencyGraph::new();
        let a1 = CellKey::new(0, 0, 0);
        let b1 = CellKey::new(0, 0, 1);
        let c1 = CellKey::new(0, 0, 2);
        let d1 = CellKey::new(0, 0, 3);
        graph.add_dependency(a1, b1);
        graph.add_dependency(b1, c1);
        graph.add_dependency(c1, a1);
        graph.add_dependency(a1, d1);

        let order = graph.get_recalc_order(&[a1]);
        assert!(!order.contains(&b1));
        assert!(!order.contains(&c1));
        assert!(order.contains(&d1));
    }

    #[test]
    fn test_collect_refs_simple_ref() {
        use crate::ast::{RefKind, RefNode};
        let expr = TExpr::Ref(RefNode {
            sheet: None,
            address: CellAddress::new(2, 3),
            kind: Some(RefKind::Number),
        });
        let refs = collect_refs(&expr, 0, &|_| None);
        assert_eq!(refs, vec![CellKey::new(0, 2, 3)]);
    }

    #[test]
    fn test_collect_refs_cross_sheet_unresolvable_dropped() {
        use crate::ast::RefNode;
        let expr = TExpr::Ref(RefNode {
            sheet: Some("Missing".to_string()),
            address: CellAddress::new(0, 0),
            kind: None,
        });
        let refs = collect_refs(&expr, 0, &|_| None);
        assert!(refs.is_empty());
    }
}
