//! The function registry.
//!
//! A `FunctionSpec` is a record of closures, not a `match` arm: the
//! evaluator, the printer, and the range-shifter each call a different
//! field on the same value. This is what lets `functions/*.rs` add a new
//! function without touching the evaluator's dispatch code.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};

/// Whether an argument slot accepts a plain expression, a range reference
/// (unevaluated, for functions like SUMIF that need its address), or
/// either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Expr,
    Range,
    Either,
}

/// Describes how many arguments a function takes and what kind each slot
/// is. `variadic` repeats the given kind for every argument past
/// `required.len() + optional.len()`.
#[derive(Debug, Clone)]
pub struct ArgShape {
    pub required: Vec<ArgKind>,
    pub optional: Vec<ArgKind>,
    pub variadic: Option<ArgKind>,
}

impl ArgShape {
    pub fn fixed(kinds: &[ArgKind]) -> Self {
        ArgShape {
            required: kinds.to_vec(),
            optional: Vec::new(),
            variadic: None,
        }
    }

    pub fn exprs(n: usize) -> Self {
        ArgShape::fixed(&vec![ArgKind::Expr; n])
    }

    pub fn with_optional(mut self, kinds: &[ArgKind]) -> Self {
        self.optional = kinds.to_vec();
        self
    }

    pub fn variadic_tail(mut self, kind: ArgKind) -> Self {
        self.variadic = Some(kind);
        self
    }

    /// Does `count` arguments satisfy this shape?
    pub fn accepts_count(&self, count: usize) -> bool {
        let min = self.required.len();
        let max_fixed = self.required.len() + self.optional.len();
        if self.variadic.is_some() {
            count >= min
        } else {
            count >= min && count <= max_fixed
        }
    }

    pub fn kind_at(&self, index: usize) -> ArgKind {
        if index < self.required.len() {
            self.required[index]
        } else if index < self.required.len() + self.optional.len() {
            self.optional[index - self.required.len()]
        } else {
            self.variadic.unwrap_or(ArgKind::Either)
        }
    }

    pub fn describe(&self) -> String {
        let min = self.required.len();
        if self.variadic.is_some() {
            format!("at least {min}")
        } else if self.optional.is_empty() {
            format!("{min}")
        } else {
            format!("{min}-{}", min + self.optional.len())
        }
    }
}

pub type EvalFn = fn(&[Arg], &EvalCtx) -> FormulaValue;
/// Renders this function's argument list back to source; `None` means "use
/// the default comma-joined `print(expr)` rendering" (most functions).
pub type PrintFn = fn(&[Arg]) -> Option<String>;
/// Adjusts every reference inside `args` by `(row_delta, col_delta)`, the
/// way dragging a formula or inserting/deleting rows/columns would.
pub type ShiftFn = fn(&[Arg], i64, i64) -> Vec<Arg>;

pub struct FunctionSpec {
    pub name: &'static str,
    pub shape: ArgShape,
    pub returns_date: bool,
    pub returns_time: bool,
    pub short_circuits: bool,
    pub volatile: bool,
    pub eval: EvalFn,
    pub print_args: PrintFn,
    pub shift: ShiftFn,
}

impl std::fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSpec").field("name", &self.name).finish()
    }
}

impl PartialEq for FunctionSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Default range-shift: shift every `Arg::Range`'s `RangeLocation` by the
/// given delta; leave `Arg::Expr` untouched (callers that need ref-shifting
/// inside expressions handle it via the expression walker in
/// `dependency.rs`, not here).
pub fn default_shift(args: &[Arg], row_delta: i64, col_delta: i64) -> Vec<Arg> {
    use crate::ast::RangeLocation;
    use xlengine_core::{CellAddress, CellRange};

    fn shift_addr(a: CellAddress, dr: i64, dc: i64) -> CellAddress {
        let row = (a.row as i64 + dr).max(0) as u32;
        let col = (a.col as i64 + dc).max(0) as u16;
        CellAddress {
            row,
            col,
            row_absolute: a.row_absolute,
            col_absolute: a.col_absolute,
        }
    }

    args.iter()
        .map(|arg| match arg {
            Arg::Range(RangeLocation::Local(r)) => Arg::Range(RangeLocation::Local(CellRange {
                start: shift_addr(r.start, row_delta, col_delta),
                end: shift_addr(r.end, row_delta, col_delta),
                full_rows: r.full_rows,
                full_cols: r.full_cols,
            })),
            Arg::Range(RangeLocation::CrossSheet(name, r)) => {
                Arg::Range(RangeLocation::CrossSheet(
                    name.clone(),
                    CellRange {
                        start: shift_addr(r.start, row_delta, col_delta),
                        end: shift_addr(r.end, row_delta, col_delta),
                        full_rows: r.full_rows,
                        full_cols: r.full_cols,
                    },
                ))
            }
            other => other.clone(),
        })
        .collect()
}

pub fn default_print(_args: &[Arg]) -> Option<String> {
    None
}

/// The closed function registry, keyed by uppercase name (lookup is
/// case-insensitive).
pub static FUNCTIONS: Lazy<HashMap<&'static str, Arc<FunctionSpec>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let mut register = |spec: FunctionSpec| {
        map.insert(spec.name, Arc::new(spec));
    };

    for spec in crate::functions::math::specs() {
        register(spec);
    }
    for spec in crate::functions::text::specs() {
        register(spec);
    }
    for spec in crate::functions::logical::specs() {
        register(spec);
    }
    for spec in crate::functions::info::specs() {
        register(spec);
    }
    for spec in crate::functions::date::specs() {
        register(spec);
    }
    for spec in crate::functions::lookup::specs() {
        register(spec);
    }
    for spec in crate::functions::statistical::specs() {
        register(spec);
    }
    for spec in crate::functions::criteria::specs() {
        register(spec);
    }
    for spec in crate::functions::financial::specs() {
        register(spec);
    }
    map
});

pub fn lookup(name: &str) -> Option<Arc<FunctionSpec>> {
    FUNCTIONS.get(name.to_uppercase().as_str()).cloned()
}

pub fn all_names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.keys().copied()
}
