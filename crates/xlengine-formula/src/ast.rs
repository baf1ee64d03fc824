//! The typed formula AST.
//!
//! `TExpr` is the "GADT-style" tree the design notes describe: a sealed enum
//! carrying its result-type discriminator explicitly rather than as a Rust
//! type parameter, since the language has no GADTs. [`RefKind`] is that
//! discriminator's decoder half — it tells the evaluator how to turn a raw
//! [`CellValue`] into the type the surrounding expression expects. A
//! [`PolyRef`] is a reference with no `RefKind` yet; the typechecker
//! (`crate::typecheck`) is the only place one gets created other than the
//! parser, and the only place one gets resolved away.

use rust_decimal::Decimal;
use std::sync::Arc;
pub use xlengine_core::CellAddress;
use xlengine_core::{CellError, CellRange};

use crate::function_spec::FunctionSpec;

/// What an evaluator should decode a referenced cell's value into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// No coercion requested; hand back the cell's `CellValue` as-is.
    Any,
    Number,
    Text,
    Bool,
    DateTime,
}

/// A single-cell reference, optionally sheet-qualified, before or after
/// typechecking. `kind` is `None` for a [`PolyRef`] produced by the parser;
/// the typechecker fills it in from context.
#[derive(Debug, Clone, PartialEq)]
pub struct RefNode {
    pub sheet: Option<String>,
    pub address: CellAddress,
    pub kind: Option<RefKind>,
}

/// A rectangular range reference, local to the current sheet or qualified
/// by an explicit sheet name. Aggregates and range-accepting functions use
/// this uniformly (spec's `RangeLocation`).
#[derive(Debug, Clone, PartialEq)]
pub enum RangeLocation {
    Local(CellRange),
    CrossSheet(String, CellRange),
}

impl RangeLocation {
    pub fn range(&self) -> CellRange {
        match self {
            RangeLocation::Local(r) => *r,
            RangeLocation::CrossSheet(_, r) => *r,
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        match self {
            RangeLocation::Local(_) => None,
            RangeLocation::CrossSheet(name, _) => Some(name.as_str()),
        }
    }
}

/// Named aggregator identity for the single `Aggregate` AST case, which
/// uniformly handles SUM, COUNT, MIN, MAX, and AVERAGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Sum,
    Count,
    CountA,
    CountBlank,
    Average,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// An argument slot to a [`Call`](TExpr::Call) node: most functions take
/// plain expressions, but range-accepting functions (SUMIF, VLOOKUP's
/// table, INDEX) need the unevaluated [`RangeLocation`] rather than a
/// folded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Expr(TExpr),
    Range(RangeLocation),
}

/// The typed expression tree. Literals and polymorphic refs only appear
/// between parsing and typechecking; every other variant is valid at every
/// stage.
#[derive(Debug, Clone, PartialEq)]
pub enum TExpr {
    Number(Decimal),
    Text(String),
    Bool(bool),
    ErrorLit(CellError),

    /// A reference whose `kind` has not yet been resolved by the
    /// typechecker. Never reaches the evaluator.
    PolyRef(RefNode),
    /// A reference the typechecker has resolved to a concrete `RefKind`.
    Ref(RefNode),

    Range(RangeLocation),
    NameRef(String),

    Arith {
        op: ArithOp,
        left: Box<TExpr>,
        right: Box<TExpr>,
    },
    Compare {
        op: CompareOp,
        left: Box<TExpr>,
        right: Box<TExpr>,
    },
    Concat {
        left: Box<TExpr>,
        right: Box<TExpr>,
    },
    Neg(Box<TExpr>),
    Percent(Box<TExpr>),

    /// Explicit coercions inserted by the typechecker.
    ToInt(Box<TExpr>),
    DateToSerial(Box<TExpr>),
    DateTimeToSerial(Box<TExpr>),

    Aggregate {
        aggregator: Aggregator,
        ranges: Vec<RangeLocation>,
    },

    Call {
        spec: Arc<FunctionSpec>,
        args: Vec<Arg>,
    },

    Array(Vec<Vec<TExpr>>),
}

impl TExpr {
    pub fn is_poly(&self) -> bool {
        matches!(self, TExpr::PolyRef(_))
    }
}
