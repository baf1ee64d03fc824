//! The evaluator: folds a [`TExpr`] against an [`Env`],
//! producing a [`FormulaValue`]. Evaluation is total — every node reduces
//! to a value, including error values, and the "#ERR-sticky" rule means an
//! operand error always wins over re-deriving a new one.

use std::cell::Cell;

use chrono::NaiveDateTime;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use xlengine_core::{CellAddress, CellError, CellRange, CellValue};

use crate::ast::{Aggregator, Arg, ArithOp, CompareOp, RangeLocation, RefKind, RefNode, TExpr};

/// The dynamic value domain evaluation produces. Distinct from
/// [`CellValue`] because intermediate results (e.g. an `Array` from
/// `SEQUENCE`-like functions, or a bare error with no cell behind it) don't
/// all map onto a storable cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(Decimal),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    pub fn error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn to_number(&self) -> Result<Decimal, CellError> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Bool(true) => Ok(Decimal::ONE),
            FormulaValue::Bool(false) => Ok(Decimal::ZERO),
            FormulaValue::Empty => Ok(Decimal::ZERO),
            FormulaValue::DateTime(dt) => Ok(xlengine_core::datetime_to_serial(*dt)),
            FormulaValue::Text(s) => Decimal::from_str(s.trim()).map_err(|_| CellError::Value),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    pub fn to_bool(&self) -> Result<bool, CellError> {
        match self {
            FormulaValue::Bool(b) => Ok(*b),
            FormulaValue::Number(n) => Ok(!n.is_zero()),
            FormulaValue::Empty => Ok(false),
            FormulaValue::Text(s) => match s.to_uppercase().as_str() {
                "TRUE" => Ok(true),
                "FALSE" => Ok(false),
                _ => Err(CellError::Value),
            },
            FormulaValue::Error(e) => Err(*e),
            _ => Err(CellError::Value),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Number(n) => n.normalize().to_string(),
            FormulaValue::Bool(true) => "TRUE".to_string(),
            FormulaValue::Bool(false) => "FALSE".to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::DateTime(dt) => xlengine_core::datetime_to_serial(*dt)
                .normalize()
                .to_string(),
            FormulaValue::Error(e) => e.as_str().to_string(),
            FormulaValue::Array(_) => "#VALUE!".to_string(),
        }
    }

    pub fn to_datetime(&self) -> Result<NaiveDateTime, CellError> {
        match self {
            FormulaValue::DateTime(dt) => Ok(*dt),
            FormulaValue::Number(n) => {
                xlengine_core::serial_to_datetime(*n).ok_or(CellError::Value)
            }
            FormulaValue::Error(e) => Err(*e),
            _ => Err(CellError::Value),
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(v: CellValue) -> Self {
        match v {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::Text(s) => FormulaValue::Text(s.as_str().to_string()),
            CellValue::Bool(b) => FormulaValue::Bool(b),
            CellValue::DateTime(dt) => FormulaValue::DateTime(dt),
            CellValue::RichText(runs) => {
                FormulaValue::Text(runs.iter().map(|r| r.text.as_str()).collect())
            }
            CellValue::Formula { cached, .. } => cached
                .map(|v| FormulaValue::from(*v))
                .unwrap_or(FormulaValue::Empty),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(v: FormulaValue) -> Self {
        match v {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::text(s),
            FormulaValue::Bool(b) => CellValue::Bool(b),
            FormulaValue::DateTime(dt) => CellValue::DateTime(dt),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// Everything the evaluator needs from the surrounding workbook. Kept as a
/// trait (rather than a concrete `&Workbook`) so tests can exercise the
/// evaluator against a fake without a real sheet model.
pub trait Env {
    fn cell_value(&self, sheet: Option<&str>, row: u32, col: u16) -> CellValue;
    fn current_sheet(&self) -> &str;
    fn current_row(&self) -> u32;
    fn current_col(&self) -> u16;
    fn sheet_index(&self, name: &str) -> Option<usize>;
    /// The used-range bound a full-column/row reference clamps to.
    fn used_range(&self, sheet: Option<&str>) -> Option<CellRange>;
    /// Defined-name source text, if any (not yet parsed).
    fn resolve_name(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub max_depth: u32,
    pub max_iterations: u32,
    pub default_guess: f64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            max_depth: 512,
            max_iterations: 100,
            default_guess: 0.1,
        }
    }
}

/// Per-evaluation context: the `Env` plus evaluation options and a
/// recursion-depth counter threaded through every call via interior
/// mutability so `FunctionSpec::eval` closures can call back into
/// `eval_expr`/`eval_arg` without needing a `&mut` context.
pub struct EvalCtx<'a> {
    pub env: &'a dyn Env,
    pub options: EvalOptions,
    depth: Cell<u32>,
}

impl<'a> EvalCtx<'a> {
    pub fn new(env: &'a dyn Env, options: EvalOptions) -> Self {
        EvalCtx {
            env,
            options,
            depth: Cell::new(0),
        }
    }

    pub fn eval(&self, expr: &TExpr) -> FormulaValue {
        eval_expr(expr, self)
    }

    pub fn eval_arg(&self, arg: &Arg) -> FormulaValue {
        match arg {
            Arg::Expr(e) => self.eval(e),
            Arg::Range(loc) => {
                let cells = self.range_values(loc);
                match cells.len() {
                    0 => FormulaValue::Empty,
                    1 => cells.into_iter().next().unwrap(),
                    _ => {
                        let range = loc.range();
                        let cols = range.col_count() as usize;
                        let rows: Vec<Vec<FormulaValue>> =
                            cells.chunks(cols.max(1)).map(|c| c.to_vec()).collect();
                        FormulaValue::Array(rows)
                    }
                }
            }
        }
    }

    /// Every cell in a range, in row-major order, with full-column/row
    /// spans clamped to the used range first.
    pub fn range_cells(&self, loc: &RangeLocation) -> Vec<(CellAddress, CellValue)> {
        let mut range = loc.range();
        if range.full_rows || range.full_cols {
            if let Some(used) = self.env.used_range(loc.sheet()) {
                range = range.clamp_to_used_range(used);
            }
        }
        range
            .cells()
            .map(|addr| {
                let v = self.env.cell_value(loc.sheet(), addr.row, addr.col);
                (addr, v)
            })
            .collect()
    }

    pub fn range_values(&self, loc: &RangeLocation) -> Vec<FormulaValue> {
        self.range_cells(loc)
            .into_iter()
            .map(|(_, v)| FormulaValue::from(v))
            .collect()
    }

    fn enter(&self) -> Result<(), FormulaValue> {
        let d = self.depth.get();
        if d >= self.options.max_depth {
            return Err(FormulaValue::Error(CellError::Value));
        }
        self.depth.set(d + 1);
        Ok(())
    }

    fn exit(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

fn decode_ref(node: &RefNode, ctx: &EvalCtx) -> FormulaValue {
    let value = ctx
        .env
        .cell_value(node.sheet.as_deref(), node.address.row, node.address.col);
    let raw = FormulaValue::from(value);
    match node.kind.unwrap_or(RefKind::Any) {
        RefKind::Any => raw,
        RefKind::Number => match raw.to_number() {
            Ok(n) => FormulaValue::Number(n),
            Err(e) => FormulaValue::Error(e),
        },
        RefKind::Text => FormulaValue::Text(raw.to_text()),
        RefKind::Bool => match raw.to_bool() {
            Ok(b) => FormulaValue::Bool(b),
            Err(e) => FormulaValue::Error(e),
        },
        RefKind::DateTime => match raw.to_datetime() {
            Ok(dt) => FormulaValue::DateTime(dt),
            Err(e) => FormulaValue::Error(e),
        },
    }
}

fn aggregate(aggregator: Aggregator, ranges: &[RangeLocation], ctx: &EvalCtx) -> FormulaValue {
    let mut numbers: Vec<Decimal> = Vec::new();
    let mut non_empty = 0usize;
    let mut blanks = 0usize;

    for loc in ranges {
        for (_, value) in ctx.range_cells(loc) {
            match &value {
                CellValue::Empty => blanks += 1,
                CellValue::Error(e) => return FormulaValue::Error(*e),
                _ => {
                    non_empty += 1;
                    if let CellValue::Number(n) = value {
                        numbers.push(n);
                    } else if let CellValue::Bool(b) = value {
                        if matches!(aggregator, Aggregator::Sum | Aggregator::Average | Aggregator::Min | Aggregator::Max) {
                            numbers.push(if b { Decimal::ONE } else { Decimal::ZERO });
                        }
                    }
                }
            }
        }
    }

    match aggregator {
        Aggregator::Sum => FormulaValue::Number(numbers.iter().cloned().sum()),
        Aggregator::Count => FormulaValue::Number(Decimal::from(numbers.len())),
        Aggregator::CountA => FormulaValue::Number(Decimal::from(non_empty)),
        Aggregator::CountBlank => FormulaValue::Number(Decimal::from(blanks)),
        Aggregator::Average => {
            if numbers.is_empty() {
                FormulaValue::Error(CellError::Div0)
            } else {
                FormulaValue::Number(numbers.iter().cloned().sum::<Decimal>() / Decimal::from(numbers.len()))
            }
        }
        Aggregator::Min => numbers
            .into_iter()
            .fold(None, |acc, n| Some(acc.map_or(n, |a: Decimal| a.min(n))))
            .map(FormulaValue::Number)
            .unwrap_or(FormulaValue::Number(Decimal::ZERO)),
        Aggregator::Max => numbers
            .into_iter()
            .fold(None, |acc, n| Some(acc.map_or(n, |a: Decimal| a.max(n))))
            .map(FormulaValue::Number)
            .unwrap_or(FormulaValue::Number(Decimal::ZERO)),
    }
}

pub fn eval_expr(expr: &TExpr, ctx: &EvalCtx) -> FormulaValue {
    if ctx.enter().is_err() {
        return FormulaValue::Error(CellError::Value);
    }
    let result = eval_expr_inner(expr, ctx);
    ctx.exit();
    result
}

fn eval_expr_inner(expr: &TExpr, ctx: &EvalCtx) -> FormulaValue {
    match expr {
        TExpr::Number(n) => FormulaValue::Number(*n),
        TExpr::Text(s) => FormulaValue::Text(s.clone()),
        TExpr::Bool(b) => FormulaValue::Bool(*b),
        TExpr::ErrorLit(e) => FormulaValue::Error(*e),

        TExpr::PolyRef(_) => FormulaValue::Error(CellError::Value),
        TExpr::Ref(node) => decode_ref(node, ctx),

        TExpr::Range(loc) => {
            let cells = ctx.range_values(loc);
            let range = loc.range();
            let cols = range.col_count().max(1) as usize;
            FormulaValue::Array(cells.chunks(cols).map(|c| c.to_vec()).collect())
        }

        TExpr::NameRef(name) => match ctx.env.resolve_name(name) {
            Some(source) => match crate::parser::parse_formula(&source) {
                Ok(parsed) => match crate::typecheck::typecheck(parsed, crate::typecheck::ExpectedType::Any) {
                    Ok(typed) => eval_expr(&typed, ctx),
                    Err(_) => FormulaValue::Error(CellError::Name),
                },
                Err(_) => FormulaValue::Error(CellError::Name),
            },
            None => FormulaValue::Error(CellError::Name),
        },

        TExpr::Arith { op, left, right } => {
            let l = eval_expr(left, ctx);
            if l.is_error() {
                return l;
            }
            let r = eval_expr(right, ctx);
            if r.is_error() {
                return r;
            }
            let (ln, rn) = match (l.to_number(), r.to_number()) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) => return FormulaValue::Error(e),
                (_, Err(e)) => return FormulaValue::Error(e),
            };
            arith(*op, ln, rn)
        }

        TExpr::Compare { op, left, right } => {
            let l = eval_expr(left, ctx);
            if l.is_error() {
                return l;
            }
            let r = eval_expr(right, ctx);
            if r.is_error() {
                return r;
            }
            FormulaValue::Bool(compare(*op, &l, &r))
        }

        TExpr::Concat { left, right } => {
            let l = eval_expr(left, ctx);
            if l.is_error() {
                return l;
            }
            let r = eval_expr(right, ctx);
            if r.is_error() {
                return r;
            }
            FormulaValue::Text(format!("{}{}", l.to_text(), r.to_text()))
        }

        TExpr::Neg(inner) => {
            let v = eval_expr(inner, ctx);
            if v.is_error() {
                return v;
            }
            match v.to_number() {
                Ok(n) => FormulaValue::Number(-n),
                Err(e) => FormulaValue::Error(e),
            }
        }

        TExpr::Percent(inner) => {
            let v = eval_expr(inner, ctx);
            if v.is_error() {
                return v;
            }
            match v.to_number() {
                Ok(n) => FormulaValue::Number(n / Decimal::from(100)),
                Err(e) => FormulaValue::Error(e),
            }
        }

        TExpr::ToInt(inner) => {
            let v = eval_expr(inner, ctx);
            if v.is_error() {
                return v;
            }
            match v.to_number() {
                Ok(n) if n.fract().is_zero() => FormulaValue::Number(n),
                Ok(_) => FormulaValue::Error(CellError::Value),
                Err(e) => FormulaValue::Error(e),
            }
        }

        TExpr::DateToSerial(inner) | TExpr::DateTimeToSerial(inner) => {
            let v = eval_expr(inner, ctx);
            if v.is_error() {
                return v;
            }
            match v.to_datetime() {
                Ok(dt) => FormulaValue::Number(xlengine_core::datetime_to_serial(dt)),
                Err(_) => match v.to_number() {
                    Ok(n) => FormulaValue::Number(n),
                    Err(e) => FormulaValue::Error(e),
                },
            }
        }

        TExpr::Aggregate { aggregator, ranges } => aggregate(*aggregator, ranges, ctx),

        // Args are handed to the function's own eval closure unevaluated;
        // short-circuiting functions (IF, AND/OR, IFERROR) decide which
        // arguments to force via `ctx.eval_arg` themselves.
        TExpr::Call { spec, args } => (spec.eval)(args, ctx),

        TExpr::Array(rows) => FormulaValue::Array(
            rows.iter()
                .map(|row| row.iter().map(|e| eval_expr(e, ctx)).collect())
                .collect(),
        ),
    }
}

fn arith(op: ArithOp, l: Decimal, r: Decimal) -> FormulaValue {
    match op {
        ArithOp::Add => FormulaValue::Number(l + r),
        ArithOp::Sub => FormulaValue::Number(l - r),
        ArithOp::Mul => FormulaValue::Number(l * r),
        ArithOp::Div => {
            if r.is_zero() {
                FormulaValue::Error(CellError::Div0)
            } else {
                FormulaValue::Number(l / r)
            }
        }
        ArithOp::Pow => {
            if l.is_zero() && r.is_zero() {
                return FormulaValue::Number(Decimal::ONE);
            }
            // Integer exponents use exact repeated multiplication; anything
            // else round-trips through f64 (Excel's own POWER is binary
            // floating point under the hood, so this matches its behavior).
            if r.fract().is_zero() && r.abs() <= Decimal::from(1000) {
                let mut exp: i64 = r.to_string().parse().unwrap_or(0);
                let negative = exp < 0;
                exp = exp.abs();
                let mut acc = Decimal::ONE;
                for _ in 0..exp {
                    acc *= l;
                }
                if negative {
                    if acc.is_zero() {
                        return FormulaValue::Error(CellError::Div0);
                    }
                    acc = Decimal::ONE / acc;
                }
                return FormulaValue::Number(acc);
            }
            match (l.to_f64(), r.to_f64()) {
                (Some(lf), Some(rf)) => {
                    let powed = lf.powf(rf);
                    if powed.is_finite() {
                        Decimal::from_f64(powed)
                            .map(FormulaValue::Number)
                            .unwrap_or(FormulaValue::Error(CellError::Num))
                    } else {
                        FormulaValue::Error(CellError::Num)
                    }
                }
                _ => FormulaValue::Error(CellError::Num),
            }
        }
    }
}

fn compare(op: CompareOp, l: &FormulaValue, r: &FormulaValue) -> bool {
    use std::cmp::Ordering;
    let ordering = match (l, r) {
        (FormulaValue::Number(a), FormulaValue::Number(b)) => a.partial_cmp(b),
        (FormulaValue::Text(a), FormulaValue::Text(b)) => {
            a.to_uppercase().partial_cmp(&b.to_uppercase())
        }
        (FormulaValue::Bool(a), FormulaValue::Bool(b)) => a.partial_cmp(b),
        _ => {
            let (a, b) = (l.to_number(), r.to_number());
            match (a, b) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b),
                _ => return matches!(op, CompareOp::Ne),
            }
        }
    }
    .unwrap_or(Ordering::Equal);

    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}
