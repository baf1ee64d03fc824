//! Built-in function implementations, grouped by category.
//!
//! Each submodule exposes `specs() -> Vec<FunctionSpec>`; `function_spec.rs`
//! folds all nine into the closed [`crate::function_spec::FUNCTIONS`]
//! registry. SUM/COUNT/COUNTA/COUNTBLANK/AVERAGE/MIN/MAX are not defined
//! here — the parser routes them to `TExpr::Aggregate`, evaluated directly
//! by `evaluator::aggregate` rather than through a `FunctionSpec`.

pub mod criteria;
pub mod date;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgShape, EvalFn, FunctionSpec};
use xlengine_core::CellError;

/// Build a non-volatile, non-short-circuiting, untyped-return spec — the
/// common case. Override individual fields with struct-update syntax for
/// the handful of functions that need `volatile`, `returns_date`,
/// `returns_time`, or `short_circuits`.
pub fn spec(name: &'static str, shape: ArgShape, eval: EvalFn) -> FunctionSpec {
    FunctionSpec {
        name,
        shape,
        returns_date: false,
        returns_time: false,
        short_circuits: false,
        volatile: false,
        eval,
        print_args: crate::function_spec::default_print,
        shift: crate::function_spec::default_shift,
    }
}

/// Flatten any `FormulaValue` into a row-major `Vec`: an `Array` expands to
/// its cells, anything else becomes a one-element vec. Lets every function
/// treat an `Arg::Range` and a literal array argument the same way once it's
/// gone through `ctx.eval_arg`.
pub fn flatten(value: FormulaValue) -> Vec<FormulaValue> {
    match value {
        FormulaValue::Array(rows) => rows.into_iter().flatten().collect(),
        other => vec![other],
    }
}

/// Evaluate `args[index]`, propagating an out-of-range index as `#VALUE!`
/// (shouldn't happen for a function whose `ArgShape` was validated by
/// `typecheck`, but keeps these helpers panic-free).
pub fn eval(args: &[Arg], index: usize, ctx: &EvalCtx) -> FormulaValue {
    match args.get(index) {
        Some(arg) => ctx.eval_arg(arg),
        None => FormulaValue::Error(CellError::Value),
    }
}

pub fn num(args: &[Arg], index: usize, ctx: &EvalCtx) -> Result<Decimal, CellError> {
    eval(args, index, ctx).to_number()
}

pub fn opt_num(args: &[Arg], index: usize, ctx: &EvalCtx, default: Decimal) -> Result<Decimal, CellError> {
    match args.get(index) {
        Some(_) => num(args, index, ctx),
        None => Ok(default),
    }
}

pub fn text(args: &[Arg], index: usize, ctx: &EvalCtx) -> Result<String, CellError> {
    let v = eval(args, index, ctx);
    match v.error() {
        Some(e) => Err(e),
        None => Ok(v.to_text()),
    }
}

pub fn opt_text(args: &[Arg], index: usize, ctx: &EvalCtx, default: &str) -> Result<String, CellError> {
    match args.get(index) {
        Some(_) => text(args, index, ctx),
        None => Ok(default.to_string()),
    }
}

/// A number argument truncated toward zero to an `i64`, per the many
/// Excel functions that accept a fractional count and silently truncate it.
pub fn int_arg(args: &[Arg], index: usize, ctx: &EvalCtx) -> Result<i64, CellError> {
    let n = num(args, index, ctx)?;
    n.trunc().to_i64().ok_or(CellError::Num)
}

pub fn opt_int(args: &[Arg], index: usize, ctx: &EvalCtx, default: i64) -> Result<i64, CellError> {
    match args.get(index) {
        Some(_) => int_arg(args, index, ctx),
        None => Ok(default),
    }
}

/// Collapse a `Result<Decimal, CellError>` into the `FormulaValue` every
/// `eval` closure has to return.
pub fn num_result(result: Result<Decimal, CellError>) -> FormulaValue {
    match result {
        Ok(n) => FormulaValue::Number(n),
        Err(e) => FormulaValue::Error(e),
    }
}

/// `Decimal` doesn't implement the transcendental functions; this and
/// [`from_f64`] are the round-trip pair functions use to borrow `f64`'s
/// `sqrt`/`ln`/trig/etc. and land back in the exact-decimal domain.
pub fn to_f64(n: Decimal) -> Result<f64, CellError> {
    n.to_f64().ok_or(CellError::Num)
}

pub fn from_f64(n: f64) -> Result<Decimal, CellError> {
    if !n.is_finite() {
        return Err(CellError::Num);
    }
    Decimal::from_f64(n).ok_or(CellError::Num)
}

/// 10^digits as an exact `Decimal`, for ROUND-family scaling.
pub fn pow10(digits: i32) -> Decimal {
    if digits >= 0 {
        Decimal::from(10u64.pow(digits as u32))
    } else {
        Decimal::ONE / Decimal::from(10u64.pow((-digits) as u32))
    }
}

pub fn scale_factor(digits: i32) -> Decimal {
    pow10(digits)
}

/// ROUND's "round half away from zero" rule, done in exact `Decimal`
/// arithmetic rather than the float-based `(n*mult+0.5).floor()/mult`
/// approximation — `Decimal` already carries exact base-10 digits, so there
/// is no reason to introduce binary-float error here.
pub fn round_half_away(n: Decimal, digits: i32) -> Decimal {
    let factor = scale_factor(digits);
    let scaled = n * factor;
    let half = Decimal::new(5, 1); // 0.5
    let rounded = if scaled.is_sign_negative() {
        (scaled - half).ceil()
    } else {
        (scaled + half).floor()
    };
    rounded / factor
}
