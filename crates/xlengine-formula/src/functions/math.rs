//! Math and trig functions, plus the SUM-family criteria functions
//! (SUMIF/SUMIFS/SUMPRODUCT). SUM/AVERAGE/MIN/MAX/COUNT live in the
//! evaluator's `aggregate()` — the parser routes those names to
//! `TExpr::Aggregate` directly, never through this registry.

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::CellError;

use super::criteria::CriteriaMatcher;

fn fn_rand(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Number(super::from_f64(rand::thread_rng().gen::<f64>()).unwrap_or(Decimal::ZERO))
}

fn fn_randbetween(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let lo = match super::int_arg(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let hi = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if lo > hi {
        return FormulaValue::Error(CellError::Num);
    }
    FormulaValue::Number(Decimal::from(rand::thread_rng().gen_range(lo..=hi)))
}

fn fn_abs(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    super::num_result(super::num(args, 0, ctx).map(|n| n.abs()))
}

fn fn_round(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let digits = match super::opt_int(args, 1, ctx, 0) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    FormulaValue::Number(super::round_half_away(n, digits as i32))
}

fn fn_roundup(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let digits = match super::opt_int(args, 1, ctx, 0) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let factor = super::scale_factor(digits as i32);
    let scaled = n * factor;
    let rounded = if scaled >= Decimal::ZERO { scaled.ceil() } else { scaled.floor() };
    FormulaValue::Number(rounded / factor)
}

fn fn_rounddown(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let digits = match super::opt_int(args, 1, ctx, 0) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let factor = super::scale_factor(digits as i32);
    let scaled = n * factor;
    let truncated = if scaled >= Decimal::ZERO { scaled.floor() } else { scaled.ceil() };
    FormulaValue::Number(truncated / factor)
}

fn fn_mod(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let a = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let b = match super::num(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if b.is_zero() {
        return FormulaValue::Error(CellError::Div0);
    }
    let r = a % b;
    let r = if !r.is_zero() && (r.is_sign_negative() != b.is_sign_negative()) { r + b } else { r };
    FormulaValue::Number(r)
}

fn fn_int(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    super::num_result(super::num(args, 0, ctx).map(|n| n.floor()))
}

fn fn_trunc(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let digits = match super::opt_int(args, 1, ctx, 0) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let factor = super::scale_factor(digits as i32);
    let scaled = n * factor;
    let truncated = if scaled >= Decimal::ZERO { scaled.floor() } else { scaled.ceil() };
    FormulaValue::Number(truncated / factor)
}

fn fn_sign(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    super::num_result(super::num(args, 0, ctx).map(|n| {
        if n.is_zero() {
            Decimal::ZERO
        } else if n.is_sign_positive() {
            Decimal::ONE
        } else {
            -Decimal::ONE
        }
    }))
}

fn fn_sqrt(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n.is_sign_negative() {
        return FormulaValue::Error(CellError::Num);
    }
    match n.sqrt() {
        Some(r) => FormulaValue::Number(r),
        None => FormulaValue::Error(CellError::Num),
    }
}

fn fn_power(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let base = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let exp = match super::num(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let (Ok(b), Ok(e)) = (super::to_f64(base), super::to_f64(exp)) else {
        return FormulaValue::Error(CellError::Num);
    };
    let result = b.powf(e);
    super::num_result(super::from_f64(result))
}

fn trig(args: &[Arg], ctx: &EvalCtx, f: impl Fn(f64) -> f64) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let x = match super::to_f64(n) {
        Ok(x) => x,
        Err(e) => return FormulaValue::Error(e),
    };
    super::num_result(super::from_f64(f(x)))
}

fn fn_log(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let base = match super::opt_num(args, 1, ctx, Decimal::from(10)) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n.is_sign_negative() || n.is_zero() {
        return FormulaValue::Error(CellError::Num);
    }
    let (Ok(n), Ok(base)) = (super::to_f64(n), super::to_f64(base)) else {
        return FormulaValue::Error(CellError::Num);
    };
    super::num_result(super::from_f64(n.log(base)))
}

fn fn_log10(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n.is_sign_negative() || n.is_zero() {
        return FormulaValue::Error(CellError::Num);
    }
    trig(&[Arg::Expr(crate::ast::TExpr::Number(n))], ctx, f64::log10)
}

fn fn_ln(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n.is_sign_negative() || n.is_zero() {
        return FormulaValue::Error(CellError::Num);
    }
    trig(&[Arg::Expr(crate::ast::TExpr::Number(n))], ctx, f64::ln)
}

fn fn_exp(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::exp)
}

fn fn_pi(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    super::num_result(super::from_f64(std::f64::consts::PI))
}

fn fn_sin(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::sin)
}
fn fn_cos(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::cos)
}
fn fn_tan(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::tan)
}
fn fn_asin(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::asin)
}
fn fn_acos(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::acos)
}
fn fn_atan(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::atan)
}

fn fn_atan2(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let x = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let y = match super::num(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let (Ok(x), Ok(y)) = (super::to_f64(x), super::to_f64(y)) else {
        return FormulaValue::Error(CellError::Num);
    };
    super::num_result(super::from_f64(y.atan2(x)))
}

fn fn_degrees(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::to_degrees)
}
fn fn_radians(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    trig(args, ctx, f64::to_radians)
}

fn ceiling_floor_math(args: &[Arg], ctx: &EvalCtx, ceiling: bool) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let significance = match super::opt_num(args, 1, ctx, Decimal::ONE) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let mode = match super::opt_int(args, 2, ctx, 0) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if significance.is_zero() {
        return FormulaValue::Number(Decimal::ZERO);
    }
    let sig = significance.abs();
    let quotient = n / sig;
    let rounded = if ceiling {
        if n.is_sign_negative() && mode == 0 { quotient.floor() } else { quotient.ceil() }
    } else if n.is_sign_negative() && mode == 0 {
        quotient.ceil()
    } else {
        quotient.floor()
    };
    FormulaValue::Number(rounded * sig)
}

fn fn_ceiling_math(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    ceiling_floor_math(args, ctx, true)
}
fn fn_floor_math(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    ceiling_floor_math(args, ctx, false)
}

/// Rounds to the nearest multiple of `significance`; `#NUM!` if the number
/// and significance have opposite signs, matching Excel's MROUND.
fn fn_mround(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let significance = match super::num(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if significance.is_zero() {
        return FormulaValue::Number(Decimal::ZERO);
    }
    if n.is_sign_positive() != significance.is_sign_positive() && !n.is_zero() {
        return FormulaValue::Error(CellError::Num);
    }
    let quotient = n / significance;
    let rounded = super::round_half_away(quotient, 0);
    FormulaValue::Number(rounded * significance)
}

fn fn_odd(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let rounded = if n.is_sign_negative() { n.floor() } else { n.ceil() };
    let rounded = if (rounded % Decimal::from(2)).is_zero() {
        if n.is_sign_negative() { rounded - Decimal::ONE } else { rounded + Decimal::ONE }
    } else {
        rounded
    };
    FormulaValue::Number(rounded)
}

fn fn_even(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let rounded = if n.is_sign_negative() { n.floor() } else { n.ceil() };
    let rounded = if !(rounded % Decimal::from(2)).is_zero() {
        if n.is_sign_negative() { rounded - Decimal::ONE } else { rounded + Decimal::ONE }
    } else {
        rounded
    };
    FormulaValue::Number(rounded)
}

fn fn_sumif(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let range = super::flatten(ctx.eval_arg(&args[0]));
    let criteria = super::eval(args, 1, ctx);
    let sum_range = match args.get(2) {
        Some(a) => super::flatten(ctx.eval_arg(a)),
        None => range.clone(),
    };
    if sum_range.len() != range.len() {
        return FormulaValue::Error(CellError::Value);
    }
    let matcher = CriteriaMatcher::new(&criteria);
    let mut sum = Decimal::ZERO;
    for (c, v) in range.iter().zip(sum_range.iter()) {
        if matcher.matches(c) {
            if let FormulaValue::Number(n) = v {
                sum += n;
            }
        }
    }
    FormulaValue::Number(sum)
}

fn fn_sumifs(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return FormulaValue::Error(CellError::Value);
    }
    let sum_range = super::flatten(ctx.eval_arg(&args[0]));
    let pairs = (args.len() - 1) / 2;
    let mut ranges = Vec::with_capacity(pairs);
    let mut matchers = Vec::with_capacity(pairs);
    for i in 0..pairs {
        ranges.push(super::flatten(ctx.eval_arg(&args[1 + i * 2])));
        matchers.push(CriteriaMatcher::new(&super::eval(args, 1 + i * 2 + 1, ctx)));
    }
    if ranges.iter().any(|r| r.len() != sum_range.len()) {
        return FormulaValue::Error(CellError::Value);
    }
    let mut sum = Decimal::ZERO;
    for idx in 0..sum_range.len() {
        if ranges.iter().zip(&matchers).all(|(r, m)| m.matches(&r[idx])) {
            if let FormulaValue::Number(n) = sum_range[idx] {
                sum += n;
            }
        }
    }
    FormulaValue::Number(sum)
}

fn fn_sumproduct(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let arrays: Vec<Vec<FormulaValue>> = args.iter().map(|a| super::flatten(ctx.eval_arg(a))).collect();
    if arrays.is_empty() {
        return FormulaValue::Number(Decimal::ZERO);
    }
    let len = arrays[0].len();
    if arrays.iter().any(|a| a.len() != len) {
        return FormulaValue::Error(CellError::Value);
    }
    let mut total = Decimal::ZERO;
    for idx in 0..len {
        let mut product = Decimal::ONE;
        for arr in &arrays {
            match &arr[idx] {
                FormulaValue::Number(n) => product *= n,
                FormulaValue::Bool(b) => product *= Decimal::from(*b as u8),
                FormulaValue::Error(e) => return FormulaValue::Error(*e),
                _ => product *= Decimal::ZERO,
            }
        }
        total += product;
    }
    FormulaValue::Number(total)
}

pub fn specs() -> Vec<FunctionSpec> {
    use ArgKind::{Either, Expr};
    vec![
        FunctionSpec { volatile: true, ..super::spec("RAND", ArgShape::fixed(&[]), fn_rand) },
        FunctionSpec { volatile: true, ..super::spec("RANDBETWEEN", ArgShape::exprs(2), fn_randbetween) },
        super::spec("ABS", ArgShape::exprs(1), fn_abs),
        super::spec("ROUND", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_round),
        super::spec("ROUNDUP", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_roundup),
        super::spec("ROUNDDOWN", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_rounddown),
        super::spec("MOD", ArgShape::exprs(2), fn_mod),
        super::spec("INT", ArgShape::exprs(1), fn_int),
        super::spec("TRUNC", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_trunc),
        super::spec("SIGN", ArgShape::exprs(1), fn_sign),
        super::spec("SQRT", ArgShape::exprs(1), fn_sqrt),
        super::spec("POWER", ArgShape::exprs(2), fn_power),
        super::spec("LOG", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_log),
        super::spec("LOG10", ArgShape::exprs(1), fn_log10),
        super::spec("LN", ArgShape::exprs(1), fn_ln),
        super::spec("EXP", ArgShape::exprs(1), fn_exp),
        super::spec("PI", ArgShape::fixed(&[]), fn_pi),
        super::spec("SIN", ArgShape::exprs(1), fn_sin),
        super::spec("COS", ArgShape::exprs(1), fn_cos),
        super::spec("TAN", ArgShape::exprs(1), fn_tan),
        super::spec("ASIN", ArgShape::exprs(1), fn_asin),
        super::spec("ACOS", ArgShape::exprs(1), fn_acos),
        super::spec("ATAN", ArgShape::exprs(1), fn_atan),
        super::spec("ATAN2", ArgShape::exprs(2), fn_atan2),
        super::spec("DEGREES", ArgShape::exprs(1), fn_degrees),
        super::spec("RADIANS", ArgShape::exprs(1), fn_radians),
        super::spec(
            "CEILING.MATH",
            ArgShape::fixed(&[Expr]).with_optional(&[Expr, Expr]),
            fn_ceiling_math,
        ),
        super::spec("FLOOR.MATH", ArgShape::fixed(&[Expr]).with_optional(&[Expr, Expr]), fn_floor_math),
        super::spec("MROUND", ArgShape::exprs(2), fn_mround),
        super::spec("ODD", ArgShape::exprs(1), fn_odd),
        super::spec("EVEN", ArgShape::exprs(1), fn_even),
        super::spec("SUMIF", ArgShape::fixed(&[Either, Expr]).with_optional(&[Either]), fn_sumif),
        super::spec("SUMIFS", ArgShape::fixed(&[Either, Either, Expr]).variadic_tail(Either), fn_sumifs),
        super::spec("SUMPRODUCT", ArgShape::fixed(&[Either]).variadic_tail(Either), fn_sumproduct),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TExpr;
    use crate::evaluator::EvalOptions;
    use xlengine_core::CellValue;

    struct FakeEnv;
    impl crate::evaluator::Env for FakeEnv {
        fn cell_value(&self, _sheet: Option<&str>, _row: u32, _col: u16) -> CellValue {
            CellValue::Empty
        }
        fn current_sheet(&self) -> &str { "Sheet1" }
        fn current_row(&self) -> u32 { 0 }
        fn current_col(&self) -> u16 { 0 }
        fn sheet_index(&self, _name: &str) -> Option<usize> { Some(0) }
        fn used_range(&self, _sheet: Option<&str>) -> Option<xlengine_core::CellRange> { None }
        fn resolve_name(&self, _name: &str) -> Option<String> { None }
    }

    fn num(n: i64) -> Arg {
        Arg::Expr(TExpr::Number(Decimal::from(n)))
    }
    fn dec(s: &str) -> Arg {
        Arg::Expr(TExpr::Number(s.parse().unwrap()))
    }

    #[test]
    fn test_round_half_away_from_zero() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [dec("2.5"), num(0)];
        assert_eq!(fn_round(&args, &ctx), FormulaValue::Number(Decimal::from(3)));
        let args = [dec("-2.5"), num(0)];
        assert_eq!(fn_round(&args, &ctx), FormulaValue::Number(Decimal::from(-3)));
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(-7), num(3)];
        assert_eq!(fn_mod(&args, &ctx), FormulaValue::Number(Decimal::from(2)));
    }

    #[test]
    fn test_mod_by_zero_is_div0() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(5), num(0)];
        assert_eq!(fn_mod(&args, &ctx), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_sumproduct_multiplies_elementwise() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        // Single-element "arrays" via scalar args exercise the elementwise path.
        let args = [num(2), num(3)];
        assert_eq!(fn_sumproduct(&args, &ctx), FormulaValue::Number(Decimal::from(6)));
    }

    #[test]
    fn test_odd_and_even_round_away_from_zero() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        assert_eq!(fn_odd(&[num(4)], &ctx), FormulaValue::Number(Decimal::from(5)));
        assert_eq!(fn_even(&[num(3)], &ctx), FormulaValue::Number(Decimal::from(4)));
    }

    #[test]
    fn test_mround_rounds_to_nearest_multiple() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(10), num(3)];
        assert_eq!(fn_mround(&args, &ctx), FormulaValue::Number(Decimal::from(9)));
        let args = [num(-10), num(-3)];
        assert_eq!(fn_mround(&args, &ctx), FormulaValue::Number(Decimal::from(-9)));
    }

    #[test]
    fn test_mround_mismatched_signs_is_num_error() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(10), num(-3)];
        assert_eq!(fn_mround(&args, &ctx), FormulaValue::Error(CellError::Num));
    }
}
