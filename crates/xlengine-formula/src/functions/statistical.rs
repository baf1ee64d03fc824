//! Statistical functions: the `*IF`/`*IFS` criteria family plus order
//! statistics. COUNTA/COUNTBLANK are not registered here — the parser
//! routes those names straight to `TExpr::Aggregate`, same as COUNT/SUM,
//! so a `Call`-dispatched definition would never be reached.

use rust_decimal::Decimal;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::CellError;

use super::criteria::CriteriaMatcher;

fn fn_countif(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let range = super::flatten(ctx.eval_arg(&args[0]));
    let criteria = super::eval(args, 1, ctx);
    let matcher = CriteriaMatcher::new(&criteria);
    FormulaValue::Number(Decimal::from(range.iter().filter(|v| matcher.matches(v)).count() as u32))
}

fn fn_countifs(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    if args.len() % 2 != 0 || args.is_empty() {
        return FormulaValue::Error(CellError::Value);
    }
    let pairs = args.len() / 2;
    let mut ranges = Vec::with_capacity(pairs);
    let mut matchers = Vec::with_capacity(pairs);
    for i in 0..pairs {
        ranges.push(super::flatten(ctx.eval_arg(&args[i * 2])));
        matchers.push(CriteriaMatcher::new(&super::eval(args, i * 2 + 1, ctx)));
    }
    let len = ranges[0].len();
    if ranges.iter().any(|r| r.len() != len) {
        return FormulaValue::Error(CellError::Value);
    }
    let mut count = 0u32;
    for idx in 0..len {
        if ranges.iter().zip(&matchers).all(|(r, m)| m.matches(&r[idx])) {
            count += 1;
        }
    }
    FormulaValue::Number(Decimal::from(count))
}

fn fn_averageif(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let criteria_range = super::flatten(ctx.eval_arg(&args[0]));
    let criteria = super::eval(args, 1, ctx);
    let average_range = match args.get(2) {
        Some(a) => super::flatten(ctx.eval_arg(a)),
        None => criteria_range.clone(),
    };
    if average_range.len() != criteria_range.len() {
        return FormulaValue::Error(CellError::Value);
    }
    let matcher = CriteriaMatcher::new(&criteria);
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;
    for (c, v) in criteria_range.iter().zip(average_range.iter()) {
        if matcher.matches(c) {
            match v.to_number() {
                Ok(n) => {
                    sum += n;
                    count += 1;
                }
                Err(e) => return FormulaValue::Error(e),
            }
        }
    }
    if count == 0 {
        return FormulaValue::Error(CellError::Div0);
    }
    FormulaValue::Number(sum / Decimal::from(count))
}

fn fn_averageifs(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return FormulaValue::Error(CellError::Value);
    }
    let average_range = super::flatten(ctx.eval_arg(&args[0]));
    let pairs = (args.len() - 1) / 2;
    let mut ranges = Vec::with_capacity(pairs);
    let mut matchers = Vec::with_capacity(pairs);
    for i in 0..pairs {
        ranges.push(super::flatten(ctx.eval_arg(&args[1 + i * 2])));
        matchers.push(CriteriaMatcher::new(&super::eval(args, 1 + i * 2 + 1, ctx)));
    }
    if ranges.iter().any(|r| r.len() != average_range.len()) {
        return FormulaValue::Error(CellError::Value);
    }
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;
    for idx in 0..average_range.len() {
        if ranges.iter().zip(&matchers).all(|(r, m)| m.matches(&r[idx])) {
            match average_range[idx].to_number() {
                Ok(n) => {
                    sum += n;
                    count += 1;
                }
                Err(e) => return FormulaValue::Error(e),
            }
        }
    }
    if count == 0 {
        return FormulaValue::Error(CellError::Div0);
    }
    FormulaValue::Number(sum / Decimal::from(count))
}

fn collect_numbers(args: &[Arg], ctx: &EvalCtx) -> Result<Vec<Decimal>, CellError> {
    let mut out = Vec::new();
    for arg in args {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return Err(e);
            }
            if let FormulaValue::Number(n) = v {
                out.push(n);
            }
        }
    }
    Ok(out)
}

fn fn_median(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let mut nums = match collect_numbers(args, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if nums.is_empty() {
        return FormulaValue::Error(CellError::Num);
    }
    nums.sort();
    let mid = nums.len() / 2;
    let median = if nums.len() % 2 == 1 { nums[mid] } else { (nums[mid - 1] + nums[mid]) / Decimal::from(2) };
    FormulaValue::Number(median)
}

fn kth_order_stat(args: &[Arg], ctx: &EvalCtx, largest: bool) -> FormulaValue {
    let nums = match collect_numbers(&args[..args.len() - 1], ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let k = match super::int_arg(args, args.len() - 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if k < 1 || k as usize > nums.len() {
        return FormulaValue::Error(CellError::Num);
    }
    let mut sorted = nums;
    sorted.sort();
    if largest {
        sorted.reverse();
    }
    FormulaValue::Number(sorted[k as usize - 1])
}

fn fn_large(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    kth_order_stat(args, ctx, true)
}

fn fn_small(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    kth_order_stat(args, ctx, false)
}

pub fn specs() -> Vec<FunctionSpec> {
    use ArgKind::{Either, Expr};
    vec![
        super::spec("COUNTIF", ArgShape::fixed(&[Either, Expr]), fn_countif),
        super::spec("COUNTIFS", ArgShape::fixed(&[Either, Expr]).variadic_tail(Either), fn_countifs),
        super::spec("AVERAGEIF", ArgShape::fixed(&[Either, Expr]).with_optional(&[Either]), fn_averageif),
        super::spec(
            "AVERAGEIFS",
            ArgShape::fixed(&[Either, Either, Expr]).variadic_tail(Either),
            fn_averageifs,
        ),
        super::spec("MEDIAN", ArgShape::fixed(&[Either]).variadic_tail(Either), fn_median),
        super::spec("LARGE", ArgShape::fixed(&[Either, Expr]), fn_large),
        super::spec("SMALL", ArgShape::fixed(&[Either, Expr]), fn_small),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CellAddress, RangeLocation, TExpr};
    use crate::evaluator::{EvalOptions, Env};
    use xlengine_core::{CellRange, CellValue};

    struct FakeEnv;
    impl Env for FakeEnv {
        fn cell_value(&self, _sheet: Option<&str>, row: u32, _col: u16) -> CellValue {
            CellValue::Number(Decimal::from(row as i64 + 1))
        }
        fn current_sheet(&self) -> &str { "Sheet1" }
        fn current_row(&self) -> u32 { 0 }
        fn current_col(&self) -> u16 { 0 }
        fn sheet_index(&self, _name: &str) -> Option<usize> { Some(0) }
        fn used_range(&self, _sheet: Option<&str>) -> Option<CellRange> { None }
        fn resolve_name(&self, _name: &str) -> Option<String> { None }
    }

    fn range3() -> Arg {
        Arg::Range(RangeLocation::Local(CellRange::new(
            CellAddress::new(0, 0),
            CellAddress::new(2, 0),
        )))
    }
    fn num(n: i64) -> Arg {
        Arg::Expr(TExpr::Number(Decimal::from(n)))
    }
    fn text(s: &str) -> Arg {
        Arg::Expr(TExpr::Text(s.to_string()))
    }

    #[test]
    fn test_countif_counts_matches() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [range3(), text(">1")];
        assert_eq!(fn_countif(&args, &ctx), FormulaValue::Number(Decimal::from(2)));
    }

    #[test]
    fn test_median_of_three() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(1), num(5), num(3)];
        assert_eq!(fn_median(&args, &ctx), FormulaValue::Number(Decimal::from(3)));
    }

    #[test]
    fn test_large_and_small() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(10), num(30), num(20), num(1)];
        assert_eq!(fn_large(&args, &ctx), FormulaValue::Number(Decimal::from(30)));
        assert_eq!(fn_small(&args, &ctx), FormulaValue::Number(Decimal::from(10)));
    }

    #[test]
    fn test_small_rejects_k_out_of_range() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(10), num(30), num(5)];
        assert_eq!(fn_small(&args, &ctx), FormulaValue::Error(CellError::Num));
    }
}
