//! Time-value-of-money functions: PV/FV/PMT/NPER/RATE for level annuities,
//! NPV/IRR for periodic cash flows, XNPV/XIRR for dated ones.
//!
//! RATE/IRR/XIRR have no closed form — they're solved by Newton-Raphson
//! with a numerical derivative, falling back to `#NUM!` when the iteration
//! doesn't converge within the tolerance.

use rust_decimal::Decimal;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::CellError;

const MAX_ITER: u32 = 100;
const TOL: f64 = 1e-10;

fn numerical_derivative(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-5;
    (f(x + h) - f(x - h)) / (2.0 * h)
}

fn newton(f: impl Fn(f64) -> f64, guess: f64) -> Option<f64> {
    let mut x = guess;
    for _ in 0..MAX_ITER {
        let fx = f(x);
        if fx.abs() < TOL {
            return Some(x);
        }
        let deriv = numerical_derivative(&f, x);
        if deriv.abs() < 1e-12 {
            return None;
        }
        let next = x - fx / deriv;
        if !next.is_finite() {
            return None;
        }
        x = next;
    }
    None
}

fn present_value(rate: f64, nper: f64, pmt: f64, fv: f64, typ: f64) -> f64 {
    if rate.abs() < 1e-10 {
        -(pmt * nper + fv)
    } else {
        let factor = (1.0 + rate).powf(-nper);
        let pv_pmt = pmt * (1.0 + rate * typ) * (1.0 - factor) / rate;
        -(pv_pmt + fv * factor)
    }
}

fn future_value(rate: f64, nper: f64, pmt: f64, pv: f64, typ: f64) -> f64 {
    if rate.abs() < 1e-10 {
        -(pv + pmt * nper)
    } else {
        let factor = (1.0 + rate).powf(nper);
        let fv_pv = pv * factor;
        let fv_pmt = pmt * (1.0 + rate * typ) * (factor - 1.0) / rate;
        -(fv_pv + fv_pmt)
    }
}

fn payment(rate: f64, nper: f64, pv: f64, fv: f64, typ: f64) -> f64 {
    if rate.abs() < 1e-10 {
        -(pv + fv) / nper
    } else {
        let factor = (1.0 + rate).powf(nper);
        let numerator = -(pv * factor + fv);
        let denom = (1.0 + rate * typ) * (factor - 1.0) / rate;
        numerator / denom
    }
}

fn periods(rate: f64, pmt: f64, pv: f64, fv: f64, typ: f64) -> Option<f64> {
    if rate.abs() < 1e-10 {
        if pmt.abs() < 1e-15 {
            return None;
        }
        return Some(-(pv + fv) / pmt);
    }
    let pmt_term = pmt * (1.0 + rate * typ) / rate;
    let numerator = pmt_term - fv;
    let denominator = pv + pmt_term;
    if denominator == 0.0 || numerator / denominator <= 0.0 {
        return None;
    }
    Some((numerator / denominator).ln() / (1.0 + rate).ln())
}

fn rate_residual(rate: f64, nper: f64, pmt: f64, pv: f64, fv: f64, typ: f64) -> f64 {
    if rate.abs() < 1e-10 {
        pv + pmt * nper + fv
    } else {
        let factor = (1.0 + rate).powf(-nper);
        pv + pmt * (1.0 + rate * typ) * (1.0 - factor) / rate + fv * factor
    }
}

fn npv_at(rate: f64, flows: &[f64]) -> f64 {
    flows.iter().enumerate().map(|(i, cf)| cf / (1.0 + rate).powf(i as f64)).sum()
}

fn xnpv_at(rate: f64, flows: &[f64], dates: &[f64]) -> f64 {
    let base = dates[0];
    flows.iter().zip(dates).map(|(cf, d)| cf / (1.0 + rate).powf((d - base) / 365.0)).sum()
}

fn fn_pv(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rate = super::num(args, 0, ctx);
    let nper = super::num(args, 1, ctx);
    let pmt = super::num(args, 2, ctx);
    let fv = super::opt_num(args, 3, ctx, Decimal::ZERO);
    let typ = super::opt_num(args, 4, ctx, Decimal::ZERO);
    let (Ok(rate), Ok(nper), Ok(pmt), Ok(fv), Ok(typ)) = (rate, nper, pmt, fv, typ) else {
        return FormulaValue::Error(CellError::Value);
    };
    let (Ok(rate), Ok(nper), Ok(pmt), Ok(fv), Ok(typ)) =
        (super::to_f64(rate), super::to_f64(nper), super::to_f64(pmt), super::to_f64(fv), super::to_f64(typ))
    else {
        return FormulaValue::Error(CellError::Num);
    };
    super::num_result(super::from_f64(present_value(rate, nper, pmt, fv, typ)))
}

fn fn_fv(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rate = super::num(args, 0, ctx);
    let nper = super::num(args, 1, ctx);
    let pmt = super::num(args, 2, ctx);
    let pv = super::opt_num(args, 3, ctx, Decimal::ZERO);
    let typ = super::opt_num(args, 4, ctx, Decimal::ZERO);
    let (Ok(rate), Ok(nper), Ok(pmt), Ok(pv), Ok(typ)) = (rate, nper, pmt, pv, typ) else {
        return FormulaValue::Error(CellError::Value);
    };
    let (Ok(rate), Ok(nper), Ok(pmt), Ok(pv), Ok(typ)) =
        (super::to_f64(rate), super::to_f64(nper), super::to_f64(pmt), super::to_f64(pv), super::to_f64(typ))
    else {
        return FormulaValue::Error(CellError::Num);
    };
    super::num_result(super::from_f64(future_value(rate, nper, pmt, pv, typ)))
}

fn fn_pmt(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rate = super::num(args, 0, ctx);
    let nper = super::num(args, 1, ctx);
    let pv = super::num(args, 2, ctx);
    let fv = super::opt_num(args, 3, ctx, Decimal::ZERO);
    let typ = super::opt_num(args, 4, ctx, Decimal::ZERO);
    let (Ok(rate), Ok(nper), Ok(pv), Ok(fv), Ok(typ)) = (rate, nper, pv, fv, typ) else {
        return FormulaValue::Error(CellError::Value);
    };
    let (Ok(rate), Ok(nper), Ok(pv), Ok(fv), Ok(typ)) =
        (super::to_f64(rate), super::to_f64(nper), super::to_f64(pv), super::to_f64(fv), super::to_f64(typ))
    else {
        return FormulaValue::Error(CellError::Num);
    };
    if nper == 0.0 {
        return FormulaValue::Error(CellError::Div0);
    }
    super::num_result(super::from_f64(payment(rate, nper, pv, fv, typ)))
}

fn fn_nper(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rate = super::num(args, 0, ctx);
    let pmt = super::num(args, 1, ctx);
    let pv = super::num(args, 2, ctx);
    let fv = super::opt_num(args, 3, ctx, Decimal::ZERO);
    let typ = super::opt_num(args, 4, ctx, Decimal::ZERO);
    let (Ok(rate), Ok(pmt), Ok(pv), Ok(fv), Ok(typ)) = (rate, pmt, pv, fv, typ) else {
        return FormulaValue::Error(CellError::Value);
    };
    let (Ok(rate), Ok(pmt), Ok(pv), Ok(fv), Ok(typ)) =
        (super::to_f64(rate), super::to_f64(pmt), super::to_f64(pv), super::to_f64(fv), super::to_f64(typ))
    else {
        return FormulaValue::Error(CellError::Num);
    };
    match periods(rate, pmt, pv, fv, typ) {
        Some(n) => super::num_result(super::from_f64(n)),
        None => FormulaValue::Error(CellError::Num),
    }
}

fn fn_rate(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let nper = super::num(args, 0, ctx);
    let pmt = super::num(args, 1, ctx);
    let pv = super::num(args, 2, ctx);
    let fv = super::opt_num(args, 3, ctx, Decimal::ZERO);
    let typ = super::opt_num(args, 4, ctx, Decimal::ZERO);
    let default_guess = super::from_f64(ctx.options.default_guess).unwrap_or(Decimal::new(1, 1));
    let guess = super::opt_num(args, 5, ctx, default_guess);
    let (Ok(nper), Ok(pmt), Ok(pv), Ok(fv), Ok(typ), Ok(guess)) = (nper, pmt, pv, fv, typ, guess) else {
        return FormulaValue::Error(CellError::Value);
    };
    let (Ok(nper), Ok(pmt), Ok(pv), Ok(fv), Ok(typ), Ok(guess)) = (
        super::to_f64(nper),
        super::to_f64(pmt),
        super::to_f64(pv),
        super::to_f64(fv),
        super::to_f64(typ),
        super::to_f64(guess),
    ) else {
        return FormulaValue::Error(CellError::Num);
    };
    match newton(|r| rate_residual(r, nper, pmt, pv, fv, typ), guess) {
        Some(r) => super::num_result(super::from_f64(r)),
        None => FormulaValue::Error(CellError::Num),
    }
}

fn collect_flows(args: &[Arg], ctx: &EvalCtx) -> Result<Vec<f64>, CellError> {
    let mut out = Vec::new();
    for arg in args {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return Err(e);
            }
            if let FormulaValue::Number(n) = v {
                out.push(super::to_f64(n)?);
            }
        }
    }
    Ok(out)
}

fn fn_npv(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rate = match super::num(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let rate = match super::to_f64(rate) {
        Ok(r) => r,
        Err(e) => return FormulaValue::Error(e),
    };
    let flows = match collect_flows(&args[1..], ctx) {
        Ok(f) => f,
        Err(e) => return FormulaValue::Error(e),
    };
    super::num_result(super::from_f64(npv_at(rate, &flows)))
}

fn fn_irr(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let flows = match super::flatten(ctx.eval_arg(&args[0]))
        .into_iter()
        .map(|v| v.to_number().and_then(super::to_f64))
        .collect::<Result<Vec<f64>, _>>()
    {
        Ok(f) => f,
        Err(e) => return FormulaValue::Error(e),
    };
    let default_guess = super::from_f64(ctx.options.default_guess).unwrap_or(Decimal::new(1, 1));
    let guess = match super::opt_num(args, 1, ctx, default_guess).and_then(super::to_f64) {
        Ok(g) => g,
        Err(e) => return FormulaValue::Error(e),
    };
    match newton(|r| npv_at(r, &flows), guess) {
        Some(r) => super::num_result(super::from_f64(r)),
        None => FormulaValue::Error(CellError::Num),
    }
}

fn fn_xnpv(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rate = match super::num(args, 0, ctx).and_then(super::to_f64) {
        Ok(r) => r,
        Err(e) => return FormulaValue::Error(e),
    };
    let flows = match super::flatten(ctx.eval_arg(&args[1]))
        .into_iter()
        .map(|v| v.to_number().and_then(super::to_f64))
        .collect::<Result<Vec<f64>, _>>()
    {
        Ok(f) => f,
        Err(e) => return FormulaValue::Error(e),
    };
    let dates = match super::flatten(ctx.eval_arg(&args[2]))
        .into_iter()
        .map(|v| v.to_number().and_then(super::to_f64))
        .collect::<Result<Vec<f64>, _>>()
    {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    if flows.len() != dates.len() || flows.is_empty() {
        return FormulaValue::Error(CellError::Num);
    }
    super::num_result(super::from_f64(xnpv_at(rate, &flows, &dates)))
}

fn fn_xirr(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let flows = match super::flatten(ctx.eval_arg(&args[0]))
        .into_iter()
        .map(|v| v.to_number().and_then(super::to_f64))
        .collect::<Result<Vec<f64>, _>>()
    {
        Ok(f) => f,
        Err(e) => return FormulaValue::Error(e),
    };
    let dates = match super::flatten(ctx.eval_arg(&args[1]))
        .into_iter()
        .map(|v| v.to_number().and_then(super::to_f64))
        .collect::<Result<Vec<f64>, _>>()
    {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    if flows.len() != dates.len() || flows.is_empty() {
        return FormulaValue::Error(CellError::Num);
    }
    let default_guess = super::from_f64(ctx.options.default_guess).unwrap_or(Decimal::new(1, 1));
    let guess = match super::opt_num(args, 2, ctx, default_guess).and_then(super::to_f64) {
        Ok(g) => g,
        Err(e) => return FormulaValue::Error(e),
    };
    match newton(|r| xnpv_at(r, &flows, &dates), guess) {
        Some(r) => super::num_result(super::from_f64(r)),
        None => FormulaValue::Error(CellError::Num),
    }
}

pub fn specs() -> Vec<FunctionSpec> {
    use ArgKind::{Either, Expr};
    vec![
        super::spec("PV", ArgShape::exprs(3).with_optional(&[Expr, Expr]), fn_pv),
        super::spec("FV", ArgShape::exprs(3).with_optional(&[Expr, Expr]), fn_fv),
        super::spec("PMT", ArgShape::exprs(3).with_optional(&[Expr, Expr]), fn_pmt),
        super::spec("NPER", ArgShape::exprs(3).with_optional(&[Expr, Expr]), fn_nper),
        super::spec("RATE", ArgShape::exprs(3).with_optional(&[Expr, Expr, Expr]), fn_rate),
        super::spec("NPV", ArgShape::fixed(&[Expr, Either]).variadic_tail(Either), fn_npv),
        super::spec("IRR", ArgShape::fixed(&[Either]).with_optional(&[Expr]), fn_irr),
        super::spec("XNPV", ArgShape::fixed(&[Expr, Either, Either]), fn_xnpv),
        super::spec("XIRR", ArgShape::fixed(&[Either, Either]).with_optional(&[Expr]), fn_xirr),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CellAddress, RangeLocation, TExpr};
    use crate::evaluator::{EvalOptions, Env};
    use xlengine_core::{CellRange, CellValue};

    struct FlowsEnv;
    impl Env for FlowsEnv {
        fn cell_value(&self, _sheet: Option<&str>, row: u32, _col: u16) -> CellValue {
            let flows = [-1000.0, 300.0, 420.0, 680.0];
            CellValue::Number(rust_decimal::Decimal::try_from(flows[row as usize]).unwrap())
        }
        fn current_sheet(&self) -> &str { "Sheet1" }
        fn current_row(&self) -> u32 { 0 }
        fn current_col(&self) -> u16 { 0 }
        fn sheet_index(&self, _name: &str) -> Option<usize> { Some(0) }
        fn used_range(&self, _sheet: Option<&str>) -> Option<CellRange> { None }
        fn resolve_name(&self, _name: &str) -> Option<String> { None }
    }

    fn num(n: i64) -> Arg {
        Arg::Expr(TExpr::Number(Decimal::from(n)))
    }
    fn dec(s: &str) -> Arg {
        Arg::Expr(TExpr::Number(s.parse().unwrap()))
    }

    #[test]
    fn test_pv_zero_rate_is_linear() {
        let env = FlowsEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(0), num(10), dec("-100")];
        assert_eq!(fn_pv(&args, &ctx), FormulaValue::Number(Decimal::from(1000)));
    }

    #[test]
    fn test_fv_matches_pv_inverse() {
        let env = FlowsEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [dec("0.05"), num(10), dec("-100"), num(0), num(0)];
        let FormulaValue::Number(fv) = fn_fv(&args, &ctx) else { panic!("expected number") };
        assert!((super::super::to_f64(fv).unwrap() - 1257.79).abs() < 1.0);
    }

    #[test]
    fn test_irr_converges_on_known_series() {
        let env = FlowsEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let range = Arg::Range(RangeLocation::Local(CellRange::new(CellAddress::new(0, 0), CellAddress::new(3, 0))));
        let args = [range];
        let FormulaValue::Number(rate) = fn_irr(&args, &ctx) else { panic!("expected number") };
        let r = super::super::to_f64(rate).unwrap();
        assert!(r > 0.0 && r < 1.0);
    }
}
