//! Logical functions. IF/IFERROR/IFNA/IFS/SWITCH are `short_circuits: true`
//! and evaluate only the branch they need via `ctx.eval_arg` — unlike the
//! rest of the registry, they receive their operands as unevaluated `Arg`s
//! precisely so they can skip the ones they don't take.

use rust_decimal::Decimal;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::CellError;

fn fn_if(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let cond = ctx.eval_arg(&args[0]);
    let b = match cond.to_bool() {
        Ok(b) => b,
        Err(e) => return FormulaValue::Error(e),
    };
    if b {
        ctx.eval_arg(&args[1])
    } else {
        match args.get(2) {
            Some(a) => ctx.eval_arg(a),
            None => FormulaValue::Bool(false),
        }
    }
}

fn fn_and(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    for arg in args {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return FormulaValue::Error(e);
            }
            if matches!(v.to_bool(), Ok(false)) {
                return FormulaValue::Bool(false);
            }
        }
    }
    FormulaValue::Bool(true)
}

fn fn_or(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    for arg in args {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return FormulaValue::Error(e);
            }
            if matches!(v.to_bool(), Ok(true)) {
                return FormulaValue::Bool(true);
            }
        }
    }
    FormulaValue::Bool(false)
}

fn fn_not(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let v = super::eval(args, 0, ctx);
    match v.to_bool() {
        Ok(b) => FormulaValue::Bool(!b),
        Err(e) => FormulaValue::Error(e),
    }
}

fn fn_iferror(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let value = ctx.eval_arg(&args[0]);
    if value.is_error() {
        ctx.eval_arg(&args[1])
    } else {
        value
    }
}

fn fn_ifna(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let value = ctx.eval_arg(&args[0]);
    if matches!(value, FormulaValue::Error(CellError::Na)) {
        ctx.eval_arg(&args[1])
    } else {
        value
    }
}

fn fn_true(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(true)
}

fn fn_false(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(false)
}

fn fn_xor(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let mut true_count = 0u32;
    for arg in args {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return FormulaValue::Error(e);
            }
            if matches!(v.to_bool(), Ok(true)) {
                true_count += 1;
            }
        }
    }
    FormulaValue::Bool(true_count % 2 == 1)
}

fn fn_ifs(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let mut i = 0;
    while i < args.len() {
        let cond = ctx.eval_arg(&args[i]);
        let b = match cond.to_bool() {
            Ok(b) => b,
            Err(e) => return FormulaValue::Error(e),
        };
        if b {
            return ctx.eval_arg(&args[i + 1]);
        }
        i += 2;
    }
    FormulaValue::Error(CellError::Na)
}

fn values_match(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a, b) {
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        (FormulaValue::Bool(x), FormulaValue::Bool(y)) => x == y,
        (FormulaValue::Text(x), FormulaValue::Text(y)) => x.eq_ignore_ascii_case(y),
        (FormulaValue::Number(n), FormulaValue::Bool(b)) | (FormulaValue::Bool(b), FormulaValue::Number(n)) => {
            Decimal::from(*b as u8) == *n
        }
        (FormulaValue::Empty, FormulaValue::Empty) => true,
        (FormulaValue::Empty, FormulaValue::Number(n)) | (FormulaValue::Number(n), FormulaValue::Empty) => {
            n.is_zero()
        }
        (FormulaValue::Empty, FormulaValue::Text(s)) | (FormulaValue::Text(s), FormulaValue::Empty) => s.is_empty(),
        _ => false,
    }
}

fn fn_switch(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let expr = ctx.eval_arg(&args[0]);
    if let Some(e) = expr.error() {
        return FormulaValue::Error(e);
    }
    let remaining = args.len() - 1;
    let has_default = remaining % 2 == 1;
    let num_pairs = if has_default { (remaining - 1) / 2 } else { remaining / 2 };

    for pair in 0..num_pairs {
        let value_idx = 1 + pair * 2;
        let value = ctx.eval_arg(&args[value_idx]);
        if let Some(e) = value.error() {
            return FormulaValue::Error(e);
        }
        if values_match(&expr, &value) {
            return ctx.eval_arg(&args[value_idx + 1]);
        }
    }
    if has_default {
        ctx.eval_arg(args.last().unwrap())
    } else {
        FormulaValue::Error(CellError::Na)
    }
}

pub fn specs() -> Vec<FunctionSpec> {
    use ArgKind::Either;
    vec![
        FunctionSpec {
            short_circuits: true,
            ..super::spec("IF", ArgShape::fixed(&[Either, Either]).with_optional(&[Either]), fn_if)
        },
        super::spec("AND", ArgShape::fixed(&[Either]).variadic_tail(Either), fn_and),
        super::spec("OR", ArgShape::fixed(&[Either]).variadic_tail(Either), fn_or),
        super::spec("NOT", ArgShape::fixed(&[Either]), fn_not),
        FunctionSpec {
            short_circuits: true,
            ..super::spec("IFERROR", ArgShape::fixed(&[Either, Either]), fn_iferror)
        },
        FunctionSpec {
            short_circuits: true,
            ..super::spec("IFNA", ArgShape::fixed(&[Either, Either]), fn_ifna)
        },
        super::spec("TRUE", ArgShape::fixed(&[]), fn_true),
        super::spec("FALSE", ArgShape::fixed(&[]), fn_false),
        super::spec("XOR", ArgShape::fixed(&[Either]).variadic_tail(Either), fn_xor),
        FunctionSpec {
            short_circuits: true,
            ..super::spec("IFS", ArgShape::fixed(&[Either, Either]).variadic_tail(Either), fn_ifs)
        },
        FunctionSpec {
            short_circuits: true,
            ..super::spec(
                "SWITCH",
                ArgShape::fixed(&[Either, Either, Either]).variadic_tail(Either),
                fn_switch,
            )
        },
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

    #[test]
    fn test_if_takes_only_the_true_branch() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![
            Arg::Expr(TExpr::Bool(true)),
            Arg::Expr(TExpr::Number(Decimal::ONE)),
            Arg::Expr(TExpr::ErrorLit(CellError::Div0)),
        ];
        assert_eq!(fn_if(&args, &ctx), FormulaValue::Number(Decimal::ONE));
    }

    #[test]
    fn test_and_short_circuits_on_false() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::Bool(false)), Arg::Expr(TExpr::Bool(true))];
        assert_eq!(fn_and(&args, &ctx), FormulaValue::Bool(false));
    }

    #[test]
    fn test_ifna_only_catches_na() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::ErrorLit(CellError::Na)), Arg::Expr(TExpr::Text("fallback".into()))];
        assert_eq!(fn_ifna(&args, &ctx), FormulaValue::Text("fallback".into()));

        let args = vec![Arg::Expr(TExpr::ErrorLit(CellError::Div0)), Arg::Expr(TExpr::Text("fallback".into()))];
        assert_eq!(fn_ifna(&args, &ctx), FormulaValue::Error(CellError::Div0));
    }
}
