//! Information functions: type predicates over a single value.

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgShape, FunctionSpec};
use xlengine_core::CellError;

fn fn_isblank(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(matches!(super::eval(args, 0, ctx), FormulaValue::Empty))
}

fn fn_isnumber(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(matches!(super::eval(args, 0, ctx), FormulaValue::Number(_)))
}

fn fn_istext(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(matches!(super::eval(args, 0, ctx), FormulaValue::Text(_)))
}

fn fn_iserror(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(super::eval(args, 0, ctx).is_error())
}

fn fn_isna(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(matches!(super::eval(args, 0, ctx), FormulaValue::Error(CellError::Na)))
}

/// Any error except `#N/A` — ISERROR catches that one too, ISERR doesn't.
fn fn_iserr(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let v = super::eval(args, 0, ctx);
    FormulaValue::Bool(v.is_error() && !matches!(v, FormulaValue::Error(CellError::Na)))
}

fn fn_islogical(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(matches!(super::eval(args, 0, ctx), FormulaValue::Bool(_)))
}

fn fn_isnontext(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Bool(!matches!(super::eval(args, 0, ctx), FormulaValue::Text(_)))
}

fn fn_na(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Error(CellError::Na)
}

pub fn specs() -> Vec<FunctionSpec> {
    vec![
        super::spec("ISBLANK", ArgShape::exprs(1), fn_isblank),
        super::spec("ISNUMBER", ArgShape::exprs(1), fn_isnumber),
        super::spec("ISTEXT", ArgShape::exprs(1), fn_istext),
        super::spec("ISERROR", ArgShape::exprs(1), fn_iserror),
        super::spec("ISERR", ArgShape::exprs(1), fn_iserr),
        super::spec("ISNA", ArgShape::exprs(1), fn_isna),
        super::spec("ISLOGICAL", ArgShape::exprs(1), fn_islogical),
        super::spec("ISNONTEXT", ArgShape::exprs(1), fn_isnontext),
        super::spec("NA", ArgShape::fixed(&[]), fn_na),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TExpr;
    use crate::evaluator::EvalOptions;
    use rust_decimal::Decimal;
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
    fn test_isnumber_true_on_number() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::Number(Decimal::ZERO))];
        assert_eq!(fn_isnumber(&args, &ctx), FormulaValue::Bool(true));
    }

    #[test]
    fn test_isna_only_catches_na() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::ErrorLit(CellError::Na))];
        assert_eq!(fn_isna(&args, &ctx), FormulaValue::Bool(true));
        let args = vec![Arg::Expr(TExpr::ErrorLit(CellError::Div0))];
        assert_eq!(fn_isna(&args, &ctx), FormulaValue::Bool(false));
    }

    #[test]
    fn test_iserr_excludes_na() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::ErrorLit(CellError::Div0))];
        assert_eq!(fn_iserr(&args, &ctx), FormulaValue::Bool(true));
        let args = vec![Arg::Expr(TExpr::ErrorLit(CellError::Na))];
        assert_eq!(fn_iserr(&args, &ctx), FormulaValue::Bool(false));
    }

    #[test]
    fn test_islogical_true_only_on_bool() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::Bool(true))];
        assert_eq!(fn_islogical(&args, &ctx), FormulaValue::Bool(true));
        let args = vec![Arg::Expr(TExpr::Number(Decimal::ONE))];
        assert_eq!(fn_islogical(&args, &ctx), FormulaValue::Bool(false));
    }

    #[test]
    fn test_isnontext_true_for_numbers_and_false_for_text() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = vec![Arg::Expr(TExpr::Number(Decimal::ONE))];
        assert_eq!(fn_isnontext(&args, &ctx), FormulaValue::Bool(true));
        let args = vec![Arg::Expr(TExpr::Text("hi".to_string()))];
        assert_eq!(fn_isnontext(&args, &ctx), FormulaValue::Bool(false));
    }
}
