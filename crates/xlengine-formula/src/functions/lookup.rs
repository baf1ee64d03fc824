//! Lookup and reference functions: INDEX/MATCH/VLOOKUP and the array-shape
//! helpers ROWS/COLUMNS/ROW/COLUMN/SEQUENCE/CHOOSE.

use rust_decimal::Decimal;

use crate::ast::{Arg, RangeLocation};
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::{CellAddress, CellError, CellRange, MAX_COLS, MAX_ROWS};

const MAX_CELLS: i64 = 1_000_000;

fn values_equal(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a, b) {
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        (FormulaValue::Bool(x), FormulaValue::Bool(y)) => x == y,
        (FormulaValue::Text(x), FormulaValue::Text(y)) => x.eq_ignore_ascii_case(y),
        (FormulaValue::Number(n), FormulaValue::Bool(b)) | (FormulaValue::Bool(b), FormulaValue::Number(n)) => {
            Decimal::from(*b as u8) == *n
        }
        (FormulaValue::Text(s), FormulaValue::Number(n)) | (FormulaValue::Number(n), FormulaValue::Text(s)) => {
            std::str::FromStr::from_str(s.trim()).map(|x: Decimal| x == *n).unwrap_or(false)
        }
        (FormulaValue::Empty, FormulaValue::Empty) => true,
        (FormulaValue::Empty, FormulaValue::Text(s)) | (FormulaValue::Text(s), FormulaValue::Empty) => s.is_empty(),
        (FormulaValue::Empty, FormulaValue::Number(n)) | (FormulaValue::Number(n), FormulaValue::Empty) => {
            n.is_zero()
        }
        _ => false,
    }
}

fn array_dims(value: &FormulaValue) -> (usize, usize) {
    match value {
        FormulaValue::Array(rows) => {
            let cols = rows.first().map(|r| r.len()).unwrap_or(0);
            (rows.len(), cols)
        }
        _ => (1, 1),
    }
}

fn fn_index(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let array = super::eval(args, 0, ctx);
    if let Some(e) = array.error() {
        return FormulaValue::Error(e);
    }
    let (rows, cols) = array_dims(&array);
    let row_num = match super::opt_int(args, 1, ctx, if rows == 1 { 1 } else { 0 }) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let col_num = match super::opt_int(args, 2, ctx, if cols == 1 { 1 } else { 0 }) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };

    match &array {
        FormulaValue::Array(data) => {
            if row_num < 1 || col_num < 1 || row_num as usize > rows || col_num as usize > cols {
                return FormulaValue::Error(CellError::Ref);
            }
            data[row_num as usize - 1][col_num as usize - 1].clone()
        }
        other => {
            if row_num == 1 && col_num == 1 {
                other.clone()
            } else {
                FormulaValue::Error(CellError::Ref)
            }
        }
    }
}

fn fn_match(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let lookup_value = super::eval(args, 0, ctx);
    if let Some(e) = lookup_value.error() {
        return FormulaValue::Error(e);
    }
    let array = super::eval(args, 1, ctx);
    if let Some(e) = array.error() {
        return FormulaValue::Error(e);
    }
    let match_type = match super::opt_int(args, 2, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if match_type != 0 {
        return FormulaValue::Error(CellError::Na);
    }

    let values: Vec<FormulaValue> = match &array {
        FormulaValue::Array(rows) => {
            let is_single_row = rows.len() == 1;
            let is_single_col = rows.iter().all(|r| r.len() <= 1);
            if !is_single_row && !is_single_col {
                return FormulaValue::Error(CellError::Na);
            }
            rows.iter().flat_map(|r| r.iter().cloned()).collect()
        }
        other => vec![other.clone()],
    };

    for (i, v) in values.iter().enumerate() {
        if values_equal(&lookup_value, v) {
            return FormulaValue::Number(Decimal::from((i + 1) as u32));
        }
    }
    FormulaValue::Error(CellError::Na)
}

fn fn_vlookup(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let lookup_value = super::eval(args, 0, ctx);
    if let Some(e) = lookup_value.error() {
        return FormulaValue::Error(e);
    }
    let table = super::eval(args, 1, ctx);
    if let Some(e) = table.error() {
        return FormulaValue::Error(e);
    }
    let col_index = match super::int_arg(args, 2, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let _range_lookup = super::opt_int(args, 3, ctx, 1);

    let (rows, cols) = array_dims(&table);
    if col_index < 1 || col_index as usize > cols {
        return FormulaValue::Error(CellError::Ref);
    }
    let data = match &table {
        FormulaValue::Array(rows) => rows.clone(),
        other => vec![vec![other.clone()]],
    };
    for r in 0..rows {
        if values_equal(&lookup_value, &data[r][0]) {
            return data[r][col_index as usize - 1].clone();
        }
    }
    FormulaValue::Error(CellError::Na)
}

fn fn_hlookup(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let lookup_value = super::eval(args, 0, ctx);
    if let Some(e) = lookup_value.error() {
        return FormulaValue::Error(e);
    }
    let table = super::eval(args, 1, ctx);
    if let Some(e) = table.error() {
        return FormulaValue::Error(e);
    }
    let row_index = match super::int_arg(args, 2, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let _range_lookup = super::opt_int(args, 3, ctx, 1);

    let (rows, cols) = array_dims(&table);
    if row_index < 1 || row_index as usize > rows {
        return FormulaValue::Error(CellError::Ref);
    }
    let data = match &table {
        FormulaValue::Array(rows) => rows.clone(),
        other => vec![vec![other.clone()]],
    };
    for c in 0..cols {
        if values_equal(&lookup_value, &data[0][c]) {
            return data[row_index as usize - 1][c].clone();
        }
    }
    FormulaValue::Error(CellError::Na)
}

/// OFFSET's base reference must stay unresolved (`ArgKind::Range`) so the
/// shift below can move its anchor rather than the value it currently
/// holds; a negative resulting row or column, or a non-positive height or
/// width, is reported as `#REF!` rather than panicking on the
/// would-be-negative index.
fn fn_offset(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let base = match args.first() {
        Some(Arg::Range(loc)) => loc,
        _ => return FormulaValue::Error(CellError::Ref),
    };
    let base_range = base.range();
    let row_delta = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let col_delta = match super::int_arg(args, 2, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let height = match super::opt_int(args, 3, ctx, base_range.row_count() as i64) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let width = match super::opt_int(args, 4, ctx, base_range.col_count() as i64) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if height < 1 || width < 1 {
        return FormulaValue::Error(CellError::Ref);
    }

    let start_row = base_range.start.row as i64 + row_delta;
    let start_col = base_range.start.col as i64 + col_delta;
    if start_row < 0 || start_col < 0 {
        return FormulaValue::Error(CellError::Ref);
    }
    let end_row = start_row + height - 1;
    let end_col = start_col + width - 1;
    if end_row >= MAX_ROWS as i64 || end_col >= MAX_COLS as i64 {
        return FormulaValue::Error(CellError::Ref);
    }

    let range = CellRange::from_indices(start_row as u32, start_col as u16, end_row as u32, end_col as u16);
    let loc = match base.sheet() {
        Some(sheet) => RangeLocation::CrossSheet(sheet.to_string(), range),
        None => RangeLocation::Local(range),
    };
    ctx.eval_arg(&Arg::Range(loc))
}

/// Splits `sheet_text!A1` style reference text on the last `!`, stripping a
/// pair of surrounding single quotes from the sheet part if present.
fn split_sheet_prefix(text: &str) -> (Option<&str>, &str) {
    match text.rfind('!') {
        Some(pos) => {
            let sheet = text[..pos].trim();
            let sheet = sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')).unwrap_or(sheet);
            (Some(sheet), &text[pos + 1..])
        }
        None => (None, text),
    }
}

fn fn_indirect(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let (sheet, reference) = split_sheet_prefix(text.trim());

    if reference.contains(':') {
        let range = match CellRange::parse(reference) {
            Ok(r) => r,
            Err(_) => return FormulaValue::Error(CellError::Ref),
        };
        let loc = match sheet {
            Some(name) => RangeLocation::CrossSheet(name.to_string(), range),
            None => RangeLocation::Local(range),
        };
        ctx.eval_arg(&Arg::Range(loc))
    } else {
        let address = match CellAddress::parse(reference) {
            Ok(a) => a,
            Err(_) => return FormulaValue::Error(CellError::Ref),
        };
        FormulaValue::from(ctx.env.cell_value(sheet, address.row, address.col))
    }
}

fn fn_address(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let row_num = match super::int_arg(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let col_num = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let abs_num = match super::opt_int(args, 2, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let sheet_text = match super::opt_text(args, 4, ctx, "") {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };

    if row_num < 1 || row_num > MAX_ROWS as i64 || col_num < 1 || col_num > MAX_COLS as i64 {
        return FormulaValue::Error(CellError::Value);
    }
    let (row_absolute, col_absolute) = match abs_num {
        1 => (true, true),
        2 => (true, false),
        3 => (false, true),
        4 => (false, false),
        _ => return FormulaValue::Error(CellError::Value),
    };

    let address =
        CellAddress::with_absolute(row_num as u32 - 1, col_num as u16 - 1, row_absolute, col_absolute);
    let cell = address.to_a1_string();
    let result = if sheet_text.is_empty() {
        cell
    } else if sheet_text.contains(' ') {
        format!("'{}'!{}", sheet_text.replace('\'', "''"), cell)
    } else {
        format!("{sheet_text}!{cell}")
    };
    FormulaValue::Text(result)
}

fn fn_rows(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let v = super::eval(args, 0, ctx);
    if let Some(e) = v.error() {
        return FormulaValue::Error(e);
    }
    FormulaValue::Number(Decimal::from(array_dims(&v).0 as u32))
}

fn fn_columns(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let v = super::eval(args, 0, ctx);
    if let Some(e) = v.error() {
        return FormulaValue::Error(e);
    }
    FormulaValue::Number(Decimal::from(array_dims(&v).1 as u32))
}

fn fn_choose(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let index = match super::int_arg(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if index < 1 || index as usize >= args.len() {
        return FormulaValue::Error(CellError::Value);
    }
    super::eval(args, index as usize, ctx)
}

fn fn_row(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    if let Some(Arg::Range(loc)) = args.first() {
        let range = loc.range();
        let rows = range.row_count();
        if rows <= 1 {
            return FormulaValue::Number(Decimal::from(range.start.row + 1));
        }
        let data = (0..rows)
            .map(|i| vec![FormulaValue::Number(Decimal::from(range.start.row + i + 1))])
            .collect();
        return FormulaValue::Array(data);
    }
    FormulaValue::Number(Decimal::from(ctx.env.current_row() + 1))
}

fn fn_column(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    if let Some(Arg::Range(loc)) = args.first() {
        let range = loc.range();
        let cols = range.col_count();
        if cols <= 1 {
            return FormulaValue::Number(Decimal::from(range.start.col as u32 + 1));
        }
        let row: Vec<FormulaValue> =
            (0..cols).map(|i| FormulaValue::Number(Decimal::from(range.start.col as u32 + i as u32 + 1))).collect();
        return FormulaValue::Array(vec![row]);
    }
    FormulaValue::Number(Decimal::from(ctx.env.current_col() as u32 + 1))
}

fn fn_sequence(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let rows = match super::int_arg(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let cols = match super::opt_int(args, 1, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let start = match super::opt_num(args, 2, ctx, Decimal::ONE) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let step = match super::opt_num(args, 3, ctx, Decimal::ONE) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if rows < 1 || cols < 1 {
        return FormulaValue::Error(CellError::Value);
    }
    if rows * cols > MAX_CELLS {
        return FormulaValue::Error(CellError::Value);
    }

    let mut data = Vec::with_capacity(rows as usize);
    let mut current = start;
    for _ in 0..rows {
        let mut row = Vec::with_capacity(cols as usize);
        for _ in 0..cols {
            row.push(FormulaValue::Number(current));
            current += step;
        }
        data.push(row);
    }
    FormulaValue::Array(data)
}

pub fn specs() -> Vec<FunctionSpec> {
    use ArgKind::{Either, Expr, Range};
    vec![
        super::spec("INDEX", ArgShape::fixed(&[Either, Expr]).with_optional(&[Expr]), fn_index),
        super::spec("MATCH", ArgShape::fixed(&[Expr, Either]).with_optional(&[Expr]), fn_match),
        super::spec("VLOOKUP", ArgShape::fixed(&[Expr, Either, Expr]).with_optional(&[Expr]), fn_vlookup),
        super::spec("HLOOKUP", ArgShape::fixed(&[Expr, Either, Expr]).with_optional(&[Expr]), fn_hlookup),
        super::spec(
            "OFFSET",
            ArgShape::fixed(&[Range, Expr, Expr]).with_optional(&[Expr, Expr]),
            fn_offset,
        ),
        super::spec("INDIRECT", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_indirect),
        super::spec(
            "ADDRESS",
            ArgShape::fixed(&[Expr, Expr]).with_optional(&[Expr, Expr, Expr]),
            fn_address,
        ),
        super::spec("ROWS", ArgShape::fixed(&[Either]), fn_rows),
        super::spec("COLUMNS", ArgShape::fixed(&[Either]), fn_columns),
        super::spec("CHOOSE", ArgShape::fixed(&[Expr, Either]).variadic_tail(Either), fn_choose),
        super::spec("ROW", ArgShape::fixed(&[]).with_optional(&[Either]), fn_row),
        super::spec("COLUMN", ArgShape::fixed(&[]).with_optional(&[Either]), fn_column),
        super::spec(
            "SEQUENCE",
            ArgShape::fixed(&[Expr]).with_optional(&[Expr, Expr, Expr]),
            fn_sequence,
        ),
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
        fn cell_value(&self, _sheet: Option<&str>, row: u32, col: u16) -> CellValue {
            CellValue::Number(Decimal::from(row as i64 * 10 + col as i64))
        }
        fn current_sheet(&self) -> &str { "Sheet1" }
        fn current_row(&self) -> u32 { 4 }
        fn current_col(&self) -> u16 { 2 }
        fn sheet_index(&self, _name: &str) -> Option<usize> { Some(0) }
        fn used_range(&self, _sheet: Option<&str>) -> Option<xlengine_core::CellRange> { None }
        fn resolve_name(&self, _name: &str) -> Option<String> { None }
    }

    fn range_arg(a1: &str) -> Arg {
        Arg::Range(RangeLocation::Local(CellRange::parse(a1).unwrap()))
    }

    fn num(n: i64) -> Arg {
        Arg::Expr(TExpr::Number(Decimal::from(n)))
    }
    fn array(rows: Vec<Vec<i64>>) -> FormulaValue {
        FormulaValue::Array(
            rows.into_iter().map(|r| r.into_iter().map(|n| FormulaValue::Number(Decimal::from(n))).collect()).collect(),
        )
    }

    #[test]
    fn test_index_picks_row_and_col() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        // Can't directly inject an Array as an Arg without a Range arg, so exercise
        // fn_index via a literal array built through eval() isn't possible here;
        // test array_dims + the scalar passthrough path instead.
        let args = [num(7), num(1), num(1)];
        assert_eq!(fn_index(&args, &ctx), FormulaValue::Number(Decimal::from(7)));
    }

    #[test]
    fn test_choose_selects_1_based_index() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(2), num(10), num(20), num(30)];
        assert_eq!(fn_choose(&args, &ctx), FormulaValue::Number(Decimal::from(20)));
    }

    #[test]
    fn test_row_and_column_fall_back_to_current_cell() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        assert_eq!(fn_row(&[], &ctx), FormulaValue::Number(Decimal::from(5)));
        assert_eq!(fn_column(&[], &ctx), FormulaValue::Number(Decimal::from(3)));
    }

    #[test]
    fn test_sequence_fills_row_major() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(2), num(2), num(1), num(1)];
        assert_eq!(fn_sequence(&args, &ctx), array(vec![vec![1, 2], vec![3, 4]]));
    }

    fn literal_array(rows: Vec<Vec<i64>>) -> Arg {
        Arg::Expr(TExpr::Array(
            rows.into_iter()
                .map(|r| r.into_iter().map(|n| TExpr::Number(Decimal::from(n))).collect())
                .collect(),
        ))
    }

    #[test]
    fn test_hlookup_searches_first_row() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let table = literal_array(vec![vec![10, 20, 30], vec![1, 2, 3]]);
        let args = [num(20), table, num(2)];
        assert_eq!(fn_hlookup(&args, &ctx), FormulaValue::Number(Decimal::from(2)));
    }

    #[test]
    fn test_hlookup_no_match_is_na_error() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let table = literal_array(vec![vec![10, 20, 30], vec![1, 2, 3]]);
        let args = [num(99), table, num(2)];
        assert_eq!(fn_hlookup(&args, &ctx), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_offset_shifts_the_base_range() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [range_arg("B2"), num(1), num(1)];
        // Base B2 (row 1, col 1) shifted by (1,1) lands on C3 (row 2, col 2);
        // FakeEnv::cell_value returns row*10+col, so 2*10+2 = 22.
        assert_eq!(fn_offset(&args, &ctx), FormulaValue::Number(Decimal::from(22)));
    }

    #[test]
    fn test_offset_negative_address_is_ref_error() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [range_arg("A1"), num(-1), num(0)];
        assert_eq!(fn_offset(&args, &ctx), FormulaValue::Error(CellError::Ref));
    }

    #[test]
    fn test_indirect_resolves_a1_text() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [Arg::Expr(TExpr::Text("B3".to_string()))];
        assert_eq!(fn_indirect(&args, &ctx), FormulaValue::Number(Decimal::from(21)));
    }

    #[test]
    fn test_indirect_invalid_text_is_ref_error() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [Arg::Expr(TExpr::Text("not a ref".to_string()))];
        assert_eq!(fn_indirect(&args, &ctx), FormulaValue::Error(CellError::Ref));
    }

    #[test]
    fn test_address_builds_a1_string() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(2), num(3)];
        assert_eq!(fn_address(&args, &ctx), FormulaValue::Text("$C$2".to_string()));
    }

    #[test]
    fn test_address_relative_with_sheet_text() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [
            num(2),
            num(3),
            num(4),
            num(1),
            Arg::Expr(TExpr::Text("My Sheet".to_string())),
        ];
        assert_eq!(fn_address(&args, &ctx), FormulaValue::Text("'My Sheet'!C2".to_string()));
    }
}
