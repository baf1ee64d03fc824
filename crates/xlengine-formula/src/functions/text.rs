//! Text functions: case conversion, search/substitution, and the
//! B-suffixed byte-counting variants (aliased to their character-counting
//! counterparts — this engine has no DBCS locale where they'd diverge).

use rust_decimal::Decimal;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::CellError;

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if n >= len {
        return s.to_string();
    }
    s.chars().skip(len - n).collect()
}

fn take_mid(s: &str, start_1based: usize, n: usize) -> String {
    if start_1based == 0 {
        return String::new();
    }
    s.chars().skip(start_1based - 1).take(n).collect()
}

fn fn_len(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let v = super::eval(args, 0, ctx);
    if let Some(e) = v.error() {
        return FormulaValue::Error(e);
    }
    FormulaValue::Number(Decimal::from(v.to_text().chars().count() as u32))
}

fn fn_left(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = super::eval(args, 0, ctx);
    if let Some(e) = text.error() {
        return FormulaValue::Error(e);
    }
    let n = match super::opt_int(args, 1, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n < 0 {
        return FormulaValue::Error(CellError::Value);
    }
    FormulaValue::Text(take_left(&text.to_text(), n as usize))
}

fn fn_right(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = super::eval(args, 0, ctx);
    if let Some(e) = text.error() {
        return FormulaValue::Error(e);
    }
    let n = match super::opt_int(args, 1, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n < 0 {
        return FormulaValue::Error(CellError::Value);
    }
    FormulaValue::Text(take_right(&text.to_text(), n as usize))
}

fn fn_mid(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = super::eval(args, 0, ctx);
    if let Some(e) = text.error() {
        return FormulaValue::Error(e);
    }
    let start = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let count = match super::int_arg(args, 2, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if start < 1 || count < 0 {
        return FormulaValue::Error(CellError::Value);
    }
    FormulaValue::Text(take_mid(&text.to_text(), start as usize, count as usize))
}

fn fn_lower(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = super::eval(args, 0, ctx);
    if let Some(e) = text.error() {
        return FormulaValue::Error(e);
    }
    FormulaValue::Text(text.to_text().to_lowercase())
}

fn fn_upper(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = super::eval(args, 0, ctx);
    if let Some(e) = text.error() {
        return FormulaValue::Error(e);
    }
    FormulaValue::Text(text.to_text().to_uppercase())
}

fn fn_trim(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = super::eval(args, 0, ctx);
    if let Some(e) = text.error() {
        return FormulaValue::Error(e);
    }
    FormulaValue::Text(text.to_text().split_whitespace().collect::<Vec<_>>().join(" "))
}

fn fn_concat(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let mut out = String::new();
    for arg in args {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return FormulaValue::Error(e);
            }
            out.push_str(&v.to_text());
        }
    }
    FormulaValue::Text(out)
}

fn find_in(find_text: &str, within: &str, start_num: i64, case_insensitive: bool) -> FormulaValue {
    let within_len = within.chars().count() as i64;
    if start_num < 1 || start_num > within_len.max(1) {
        return FormulaValue::Error(CellError::Value);
    }
    let search_start = (start_num - 1) as usize;
    let search_str: String = within.chars().skip(search_start).collect();
    let (haystack, needle) = if case_insensitive {
        (search_str.to_lowercase(), find_text.to_lowercase())
    } else {
        (search_str.clone(), find_text.to_string())
    };
    match haystack.find(&needle) {
        Some(byte_pos) => {
            let char_pos = haystack[..byte_pos].chars().count();
            FormulaValue::Number(Decimal::from((search_start + char_pos + 1) as u32))
        }
        None => FormulaValue::Error(CellError::Value),
    }
}

fn fn_find(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let find_text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let within = match super::text(args, 1, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let start = match super::opt_int(args, 2, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    find_in(&find_text, &within, start, false)
}

fn fn_search(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let find_text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let within = match super::text(args, 1, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let start = match super::opt_int(args, 2, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    find_in(&find_text, &within, start, true)
}

fn fn_exact(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let a = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let b = match super::text(args, 1, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    FormulaValue::Bool(a == b)
}

fn fn_rept(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let times = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if times < 0 {
        return FormulaValue::Error(CellError::Value);
    }
    if text.chars().count().saturating_mul(times as usize) > 32_767 {
        return FormulaValue::Error(CellError::Value);
    }
    FormulaValue::Text(text.repeat(times as usize))
}

fn fn_substitute(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let old = match super::text(args, 1, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let new = match super::text(args, 2, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let instance = match args.get(3) {
        Some(_) => match super::int_arg(args, 3, ctx) {
            Ok(n) if n >= 1 => Some(n as usize),
            Ok(_) => return FormulaValue::Error(CellError::Value),
            Err(e) => return FormulaValue::Error(e),
        },
        None => None,
    };

    if old.is_empty() {
        return FormulaValue::Text(text);
    }

    match instance {
        None => FormulaValue::Text(text.replace(&old, &new)),
        Some(n) => {
            let mut result = String::new();
            let mut remaining = text.as_str();
            let mut occurrence = 0;
            while let Some(pos) = remaining.find(&old) {
                occurrence += 1;
                if occurrence == n {
                    result.push_str(&remaining[..pos]);
                    result.push_str(&new);
                    result.push_str(&remaining[pos + old.len()..]);
                    return FormulaValue::Text(result);
                }
                result.push_str(&remaining[..pos + old.len()]);
                remaining = &remaining[pos + old.len()..];
            }
            FormulaValue::Text(text)
        }
    }
}

fn fn_proper(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let mut result = String::with_capacity(text.len());
    let mut capitalize_next = true;
    for ch in text.chars() {
        if ch.is_whitespace() || !ch.is_alphanumeric() {
            result.push(ch);
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            result.extend(ch.to_lowercase());
        }
    }
    FormulaValue::Text(result)
}

fn fn_char(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let n = match super::int_arg(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    if n <= 0 {
        return FormulaValue::Error(CellError::Value);
    }
    match char::from_u32(n as u32) {
        Some(c) => FormulaValue::Text(c.to_string()),
        None => FormulaValue::Error(CellError::Value),
    }
}

fn fn_code(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    match text.chars().next() {
        Some(c) => FormulaValue::Number(Decimal::from(c as u32)),
        None => FormulaValue::Error(CellError::Value),
    }
}

fn fn_clean(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    FormulaValue::Text(text.chars().filter(|c| *c as u32 >= 32).collect())
}

fn fn_value(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let v = super::eval(args, 0, ctx);
    if let Some(e) = v.error() {
        return FormulaValue::Error(e);
    }
    if let FormulaValue::Number(n) = v {
        return FormulaValue::Number(n);
    }
    match v.to_number() {
        Ok(n) => FormulaValue::Number(n),
        Err(_) => FormulaValue::Error(CellError::Value),
    }
}

fn fn_t(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match super::eval(args, 0, ctx) {
        FormulaValue::Text(s) => FormulaValue::Text(s),
        FormulaValue::Error(e) => FormulaValue::Error(e),
        _ => FormulaValue::Text(String::new()),
    }
}

fn fn_replace(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let old_text = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let start = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let count = match super::int_arg(args, 2, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let new_text = match super::text(args, 3, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    if start < 1 || count < 0 {
        return FormulaValue::Error(CellError::Value);
    }

    let chars: Vec<char> = old_text.chars().collect();
    let start_idx = (start as usize - 1).min(chars.len());
    let end_idx = start_idx.saturating_add(count as usize).min(chars.len());
    let mut result: String = chars[..start_idx].iter().collect();
    result.push_str(&new_text);
    result.extend(&chars[end_idx..]);
    FormulaValue::Text(result)
}

fn fn_textjoin(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let delimiter = match super::text(args, 0, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    let ignore_empty = match super::eval(args, 1, ctx).to_bool() {
        Ok(b) => b,
        Err(e) => return FormulaValue::Error(e),
    };

    let mut pieces = Vec::new();
    for arg in &args[2..] {
        for v in super::flatten(ctx.eval_arg(arg)) {
            if let Some(e) = v.error() {
                return FormulaValue::Error(e);
            }
            let s = v.to_text();
            if ignore_empty && s.is_empty() {
                continue;
            }
            pieces.push(s);
        }
    }
    FormulaValue::Text(pieces.join(&delimiter))
}

/// Number of `0`/`#` digit placeholders after the format's decimal point.
fn format_decimal_places(fmt: &str) -> u32 {
    match fmt.find('.') {
        Some(pos) => fmt[pos + 1..].chars().take_while(|c| *c == '0' || *c == '#').count() as u32,
        None => 0,
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Renders a small, common subset of Excel number-format codes: fixed
/// decimal places, thousands grouping, and a trailing `%`. Anything more
/// exotic (custom date/time tokens, conditional sections) falls back to
/// the value's plain text form.
fn format_number(n: Decimal, fmt: &str) -> String {
    let percent = fmt.trim_end().ends_with('%');
    let scaled = if percent { n * Decimal::from(100) } else { n };
    let places = format_decimal_places(fmt);
    let rounded = super::round_half_away(scaled, places as i32).round_dp(places);

    let negative = rounded.is_sign_negative();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (text, String::new()),
    };
    let int_part = if fmt.contains(',') { group_thousands(&int_part) } else { int_part };

    let mut result = String::new();
    if negative {
        result.push('-');
    }
    result.push_str(&int_part);
    if places > 0 {
        result.push('.');
        result.push_str(&frac_part);
    }
    if percent {
        result.push('%');
    }
    result
}

fn fn_text(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let value = super::eval(args, 0, ctx);
    if let Some(e) = value.error() {
        return FormulaValue::Error(e);
    }
    let fmt = match super::text(args, 1, ctx) {
        Ok(s) => s,
        Err(e) => return FormulaValue::Error(e),
    };
    match value {
        FormulaValue::Number(n) => FormulaValue::Text(format_number(n, &fmt)),
        other => FormulaValue::Text(other.to_text()),
    }
}

fn fn_n(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match super::eval(args, 0, ctx) {
        FormulaValue::Number(n) => FormulaValue::Number(n),
        FormulaValue::Bool(b) => FormulaValue::Number(Decimal::from(b as u8)),
        FormulaValue::Error(e) => FormulaValue::Error(e),
        _ => FormulaValue::Number(Decimal::ZERO),
    }
}

pub fn specs() -> Vec<FunctionSpec> {
    use ArgKind::Expr;
    vec![
        super::spec("LEN", ArgShape::fixed(&[Expr]), fn_len),
        super::spec("LENB", ArgShape::fixed(&[Expr]), fn_len),
        super::spec("LEFT", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_left),
        super::spec("LEFTB", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_left),
        super::spec("RIGHT", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_right),
        super::spec("RIGHTB", ArgShape::fixed(&[Expr]).with_optional(&[Expr]), fn_right),
        super::spec("MID", ArgShape::exprs(3), fn_mid),
        super::spec("MIDB", ArgShape::exprs(3), fn_mid),
        super::spec("LOWER", ArgShape::fixed(&[Expr]), fn_lower),
        super::spec("UPPER", ArgShape::fixed(&[Expr]), fn_upper),
        super::spec("TRIM", ArgShape::fixed(&[Expr]), fn_trim),
        super::spec("CONCAT", ArgShape::fixed(&[Expr]).variadic_tail(Expr), fn_concat),
        super::spec("CONCATENATE", ArgShape::fixed(&[Expr]).variadic_tail(Expr), fn_concat),
        super::spec("FIND", ArgShape::fixed(&[Expr, Expr]).with_optional(&[Expr]), fn_find),
        super::spec("FINDB", ArgShape::fixed(&[Expr, Expr]).with_optional(&[Expr]), fn_find),
        super::spec("SEARCH", ArgShape::fixed(&[Expr, Expr]).with_optional(&[Expr]), fn_search),
        super::spec("SEARCHB", ArgShape::fixed(&[Expr, Expr]).with_optional(&[Expr]), fn_search),
        super::spec("EXACT", ArgShape::exprs(2), fn_exact),
        super::spec("REPT", ArgShape::exprs(2), fn_rept),
        super::spec(
            "SUBSTITUTE",
            ArgShape::fixed(&[Expr, Expr, Expr]).with_optional(&[Expr]),
            fn_substitute,
        ),
        super::spec("PROPER", ArgShape::fixed(&[Expr]), fn_proper),
        super::spec("CHAR", ArgShape::fixed(&[Expr]), fn_char),
        super::spec("CODE", ArgShape::fixed(&[Expr]), fn_code),
        super::spec("CLEAN", ArgShape::fixed(&[Expr]), fn_clean),
        super::spec("VALUE", ArgShape::fixed(&[Expr]), fn_value),
        super::spec("T", ArgShape::fixed(&[Expr]), fn_t),
        super::spec("N", ArgShape::fixed(&[Expr]), fn_n),
        super::spec("REPLACE", ArgShape::exprs(4), fn_replace),
        super::spec("REPLACEB", ArgShape::exprs(4), fn_replace),
        super::spec(
            "TEXTJOIN",
            ArgShape::fixed(&[Expr, Expr, ArgKind::Either]).variadic_tail(ArgKind::Either),
            fn_textjoin,
        ),
        super::spec("TEXT", ArgShape::exprs(2), fn_text),
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

    fn text(s: &str) -> Arg {
        Arg::Expr(TExpr::Text(s.to_string()))
    }
    fn num(n: i64) -> Arg {
        Arg::Expr(TExpr::Number(Decimal::from(n)))
    }

    #[test]
    fn test_mid_extracts_substring() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [text("spreadsheet"), num(3), num(5)];
        assert_eq!(fn_mid(&args, &ctx), FormulaValue::Text("readsh".chars().take(5).collect()));
    }

    #[test]
    fn test_substitute_nth_instance() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [text("a-b-c-b"), text("b"), text("X"), num(2)];
        assert_eq!(fn_substitute(&args, &ctx), FormulaValue::Text("a-b-c-X".to_string()));
    }

    #[test]
    fn test_proper_capitalizes_each_word() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [text("the total cost")];
        assert_eq!(fn_proper(&args, &ctx), FormulaValue::Text("The Total Cost".to_string()));
    }

    #[test]
    fn test_find_is_case_sensitive_search_is_not() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [text("A"), text("banana")];
        assert_eq!(fn_find(&args, &ctx), FormulaValue::Error(CellError::Value));
        assert_eq!(fn_search(&args, &ctx), FormulaValue::Number(Decimal::from(2)));
    }

    #[test]
    fn test_replace_substitutes_a_character_span() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [text("spreadsheet"), num(1), num(6), text("ice")];
        assert_eq!(fn_replace(&args, &ctx), FormulaValue::Text("icesheet".to_string()));
    }

    #[test]
    fn test_textjoin_skips_empty_when_requested() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [
            text("-"),
            Arg::Expr(TExpr::Bool(true)),
            text("a"),
            text(""),
            text("b"),
        ];
        assert_eq!(fn_textjoin(&args, &ctx), FormulaValue::Text("a-b".to_string()));
    }

    #[test]
    fn test_text_formats_number_with_thousands_and_percent() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let args = [num(1234), text("#,##0.00")];
        assert_eq!(fn_text(&args, &ctx), FormulaValue::Text("1,234.00".to_string()));

        let args = [Arg::Expr(TExpr::Number(Decimal::new(25, 2))), text("0%")];
        assert_eq!(fn_text(&args, &ctx), FormulaValue::Text("25%".to_string()));
    }
}
