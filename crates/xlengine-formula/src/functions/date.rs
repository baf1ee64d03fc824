//! Date/time functions. DATE builds an Excel serial number from y/m/d;
//! YEAR/MONTH/DAY decode one back; NOW/TODAY are volatile.
//!
//! The 1900 leap-year bug is absorbed by `xlengine_core`'s choice of epoch
//! (1899-12-30, see `cell::codec`), so these functions just build and
//! deconstruct `chrono` dates and hand off to `serial_to_datetime`/
//! `datetime_to_serial` rather than reimplementing the bug's arithmetic.
//! There is no 1904 date system here — the codec has only the one epoch.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike, Weekday};
use rust_decimal::Decimal;

use crate::ast::Arg;
use crate::evaluator::{EvalCtx, FormulaValue};
use crate::function_spec::{ArgKind, ArgShape, FunctionSpec};
use xlengine_core::{datetime_to_serial, serial_to_datetime, CellError};

fn fn_date(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let mut year = match super::int_arg(args, 0, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let month = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let day = match super::int_arg(args, 2, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };

    // Excel's 2-digit-year convention: 0-1899 means 1900-3799.
    if (0..1900).contains(&year) {
        year += 1900;
    }
    if !(0..=9999).contains(&year) {
        return FormulaValue::Error(CellError::Num);
    }

    let total_months = year * 12 + (month - 1);
    let norm_year = total_months.div_euclid(12) as i32;
    let norm_month = (total_months.rem_euclid(12) + 1) as u32;

    let Some(first) = NaiveDate::from_ymd_opt(norm_year, norm_month, 1) else {
        return FormulaValue::Error(CellError::Num);
    };
    let Some(date) = first.checked_add_signed(chrono::Duration::days(day - 1)) else {
        return FormulaValue::Error(CellError::Num);
    };
    let Some(dt) = date.and_hms_opt(0, 0, 0) else {
        return FormulaValue::Error(CellError::Num);
    };
    FormulaValue::Number(datetime_to_serial(dt))
}

fn decode(args: &[Arg], ctx: &EvalCtx) -> Result<NaiveDate, CellError> {
    let n = super::num(args, 0, ctx)?;
    serial_to_datetime(n).map(|dt| dt.date()).ok_or(CellError::Num)
}

fn decode_datetime(args: &[Arg], index: usize, ctx: &EvalCtx) -> Result<NaiveDateTime, CellError> {
    let n = super::num(args, index, ctx)?;
    serial_to_datetime(n).ok_or(CellError::Num)
}

fn fn_year(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match decode(args, ctx) {
        Ok(d) => FormulaValue::Number(Decimal::from(d.year())),
        Err(e) => FormulaValue::Error(e),
    }
}

fn fn_month(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match decode(args, ctx) {
        Ok(d) => FormulaValue::Number(Decimal::from(d.month())),
        Err(e) => FormulaValue::Error(e),
    }
}

fn fn_day(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match decode(args, ctx) {
        Ok(d) => FormulaValue::Number(Decimal::from(d.day())),
        Err(e) => FormulaValue::Error(e),
    }
}

fn fn_hour(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match decode_datetime(args, 0, ctx) {
        Ok(dt) => FormulaValue::Number(Decimal::from(dt.hour())),
        Err(e) => FormulaValue::Error(e),
    }
}

fn fn_minute(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match decode_datetime(args, 0, ctx) {
        Ok(dt) => FormulaValue::Number(Decimal::from(dt.minute())),
        Err(e) => FormulaValue::Error(e),
    }
}

fn fn_second(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    match decode_datetime(args, 0, ctx) {
        Ok(dt) => FormulaValue::Number(Decimal::from(dt.second())),
        Err(e) => FormulaValue::Error(e),
    }
}

/// Excel's default `return_type` (1): Sunday = 1 .. Saturday = 7.
fn fn_weekday(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let d = match decode(args, ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let return_type = match super::opt_int(args, 1, ctx, 1) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let mon0 = d.weekday().num_days_from_monday() as i64; // Monday = 0 .. Sunday = 6
    let number = match return_type {
        1 => (mon0 + 1) % 7 + 1,      // Sunday=1 .. Saturday=7
        2 => mon0 + 1,                // Monday=1 .. Sunday=7
        3 => mon0,                    // Monday=0 .. Sunday=6
        _ => return FormulaValue::Error(CellError::Num),
    };
    FormulaValue::Number(Decimal::from(number))
}

/// Shifts a date by a whole number of calendar months, clamping the day
/// to the shorter month's length the way Excel's EDATE/EOMONTH do.
fn add_months(d: NaiveDate, months: i64) -> Option<NaiveDate> {
    let total_months = d.year() as i64 * 12 + (d.month() as i64 - 1) + months;
    let year = total_months.div_euclid(12) as i32;
    let month = (total_months.rem_euclid(12) + 1) as u32;
    let days_in_month = NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(chrono::Months::new(1))?
        .signed_duration_since(NaiveDate::from_ymd_opt(year, month, 1)?)
        .num_days();
    NaiveDate::from_ymd_opt(year, month, d.day().min(days_in_month as u32))
}

fn fn_edate(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let d = match decode(args, ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let months = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let Some(shifted) = add_months(d, months) else {
        return FormulaValue::Error(CellError::Num);
    };
    let Some(dt) = shifted.and_hms_opt(0, 0, 0) else {
        return FormulaValue::Error(CellError::Num);
    };
    FormulaValue::Number(datetime_to_serial(dt))
}

fn fn_eomonth(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let d = match decode(args, ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let months = match super::int_arg(args, 1, ctx) {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };
    let Some(target) = add_months(d, months + 1) else {
        return FormulaValue::Error(CellError::Num);
    };
    let Some(first_of_target) = NaiveDate::from_ymd_opt(target.year(), target.month(), 1) else {
        return FormulaValue::Error(CellError::Num);
    };
    let Some(last_day) = first_of_target.pred_opt() else {
        return FormulaValue::Error(CellError::Num);
    };
    let Some(dt) = last_day.and_hms_opt(0, 0, 0) else {
        return FormulaValue::Error(CellError::Num);
    };
    FormulaValue::Number(datetime_to_serial(dt))
}

fn fn_datedif(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let start = match decode(args, ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let end = match decode(&args[1..], ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let unit = match super::text(args, 2, ctx) {
        Ok(s) => s.to_uppercase(),
        Err(e) => return FormulaValue::Error(e),
    };
    if end < start {
        return FormulaValue::Error(CellError::Num);
    }

    let whole_months = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
        - if end.day() < start.day() { 1 } else { 0 };
    let result = match unit.as_str() {
        "D" => (end - start).num_days(),
        "M" => whole_months as i64,
        "Y" => (whole_months / 12) as i64,
        "MD" => {
            let mut anchor = match add_months(end, 0).and_then(|e| NaiveDate::from_ymd_opt(e.year(), e.month(), start.day().min(28))) {
                Some(a) => a,
                None => return FormulaValue::Error(CellError::Num),
            };
            if anchor > end {
                let Some(prev) = add_months(end, -1) else {
                    return FormulaValue::Error(CellError::Num);
                };
                anchor = match NaiveDate::from_ymd_opt(prev.year(), prev.month(), start.day().min(28)) {
                    Some(a) => a,
                    None => return FormulaValue::Error(CellError::Num),
                };
            }
            (end - anchor).num_days()
        }
        "YM" => (whole_months % 12) as i64,
        "YD" => {
            let Some(anchor) = NaiveDate::from_ymd_opt(end.year(), start.month(), start.day()) else {
                return FormulaValue::Error(CellError::Num);
            };
            let anchor = if anchor > end {
                NaiveDate::from_ymd_opt(end.year() - 1, start.month(), start.day()).unwrap_or(anchor)
            } else {
                anchor
            };
            (end - anchor).num_days()
        }
        _ => return FormulaValue::Error(CellError::Num),
    };
    FormulaValue::Number(Decimal::from(result))
}

fn fn_days(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let end = match decode(args, ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let start = match decode(&args[1..], ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    FormulaValue::Number(Decimal::from((end - start).num_days()))
}

fn fn_networkdays(args: &[Arg], ctx: &EvalCtx) -> FormulaValue {
    let start = match decode(args, ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let end = match decode(&args[1..], ctx) {
        Ok(d) => d,
        Err(e) => return FormulaValue::Error(e),
    };
    let (lo, hi, sign) = if start <= end { (start, end, 1) } else { (end, start, -1) };

    let mut count: i64 = 0;
    let mut day = lo;
    while day <= hi {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        let Some(next) = day.succ_opt() else { break };
        day = next;
    }
    FormulaValue::Number(Decimal::from(count * sign))
}

fn fn_now(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    FormulaValue::Number(datetime_to_serial(Local::now().naive_local()))
}

fn fn_today(_args: &[Arg], _ctx: &EvalCtx) -> FormulaValue {
    let today = Local::now().date_naive();
    let Some(dt) = today.and_hms_opt(0, 0, 0) else {
        return FormulaValue::Error(CellError::Num);
    };
    FormulaValue::Number(datetime_to_serial(dt))
}

pub fn specs() -> Vec<FunctionSpec> {
    vec![
        FunctionSpec { returns_date: true, ..super::spec("DATE", ArgShape::exprs(3), fn_date) },
        super::spec("YEAR", ArgShape::exprs(1), fn_year),
        super::spec("MONTH", ArgShape::exprs(1), fn_month),
        super::spec("DAY", ArgShape::exprs(1), fn_day),
        super::spec("HOUR", ArgShape::exprs(1), fn_hour),
        super::spec("MINUTE", ArgShape::exprs(1), fn_minute),
        super::spec("SECOND", ArgShape::exprs(1), fn_second),
        super::spec("WEEKDAY", ArgShape::fixed(&[ArgKind::Expr]).with_optional(&[ArgKind::Expr]), fn_weekday),
        FunctionSpec { returns_date: true, ..super::spec("EDATE", ArgShape::exprs(2), fn_edate) },
        FunctionSpec { returns_date: true, ..super::spec("EOMONTH", ArgShape::exprs(2), fn_eomonth) },
        super::spec("DATEDIF", ArgShape::exprs(3), fn_datedif),
        super::spec("DAYS", ArgShape::exprs(2), fn_days),
        super::spec("NETWORKDAYS", ArgShape::exprs(2), fn_networkdays),
        FunctionSpec {
            volatile: true,
            returns_date: true,
            returns_time: true,
            ..super::spec("NOW", ArgShape::fixed(&[]), fn_now)
        },
        FunctionSpec {
            volatile: true,
            returns_date: true,
            ..super::spec("TODAY", ArgShape::fixed(&[]), fn_today)
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

    fn num(n: i64) -> Arg {
        Arg::Expr(TExpr::Number(Decimal::from(n)))
    }

    #[test]
    fn test_date_roundtrips_through_year_month_day() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let serial = fn_date(&[num(2024), num(3), num(15)], &ctx);
        let FormulaValue::Number(serial) = serial else { panic!("expected number") };
        let args = [Arg::Expr(TExpr::Number(serial))];
        assert_eq!(fn_year(&args, &ctx), FormulaValue::Number(Decimal::from(2024)));
        assert_eq!(fn_month(&args, &ctx), FormulaValue::Number(Decimal::from(3)));
        assert_eq!(fn_day(&args, &ctx), FormulaValue::Number(Decimal::from(15)));
    }

    #[test]
    fn test_date_month_overflow_rolls_into_next_year() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let serial = fn_date(&[num(2024), num(13), num(1)], &ctx);
        let FormulaValue::Number(serial) = serial else { panic!("expected number") };
        let args = [Arg::Expr(TExpr::Number(serial))];
        assert_eq!(fn_year(&args, &ctx), FormulaValue::Number(Decimal::from(2025)));
        assert_eq!(fn_month(&args, &ctx), FormulaValue::Number(Decimal::from(1)));
    }

    fn date_serial(ctx: &EvalCtx, y: i64, m: i64, d: i64) -> Decimal {
        let FormulaValue::Number(n) = fn_date(&[num(y), num(m), num(d)], ctx) else {
            panic!("expected number")
        };
        n
    }

    #[test]
    fn test_hour_minute_second_decode_the_time_fraction() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let day = date_serial(&ctx, 2024, 1, 1);
        let seconds_past_midnight = 13 * 3600 + 30 * 60 + 45;
        let serial = day + Decimal::from(seconds_past_midnight) / Decimal::from(86_400);
        let args = [Arg::Expr(TExpr::Number(serial))];
        assert_eq!(fn_hour(&args, &ctx), FormulaValue::Number(Decimal::from(13)));
        assert_eq!(fn_minute(&args, &ctx), FormulaValue::Number(Decimal::from(30)));
        assert_eq!(fn_second(&args, &ctx), FormulaValue::Number(Decimal::from(45)));
    }

    #[test]
    fn test_weekday_sunday_start_by_default() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        // 2024-03-15 is a Friday; default return_type 1 is Sunday=1..Saturday=7.
        let serial = date_serial(&ctx, 2024, 3, 15);
        let args = [Arg::Expr(TExpr::Number(serial))];
        assert_eq!(fn_weekday(&args, &ctx), FormulaValue::Number(Decimal::from(6)));
    }

    #[test]
    fn test_edate_clamps_to_shorter_month() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let start = date_serial(&ctx, 2024, 1, 31);
        let args = [Arg::Expr(TExpr::Number(start)), num(1)];
        let FormulaValue::Number(serial) = fn_edate(&args, &ctx) else { panic!("expected number") };
        let decoded = serial_to_datetime(serial).unwrap().date();
        assert_eq!((decoded.year(), decoded.month(), decoded.day()), (2024, 2, 29));
    }

    #[test]
    fn test_eomonth_returns_last_day_of_target_month() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let start = date_serial(&ctx, 2024, 1, 15);
        let args = [Arg::Expr(TExpr::Number(start)), num(1)];
        let FormulaValue::Number(serial) = fn_eomonth(&args, &ctx) else { panic!("expected number") };
        let decoded = serial_to_datetime(serial).unwrap().date();
        assert_eq!((decoded.year(), decoded.month(), decoded.day()), (2024, 2, 29));
    }

    #[test]
    fn test_datedif_years_months_days() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let start = date_serial(&ctx, 2020, 1, 1);
        let end = date_serial(&ctx, 2023, 6, 15);
        let years = [
            Arg::Expr(TExpr::Number(start)),
            Arg::Expr(TExpr::Number(end)),
            Arg::Expr(TExpr::Text("Y".to_string())),
        ];
        assert_eq!(fn_datedif(&years, &ctx), FormulaValue::Number(Decimal::from(3)));
    }

    #[test]
    fn test_days_and_networkdays() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let jan1 = date_serial(&ctx, 2024, 1, 1);
        let jan7 = date_serial(&ctx, 2024, 1, 7);
        let jan10 = date_serial(&ctx, 2024, 1, 10);

        let days_args = [Arg::Expr(TExpr::Number(jan10)), Arg::Expr(TExpr::Number(jan1))];
        assert_eq!(fn_days(&days_args, &ctx), FormulaValue::Number(Decimal::from(9)));

        // 2024-01-01 is a Monday; Mon..Sun inclusive has exactly 5 weekdays.
        let nwd_args = [Arg::Expr(TExpr::Number(jan1)), Arg::Expr(TExpr::Number(jan7))];
        assert_eq!(fn_networkdays(&nwd_args, &ctx), FormulaValue::Number(Decimal::from(5)));
    }

    #[test]
    fn test_date_two_digit_year_convention() {
        let env = FakeEnv;
        let ctx = EvalCtx::new(&env, EvalOptions::default());
        let serial = fn_date(&[num(5), num(1), num(1)], &ctx);
        let FormulaValue::Number(serial) = serial else { panic!("expected number") };
        let args = [Arg::Expr(TExpr::Number(serial))];
        assert_eq!(fn_year(&args, &ctx), FormulaValue::Number(Decimal::from(1905)));
    }
}
