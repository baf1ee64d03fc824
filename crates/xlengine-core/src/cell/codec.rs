//! Cell codec layer — bidirectional typed marshaling between host values
//! and [`CellValue`], with inferred number-format hints on write.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::value::CellValue;
use crate::error::{Error, Result};
use crate::style::NumberFormat;

/// Excel's date epoch: serial day 0. Serial 1 is 1900-01-01; the
/// historical 1900 leap-year bug is absorbed by using Dec 30, not Dec 31,
/// as day zero.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("static date")
}

/// Convert a serial number to a naive datetime
pub fn serial_to_datetime(serial: Decimal) -> Option<NaiveDateTime> {
    let whole_days = serial.trunc().to_string().parse::<i64>().ok()?;
    let frac = serial.fract();
    let seconds = (frac * Decimal::from(86_400)).round().to_string().parse::<i64>().ok()?;
    let date = excel_epoch().checked_add_signed(Duration::days(whole_days))?;
    let base = date.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(Duration::seconds(seconds))
}

/// Convert a naive datetime to its Excel serial number
pub fn datetime_to_serial(dt: NaiveDateTime) -> Decimal {
    let days = (dt.date() - excel_epoch()).num_days();
    let seconds_in_day = dt.time().num_seconds_from_midnight();
    let frac = Decimal::from(seconds_in_day) / Decimal::from(86_400);
    Decimal::from(days) + frac
}

trait NumSecondsFromMidnight {
    fn num_seconds_from_midnight(&self) -> i64;
}

impl NumSecondsFromMidnight for chrono::NaiveTime {
    fn num_seconds_from_midnight(&self) -> i64 {
        use chrono::Timelike;
        self.hour() as i64 * 3600 + self.minute() as i64 * 60 + self.second() as i64
    }
}

/// A format hint attached to a freshly written value, applied only if the
/// cell has no explicit style set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleHint {
    General,
    Decimal,
    Date,
    DateTime,
}

impl StyleHint {
    pub fn to_number_format(self) -> NumberFormat {
        match self {
            StyleHint::General => NumberFormat::General,
            StyleHint::Decimal => NumberFormat::Custom("0.00".into()),
            StyleHint::Date => NumberFormat::Custom("yyyy-mm-dd".into()),
            StyleHint::DateTime => NumberFormat::Custom("yyyy-mm-dd hh:mm:ss".into()),
        }
    }
}

/// Bidirectional typed codec between a host value and a cell.
///
/// `read` never panics and never silently coerces outside the narrow
/// rules defined per type: `Empty` reads as `Ok(None)`, a matching type
/// reads as `Ok(Some(_))`, and anything else is `Err(TypeMismatch)`.
pub trait CellCodec: Sized {
    const TYPE_NAME: &'static str;

    fn read(value: &CellValue) -> Result<Option<Self>> {
        Self::read_at("<cell>", value)
    }

    fn read_at(at: &str, value: &CellValue) -> Result<Option<Self>>;

    fn write(self) -> (CellValue, Option<StyleHint>);
}

impl CellCodec for String {
    const TYPE_NAME: &'static str = "string";

    fn read_at(at: &str, value: &CellValue) -> Result<Option<Self>> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Text(s) => Ok(Some(s.as_str().to_string())),
            CellValue::RichText(runs) => {
                Ok(Some(runs.iter().map(|r| r.text.as_str()).collect()))
            }
            // Numeric -> string coercion uses invariant-culture formatting
            CellValue::Number(n) => Ok(Some(n.normalize().to_string())),
            CellValue::Bool(b) => Ok(Some(if *b { "TRUE".into() } else { "FALSE".into() })),
            CellValue::DateTime(dt) => Ok(Some(datetime_to_serial(*dt).normalize().to_string())),
            other => Err(Error::TypeMismatch {
                at: at.to_string(),
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn write(self) -> (CellValue, Option<StyleHint>) {
        (CellValue::text(self), Some(StyleHint::General))
    }
}

impl CellCodec for bool {
    const TYPE_NAME: &'static str = "bool";

    fn read_at(at: &str, value: &CellValue) -> Result<Option<Self>> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Bool(b) => Ok(Some(*b)),
            other => Err(Error::TypeMismatch {
                at: at.to_string(),
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn write(self) -> (CellValue, Option<StyleHint>) {
        (CellValue::Bool(self), Some(StyleHint::General))
    }
}

impl CellCodec for Decimal {
    const TYPE_NAME: &'static str = "decimal";

    fn read_at(at: &str, value: &CellValue) -> Result<Option<Self>> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::Number(n) => Ok(Some(*n)),
            CellValue::Bool(b) => Ok(Some(if *b { Decimal::ONE } else { Decimal::ZERO })),
            other => Err(Error::TypeMismatch {
                at: at.to_string(),
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn write(self) -> (CellValue, Option<StyleHint>) {
        (CellValue::Number(self), Some(StyleHint::Decimal))
    }
}

/// Integer codec: accepts numeric cells only if they have no fractional
/// part.
macro_rules! int_codec {
    ($t:ty, $name:literal) => {
        impl CellCodec for $t {
            const TYPE_NAME: &'static str = $name;

            fn read_at(at: &str, value: &CellValue) -> Result<Option<Self>> {
                match value.effective_value() {
                    CellValue::Empty => Ok(None),
                    CellValue::Number(n) => {
                        if n.fract() != Decimal::ZERO {
                            return Err(Error::CellParseError {
                                at: at.to_string(),
                                value: n.to_string(),
                                target: Self::TYPE_NAME,
                                detail: "value has a fractional part".into(),
                            });
                        }
                        let as_i64: i64 = n.to_string().parse().map_err(|_| Error::CellParseError {
                            at: at.to_string(),
                            value: n.to_string(),
                            target: Self::TYPE_NAME,
                            detail: "out of range".into(),
                        })?;
                        <$t>::try_from(as_i64).map(Some).map_err(|_| Error::CellParseError {
                            at: at.to_string(),
                            value: n.to_string(),
                            target: Self::TYPE_NAME,
                            detail: "out of range".into(),
                        })
                    }
                    other => Err(Error::TypeMismatch {
                        at: at.to_string(),
                        expected: Self::TYPE_NAME,
                        actual: other.type_name(),
                    }),
                }
            }

            fn write(self) -> (CellValue, Option<StyleHint>) {
                (CellValue::Number(Decimal::from(self as i64)), Some(StyleHint::General))
            }
        }
    };
}

int_codec!(i8, "i8");
int_codec!(i16, "i16");
int_codec!(i32, "i32");
int_codec!(i64, "i64");
int_codec!(u8, "u8");
int_codec!(u16, "u16");
int_codec!(u32, "u32");
int_codec!(u64, "u64");

impl CellCodec for NaiveDateTime {
    const TYPE_NAME: &'static str = "datetime";

    fn read_at(at: &str, value: &CellValue) -> Result<Option<Self>> {
        match value.effective_value() {
            CellValue::Empty => Ok(None),
            CellValue::DateTime(dt) => Ok(Some(*dt)),
            // Date codecs accept Excel serial numbers too
            CellValue::Number(n) => serial_to_datetime(*n).map(Some).ok_or_else(|| Error::CellParseError {
                at: at.to_string(),
                value: n.to_string(),
                target: Self::TYPE_NAME,
                detail: "not a valid Excel serial date".into(),
            }),
            other => Err(Error::TypeMismatch {
                at: at.to_string(),
                expected: Self::TYPE_NAME,
                actual: other.type_name(),
            }),
        }
    }

    fn write(self) -> (CellValue, Option<StyleHint>) {
        let has_time = self.time() != chrono::NaiveTime::MIN;
        let hint = if has_time { StyleHint::DateTime } else { StyleHint::Date };
        (CellValue::DateTime(self), Some(hint))
    }
}

/// Parse a decimal from a cell-display string (used by the `VALUE`
/// function and by codecs that must coerce a literal string argument).
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim()).map_err(|e| Error::CellParseError {
        at: "<value>".into(),
        value: s.to_string(),
        target: "decimal",
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_roundtrip_known_date() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let serial = datetime_to_serial(dt);
        assert_eq!(serial.trunc().to_string(), "45672");
        let back = serial_to_datetime(serial).unwrap();
        assert_eq!(back.date(), dt.date());
    }

    #[test]
    fn test_string_codec_empty_and_text() {
        assert_eq!(String::read(&CellValue::Empty).unwrap(), None);
        assert_eq!(String::read(&CellValue::text("hi")).unwrap(), Some("hi".to_string()));
    }

    #[test]
    fn test_string_codec_numeric_coercion() {
        let v = CellValue::Number(Decimal::from(42));
        assert_eq!(String::read(&v).unwrap(), Some("42".to_string()));
    }

    #[test]
    fn test_int_codec_rejects_fraction() {
        let v = CellValue::Number(Decimal::new(105, 1)); // 10.5
        assert!(i64::read(&v).is_err());
        let v2 = CellValue::Number(Decimal::from(10));
        assert_eq!(i64::read(&v2).unwrap(), Some(10));
    }

    #[test]
    fn test_bool_codec_rejects_number() {
        let v = CellValue::Number(Decimal::ONE);
        assert!(bool::read(&v).is_err());
    }

    #[test]
    fn test_datetime_codec_accepts_serial() {
        let v = CellValue::Number(Decimal::from(45672));
        let dt = NaiveDateTime::read(&v).unwrap().unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }
}
