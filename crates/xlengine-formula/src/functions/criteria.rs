//! Criteria matching shared by SUMIF/COUNTIF/AVERAGEIF and their `*IFS`
//! siblings.
//!
//! Excel criteria can be:
//! - A number: exact match (e.g., 5)
//! - A text string: case-insensitive match (e.g., "apple")
//! - A comparison expression: ">5", ">=10", "<100", "<=50", "<>0", "=5"
//! - Wildcards: "*" matches any characters, "?" matches a single character
//! - Empty string: matches empty cells
//!
//! This module contributes no callable function itself — `specs()` is
//! empty — it just backs the criteria-driven functions in `math.rs` and
//! `statistical.rs`.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::evaluator::FormulaValue;
use crate::function_spec::FunctionSpec;

#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug)]
enum CriteriaType {
    Number(Decimal),
    Comparison(ComparisonOp, Decimal),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, Copy)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CriteriaMatcher {
    pub fn new(criteria: &FormulaValue) -> Self {
        let criteria_type = match criteria {
            FormulaValue::Number(n) => CriteriaType::Number(*n),
            FormulaValue::Bool(b) => CriteriaType::Number(if *b { Decimal::ONE } else { Decimal::ZERO }),
            FormulaValue::Text(s) => Self::parse_string_criteria(s),
            FormulaValue::Empty => CriteriaType::Empty,
            // Errors and arrays as criteria match nothing.
            FormulaValue::Error(_) | FormulaValue::Array(_) | FormulaValue::DateTime(_) => CriteriaType::Empty,
        };
        Self { criteria_type }
    }

    fn parse_string_criteria(s: &str) -> CriteriaType {
        let s = s.trim();
        if s.is_empty() {
            return CriteriaType::Empty;
        }
        if let Some(ct) = Self::try_parse_comparison(s) {
            return ct;
        }
        if let Ok(n) = Decimal::from_str(s) {
            return CriteriaType::Number(n);
        }
        CriteriaType::Text(s.to_lowercase())
    }

    fn try_parse_comparison(s: &str) -> Option<CriteriaType> {
        let (op, rest) = if s.starts_with(">=") {
            (ComparisonOp::GreaterEqual, &s[2..])
        } else if s.starts_with("<=") {
            (ComparisonOp::LessEqual, &s[2..])
        } else if s.starts_with("<>") {
            (ComparisonOp::NotEqual, &s[2..])
        } else if s.starts_with('>') {
            (ComparisonOp::GreaterThan, &s[1..])
        } else if s.starts_with('<') {
            (ComparisonOp::LessThan, &s[1..])
        } else if s.starts_with('=') {
            (ComparisonOp::Equal, &s[1..])
        } else {
            return None;
        };

        let rest = rest.trim();
        Decimal::from_str(rest).ok().map(|n| CriteriaType::Comparison(op, n))
    }

    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.criteria_type {
            CriteriaType::Number(criteria_num) => match value {
                FormulaValue::Number(n) => n == criteria_num,
                FormulaValue::Bool(b) => {
                    let n = if *b { Decimal::ONE } else { Decimal::ZERO };
                    n == *criteria_num
                }
                _ => false,
            },

            CriteriaType::Comparison(op, criteria_num) => {
                let n = match value {
                    FormulaValue::Number(n) => *n,
                    FormulaValue::Bool(b) => if *b { Decimal::ONE } else { Decimal::ZERO },
                    _ => return false,
                };
                match op {
                    ComparisonOp::Equal => n == *criteria_num,
                    ComparisonOp::NotEqual => n != *criteria_num,
                    ComparisonOp::LessThan => n < *criteria_num,
                    ComparisonOp::LessEqual => n <= *criteria_num,
                    ComparisonOp::GreaterThan => n > *criteria_num,
                    ComparisonOp::GreaterEqual => n >= *criteria_num,
                }
            }

            CriteriaType::Text(pattern) => {
                let text = value.to_text().to_lowercase();
                Self::wildcard_match(pattern, &text)
            }

            CriteriaType::Empty => {
                matches!(value, FormulaValue::Empty) || matches!(value, FormulaValue::Text(s) if s.is_empty())
            }
        }
    }

    fn wildcard_match(pattern: &str, text: &str) -> bool {
        if !pattern.contains('*') && !pattern.contains('?') {
            return pattern == text;
        }
        let pattern_chars: Vec<char> = pattern.chars().collect();
        let text_chars: Vec<char> = text.chars().collect();
        Self::wildcard_match_impl(&pattern_chars, &text_chars)
    }

    fn wildcard_match_impl(pattern: &[char], text: &[char]) -> bool {
        let mut pi = 0;
        let mut ti = 0;
        let mut star_pi = None;
        let mut star_ti = 0;

        while ti < text.len() {
            if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
                pi += 1;
                ti += 1;
            } else if pi < pattern.len() && pattern[pi] == '*' {
                star_pi = Some(pi);
                star_ti = ti;
                pi += 1;
            } else if let Some(sp) = star_pi {
                pi = sp + 1;
                star_ti += 1;
                ti = star_ti;
            } else {
                return false;
            }
        }

        while pi < pattern.len() && pattern[pi] == '*' {
            pi += 1;
        }

        pi == pattern.len()
    }
}

pub fn specs() -> Vec<FunctionSpec> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> FormulaValue {
        FormulaValue::Number(Decimal::from(n))
    }
    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.to_string())
    }

    #[test]
    fn test_number_criteria() {
        let matcher = CriteriaMatcher::new(&num(5));
        assert!(matcher.matches(&num(5)));
        assert!(!matcher.matches(&num(4)));
        assert!(!matcher.matches(&text("5")));
    }

    #[test]
    fn test_comparison_criteria() {
        let matcher = CriteriaMatcher::new(&text(">5"));
        assert!(matcher.matches(&num(6)));
        assert!(!matcher.matches(&num(5)));

        let matcher = CriteriaMatcher::new(&text("<>5"));
        assert!(matcher.matches(&num(6)));
        assert!(!matcher.matches(&num(5)));
    }

    #[test]
    fn test_text_criteria() {
        let matcher = CriteriaMatcher::new(&text("apple"));
        assert!(matcher.matches(&text("APPLE")));
        assert!(!matcher.matches(&text("banana")));
    }

    #[test]
    fn test_wildcard_criteria() {
        let matcher = CriteriaMatcher::new(&text("a*e"));
        assert!(matcher.matches(&text("apple")));
        assert!(matcher.matches(&text("ae")));
        assert!(!matcher.matches(&text("apples")));

        let matcher = CriteriaMatcher::new(&text("a?ple"));
        assert!(matcher.matches(&text("apple")));
        assert!(!matcher.matches(&text("aple")));
    }

    #[test]
    fn test_empty_criteria() {
        let matcher = CriteriaMatcher::new(&text(""));
        assert!(matcher.matches(&FormulaValue::Empty));
        assert!(matcher.matches(&text("")));
        assert!(!matcher.matches(&text("text")));
        assert!(!matcher.matches(&num(0)));
    }
}
