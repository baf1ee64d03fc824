//! Canonical printer: `TExpr` → Excel source text. Precedence-aware, so
//! only the parentheses the grammar actually requires are emitted —
//! `parse(print(e)) == Ok(e)` for every well-typed `e` the parser
//! produces.

use crate::ast::{Aggregator, Arg, ArithOp, CompareOp, RangeLocation, TExpr};
use xlengine_core::{render_sheet_name, CellAddress};

/// Binding power used to decide when a child needs parens. Higher binds
/// tighter; mirrors the parser's precedence ladder.
fn precedence(expr: &TExpr) -> u8 {
    match expr {
        TExpr::Compare { .. } => 2,
        TExpr::Concat { .. } => 3,
        TExpr::Arith { op: ArithOp::Add | ArithOp::Sub, .. } => 4,
        TExpr::Arith { op: ArithOp::Mul | ArithOp::Div, .. } => 5,
        TExpr::Arith { op: ArithOp::Pow, .. } => 6,
        TExpr::Neg(_) => 7,
        TExpr::Percent(_) => 8,
        _ => 10,
    }
}

pub fn print(expr: &TExpr) -> String {
    print_expr(expr)
}

/// Print a cell formula with the leading `=` Excel requires on output,
/// even though it's optional when typing a formula in.
pub fn print_formula(expr: &TExpr) -> String {
    format!("={}", print_expr(expr))
}

fn print_expr(expr: &TExpr) -> String {
    match expr {
        TExpr::Number(n) => n.normalize().to_string(),
        TExpr::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        TExpr::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        TExpr::ErrorLit(e) => e.as_str().to_string(),

        TExpr::PolyRef(node) | TExpr::Ref(node) => print_ref(node.sheet.as_deref(), node.address),

        TExpr::Range(loc) => print_range(loc),
        TExpr::NameRef(name) => name.clone(),

        TExpr::Arith { op, left, right } => print_binary(*op, left, right),
        TExpr::Compare { op, left, right } => print_compare(*op, left, right),
        TExpr::Concat { left, right } => {
            format!("{}&{}", print_child(left, 3), print_child(right, 3))
        }
        TExpr::Neg(inner) => format!("-{}", print_child(inner, 7)),
        TExpr::Percent(inner) => format!("{}%", print_child(inner, 8)),

        // Coercion wrappers are typecheck artifacts; printing unwraps them
        // since the surface syntax never spells them out explicitly.
        TExpr::ToInt(inner)
        | TExpr::DateToSerial(inner)
        | TExpr::DateTimeToSerial(inner) => print_expr(inner),

        TExpr::Aggregate { aggregator, ranges } => {
            let name = aggregator_name(*aggregator);
            let args = ranges.iter().map(print_range).collect::<Vec<_>>().join(",");
            format!("{name}({args})")
        }

        TExpr::Call { spec, args } => {
            if let Some(rendered) = (spec.print_args)(args) {
                format!("{}({})", spec.name, rendered)
            } else {
                let rendered = args
                    .iter()
                    .map(print_arg)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{}({})", spec.name, rendered)
            }
        }

        TExpr::Array(rows) => {
            let body = rows
                .iter()
                .map(|row| row.iter().map(print_expr).collect::<Vec<_>>().join(","))
                .collect::<Vec<_>>()
                .join(";");
            format!("{{{body}}}")
        }
    }
}

fn print_arg(arg: &Arg) -> String {
    match arg {
        Arg::Expr(e) => print_expr(e),
        Arg::Range(loc) => print_range(loc),
    }
}

fn print_child(expr: &TExpr, parent_prec: u8) -> String {
    let child = print_expr(expr);
    if precedence(expr) < parent_prec {
        format!("({child})")
    } else {
        child
    }
}

fn print_binary(op: ArithOp, left: &TExpr, right: &TExpr) -> String {
    let (sym, prec, right_assoc) = match op {
        ArithOp::Add => ("+", 4, false),
        ArithOp::Sub => ("-", 4, false),
        ArithOp::Mul => ("*", 5, false),
        ArithOp::Div => ("/", 5, false),
        ArithOp::Pow => ("^", 6, true),
    };
    let left_str = if right_assoc {
        print_child(left, prec + 1)
    } else {
        print_child(left, prec)
    };
    let right_str = if right_assoc {
        print_child(right, prec)
    } else {
        print_child(right, prec + 1)
    };
    format!("{left_str}{sym}{right_str}")
}

fn print_compare(op: CompareOp, left: &TExpr, right: &TExpr) -> String {
    let sym = match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "<>",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    };
    format!("{}{sym}{}", print_child(left, 2), print_child(right, 3))
}

fn print_ref(sheet: Option<&str>, addr: CellAddress) -> String {
    let a1 = addr.to_a1_string();
    match sheet {
        Some(name) => format!("{}!{}", render_sheet_name(name), a1),
        None => a1,
    }
}

fn print_range(loc: &RangeLocation) -> String {
    let body = loc.range().to_a1_string();
    match loc.sheet() {
        Some(name) => format!("{}!{}", render_sheet_name(name), body),
        None => body,
    }
}

fn aggregator_name(agg: Aggregator) -> &'static str {
    match agg {
        Aggregator::Sum => "SUM",
        Aggregator::Count => "COUNT",
        Aggregator::CountA => "COUNTA",
        Aggregator::CountBlank => "COUNTBLANK",
        Aggregator::Average => "AVERAGE",
        Aggregator::Min => "MIN",
        Aggregator::Max => "MAX",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_precedence_add_mul() {
        let expr = TExpr::Arith {
            op: ArithOp::Add,
            left: Box::new(TExpr::Number(Decimal::ONE)),
            right: Box::new(TExpr::Arith {
                op: ArithOp::Mul,
                left: Box::new(TExpr::Number(Decimal::from(2))),
                right: Box::new(TExpr::Number(Decimal::from(3))),
            }),
        };
        assert_eq!(print_expr(&expr), "1+2*3");
    }

    #[test]
    fn test_parens_needed_when_lower_prec_nested() {
        let expr = TExpr::Arith {
            op: ArithOp::Mul,
            left: Box::new(TExpr::Arith {
                op: ArithOp::Add,
                left: Box::new(TExpr::Number(Decimal::ONE)),
                right: Box::new(TExpr::Number(Decimal::from(2))),
            }),
            right: Box::new(TExpr::Number(Decimal::from(3))),
        };
        assert_eq!(print_expr(&expr), "(1+2)*3");
    }

    #[test]
    fn test_unary_minus_renders_prefix() {
        let expr = TExpr::Neg(Box::new(TExpr::Number(Decimal::from(5))));
        assert_eq!(print_expr(&expr), "-5");
    }

    #[test]
    fn test_power_right_associative_no_parens() {
        let expr = TExpr::Arith {
            op: ArithOp::Pow,
            left: Box::new(TExpr::Number(Decimal::from(2))),
            right: Box::new(TExpr::Arith {
                op: ArithOp::Pow,
                left: Box::new(TExpr::Number(Decimal::from(3))),
                right: Box::new(TExpr::Number(Decimal::from(2))),
            }),
        };
        assert_eq!(print_expr(&expr), "2^3^2");
    }
}
