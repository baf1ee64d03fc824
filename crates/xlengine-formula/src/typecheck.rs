//! The typechecker: a single pass that resolves every
//! [`TExpr::PolyRef`] left by the parser into a [`TExpr::Ref`] with a
//! concrete [`RefKind`], inserting the implicit coercions required for
//! numeric/integer/string contexts, and validates `Call` argument
//! count/kind against each function's [`crate::function_spec::ArgShape`].
//!
//! The two-pass split exists so the parser stays context-free — the
//! expected type is never threaded through the parser itself.

use crate::ast::{Arg, RangeLocation, RefKind, RefNode, TExpr};
use crate::error::{FormulaError, FormulaResult};

/// The type context a sub-expression is being typechecked under. Drives
/// which `RefKind` a bare `PolyRef` resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Any,
    Number,
    Text,
    Bool,
    DateTime,
}

impl ExpectedType {
    fn ref_kind(self) -> RefKind {
        match self {
            ExpectedType::Any => RefKind::Any,
            ExpectedType::Number => RefKind::Number,
            ExpectedType::Text => RefKind::Text,
            ExpectedType::Bool => RefKind::Bool,
            ExpectedType::DateTime => RefKind::DateTime,
        }
    }
}

pub fn typecheck(expr: TExpr, expected: ExpectedType) -> FormulaResult<TExpr> {
    match expr {
        TExpr::PolyRef(node) => Ok(TExpr::Ref(resolve_ref(node, expected))),
        TExpr::Ref(node) => Ok(TExpr::Ref(node)),

        TExpr::Number(_) | TExpr::Text(_) | TExpr::Bool(_) | TExpr::ErrorLit(_) | TExpr::NameRef(_) => {
            Ok(expr)
        }

        TExpr::Range(loc) => Ok(TExpr::Range(typecheck_range(loc)?)),

        TExpr::Arith { op, left, right } => Ok(TExpr::Arith {
            op,
            left: Box::new(typecheck(*left, ExpectedType::Number)?),
            right: Box::new(typecheck(*right, ExpectedType::Number)?),
        }),

        TExpr::Compare { op, left, right } => Ok(TExpr::Compare {
            op,
            left: Box::new(typecheck(*left, ExpectedType::Any)?),
            right: Box::new(typecheck(*right, ExpectedType::Any)?),
        }),

        TExpr::Concat { left, right } => Ok(TExpr::Concat {
            left: Box::new(typecheck(*left, ExpectedType::Text)?),
            right: Box::new(typecheck(*right, ExpectedType::Text)?),
        }),

        TExpr::Neg(inner) => Ok(TExpr::Neg(Box::new(typecheck(*inner, ExpectedType::Number)?))),
        TExpr::Percent(inner) => {
            Ok(TExpr::Percent(Box::new(typecheck(*inner, ExpectedType::Number)?)))
        }

        TExpr::ToInt(inner) => Ok(TExpr::ToInt(Box::new(typecheck(*inner, ExpectedType::Number)?))),
        TExpr::DateToSerial(inner) => {
            Ok(TExpr::DateToSerial(Box::new(typecheck(*inner, ExpectedType::DateTime)?)))
        }
        TExpr::DateTimeToSerial(inner) => Ok(TExpr::DateTimeToSerial(Box::new(typecheck(
            *inner,
            ExpectedType::DateTime,
        )?))),

        TExpr::Aggregate { aggregator, ranges } => {
            let ranges = ranges
                .into_iter()
                .map(typecheck_range)
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(TExpr::Aggregate { aggregator, ranges })
        }

        TExpr::Call { spec, args } => {
            if !spec.shape.accepts_count(args.len()) {
                return Err(FormulaError::ArgumentCount {
                    function: spec.name.to_string(),
                    expected: spec.shape.describe(),
                    actual: args.len(),
                });
            }
            let args = args
                .into_iter()
                .enumerate()
                .map(|(i, arg)| typecheck_arg(arg, spec.shape.kind_at(i), spec.name, i))
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(TExpr::Call { spec, args })
        }

        TExpr::Array(rows) => {
            let rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|e| typecheck(e, ExpectedType::Any))
                        .collect::<FormulaResult<Vec<_>>>()
                })
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(TExpr::Array(rows))
        }
    }
}

fn resolve_ref(mut node: RefNode, expected: ExpectedType) -> RefNode {
    node.kind = Some(expected.ref_kind());
    node
}

fn typecheck_range(loc: RangeLocation) -> FormulaResult<RangeLocation> {
    // Ranges carry no sub-expressions to typecheck; validated structurally
    // by the parser (start <= end is enforced in `CellRange::new`).
    Ok(loc)
}

fn typecheck_arg(
    arg: Arg,
    kind: crate::function_spec::ArgKind,
    function: &str,
    index: usize,
) -> FormulaResult<Arg> {
    use crate::function_spec::ArgKind;
    match (arg, kind) {
        (Arg::Range(loc), ArgKind::Expr) => Err(FormulaError::ArgumentKind {
            function: function.to_string(),
            index,
            expected: "an expression, not a range".to_string(),
        }),
        (Arg::Expr(TExpr::Range(_)), ArgKind::Expr) => Err(FormulaError::ArgumentKind {
            function: function.to_string(),
            index,
            expected: "an expression, not a range".to_string(),
        }),
        (Arg::Expr(e), ArgKind::Range) => match e {
            TExpr::Range(loc) => Ok(Arg::Range(typecheck_range(loc)?)),
            TExpr::Ref(node) | TExpr::PolyRef(node) => Ok(Arg::Range(RangeLocation::Local(
                xlengine_core::CellRange::single(node.address),
            ))),
            _ => Err(FormulaError::ArgumentKind {
                function: function.to_string(),
                index,
                expected: "a range".to_string(),
            }),
        },
        (Arg::Expr(e), _) => Ok(Arg::Expr(typecheck(e, ExpectedType::Any)?)),
        (Arg::Range(loc), _) => Ok(Arg::Range(typecheck_range(loc)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ArithOp;
    use rust_decimal::Decimal;
    use xlengine_core::CellAddress;

    #[test]
    fn test_poly_ref_resolved_in_numeric_context() {
        let poly = TExpr::PolyRef(RefNode {
            sheet: None,
            address: CellAddress::new(0, 0),
            kind: None,
        });
        let expr = TExpr::Arith {
            op: ArithOp::Add,
            left: Box::new(poly),
            right: Box::new(TExpr::Number(Decimal::ONE)),
        };
        let typed = typecheck(expr, ExpectedType::Any).unwrap();
        match typed {
            TExpr::Arith { left, .. } => match *left {
                TExpr::Ref(node) => assert_eq!(node.kind, Some(RefKind::Number)),
                other => panic!("expected Ref, got {other:?}"),
            },
            other => panic!("expected Arith, got {other:?}"),
        }
    }

    #[test]
    fn test_argument_count_rejected() {
        let spec = crate::function_spec::lookup("ABS").unwrap();
        let call = TExpr::Call {
            spec,
            args: vec![],
        };
        assert!(typecheck(call, ExpectedType::Any).is_err());
    }
}
