//! # xlengine-formula
//!
//! Typed formula parser and evaluator for xlengine.
//!
//! This crate provides:
//! - Formula parsing (text → typed AST, `parser::parse_formula`)
//! - Formula evaluation (typed AST → value, `evaluator::eval_expr`)
//! - Built-in Excel functions, each a [`function_spec::FunctionSpec`]
//! - Formula printing (typed AST → text, `printer::print_formula`)
//! - Dependency tracking for calculation order (`dependency`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use xlengine_formula::{parser::parse_formula, evaluator::{EvalCtx, EvalOptions, eval_expr}};
//!
//! let ast = parse_formula("=SUM(A1:A10)")?;
//! let result = eval_expr(&ast, &EvalCtx::new(&env, EvalOptions::default()));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod function_spec;
pub mod functions;
pub mod parser;
pub mod printer;
pub mod typecheck;

pub use ast::{Arg, RangeLocation, TExpr};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{eval_expr, EvalCtx, EvalOptions, Env, FormulaValue};
pub use function_spec::FunctionSpec;
pub use parser::parse_formula;
pub use printer::print_formula;
