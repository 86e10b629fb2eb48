// MicroScheme interpreter library: a tree-walking evaluator for a Scheme
// subset with lexical scope, first-class procedures, mutable pairs and
// vectors, and arbitrary-precision complex arithmetic.

pub mod ast;
pub mod number;
pub mod parser;
pub mod runtime;

pub use ast::{Expr, ExprRef, Program, Symbol};
pub use number::Number;
pub use parser::{parse, parse_expression, ParseError};
pub use runtime::{Evaluator, InterpreterError, OutputSink, Runtime, RuntimeError, Value};
