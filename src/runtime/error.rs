// Error handling for the MicroScheme runtime.

use std::fmt;

use crate::ast::Symbol;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised during evaluation. Primitives and special forms return these
/// to the evaluator, which propagates them unchanged; the driver catches at
/// top-level-form boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Variable lookup failed.
    UnboundIdentifier(Symbol),

    /// Wrong number of arguments for a procedure or form.
    ArityMismatch {
        callee: String,
        expected: String,
        actual: usize,
    },

    /// Wrong operand kind for a primitive or form. `position` is 1-based;
    /// 0 means the offending operand has no useful index.
    TypeMismatch {
        callee: String,
        position: usize,
        expected: String,
        actual: String,
    },

    /// An operand of the right kind with an unusable value: zero divisors,
    /// out-of-range indices, `car`/`cdr` of the empty list.
    DomainError(String),

    /// Malformed special forms, assignment to an undefined identifier,
    /// application of a non-procedure, an improper `apply` argument list.
    SemanticError(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnboundIdentifier(name) => {
                write!(f, "unbound identifier: {}", name)
            }
            RuntimeError::ArityMismatch {
                callee,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{}: expected {} argument(s), got {}",
                    callee, expected, actual
                )
            }
            RuntimeError::TypeMismatch {
                callee,
                position,
                expected,
                actual,
            } => {
                if *position == 0 {
                    write!(f, "{}: expected {}, got {}", callee, expected, actual)
                } else {
                    write!(
                        f,
                        "{}: argument {} must be {}, got {}",
                        callee, position, expected, actual
                    )
                }
            }
            RuntimeError::DomainError(message) => write!(f, "{}", message),
            RuntimeError::SemanticError(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn arity(callee: &str, expected: impl fmt::Display, actual: usize) -> RuntimeError {
        RuntimeError::ArityMismatch {
            callee: callee.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }

    pub fn type_mismatch(
        callee: &str,
        position: usize,
        expected: &str,
        actual: &str,
    ) -> RuntimeError {
        RuntimeError::TypeMismatch {
            callee: callee.to_string(),
            position,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
