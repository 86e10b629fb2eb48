// Runtime system: the evaluator, standard library, environments, and the
// top-level driver that threads a program through one global environment.

pub mod environment;
pub mod error;
pub mod evaluator;
pub mod stdlib;
pub mod values;

#[cfg(test)]
mod stdlib_tests;

pub use environment::Environment;
pub use error::{RuntimeError, RuntimeResult};
pub use evaluator::{Evaluator, OutputSink};
pub use values::{Function, Value};

use std::fmt;

use crate::ast::Program;
use crate::parser::{self, ParseError};

/// A parse or evaluation failure surfaced through the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpreterError {
    Parse(ParseError),
    Runtime(RuntimeError),
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::Parse(e) => write!(f, "{}", e),
            InterpreterError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for InterpreterError {}

impl From<ParseError> for InterpreterError {
    fn from(e: ParseError) -> Self {
        InterpreterError::Parse(e)
    }
}

impl From<RuntimeError> for InterpreterError {
    fn from(e: RuntimeError) -> Self {
        InterpreterError::Runtime(e)
    }
}

/// The top-level driver.
pub struct Runtime {
    evaluator: Evaluator,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            evaluator: Evaluator::new(),
        }
    }

    pub fn with_output(output: OutputSink) -> Self {
        Runtime {
            evaluator: Evaluator::with_output(output),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Evaluate every top-level form in order against the global environment.
    /// A failing form is reported on stderr and aborts only itself; the
    /// return value counts the failures.
    pub fn run_program(&self, program: &Program) -> usize {
        let mut failures = 0;
        for form in &program.forms {
            if let Err(e) = self.evaluator.eval_toplevel(form) {
                eprintln!("error: {}", e);
                failures += 1;
            }
        }
        failures
    }

    /// Parse and evaluate source, returning the last form's value. Unlike
    /// `run_program`, the first error aborts the rest.
    pub fn evaluate(&self, source: &str) -> Result<Value, InterpreterError> {
        let program = parser::parse(source)?;
        let mut result = Value::Unspecified;
        for form in &program.forms {
            result = self.evaluator.eval_toplevel(form)?;
        }
        Ok(result)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
