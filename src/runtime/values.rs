// Runtime values. Evaluation yields either a datum node (data and AST share
// one representation), a procedure, or the unspecified value produced by
// forms with no useful result.

use std::fmt;
use std::rc::Rc;

use crate::ast::{datum_eq, datum_equal, write_datum, Expr, ExprRef, Symbol};
use crate::number::Number;
use crate::runtime::environment::Environment;
use crate::runtime::error::RuntimeResult;
use crate::runtime::evaluator::Evaluator;

#[derive(Clone)]
pub enum Value {
    /// A datum node, possibly aliased by other values.
    Datum(ExprRef),
    Function(Function),
    Unspecified,
}

#[derive(Clone)]
pub enum Function {
    Builtin(BuiltinFunction),
    BuiltinWithContext(BuiltinFunctionWithContext),
    Closure(Rc<Closure>),
}

/// A lambda paired with the environment visible at its evaluation.
pub struct Closure {
    pub params: Vec<Symbol>,
    pub body: ExprRef,
    pub env: Rc<Environment>,
}

#[derive(Clone)]
pub struct BuiltinFunction {
    pub name: String,
    pub arity: Arity,
    pub func: Rc<dyn Fn(Vec<Value>) -> RuntimeResult<Value>>,
}

/// Builtins that need the evaluator itself (the output sink, re-entrant
/// evaluation).
#[derive(Clone)]
pub struct BuiltinFunctionWithContext {
    pub name: String,
    pub arity: Arity,
    pub func: Rc<dyn Fn(Vec<Value>, &Evaluator) -> RuntimeResult<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    Fixed(usize),
    Variadic(usize),
    Range(usize, usize),
}

impl Function {
    pub fn name(&self) -> Option<&str> {
        match self {
            Function::Builtin(b) => Some(&b.name),
            Function::BuiltinWithContext(b) => Some(&b.name),
            Function::Closure(_) => None,
        }
    }

    /// The opaque printed form of a procedure.
    pub fn display_marker(&self) -> String {
        match self.name() {
            Some(name) => format!("#<procedure:{}>", name),
            None => "#<procedure>".to_string(),
        }
    }
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == *n,
            Arity::Variadic(min) => count >= *min,
            Arity::Range(min, max) => count >= *min && count <= *max,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic(min) => write!(f, "at least {}", min),
            Arity::Range(min, max) => write!(f, "between {} and {}", min, max),
        }
    }
}

impl Value {
    pub fn number(n: Number) -> Value {
        Value::Datum(Rc::new(Expr::Number(n)))
    }

    pub fn boolean(b: bool) -> Value {
        Value::Datum(Rc::new(Expr::Boolean(b)))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::Datum(Rc::new(Expr::String(s.into())))
    }

    pub fn character(c: char) -> Value {
        Value::Datum(Rc::new(Expr::Character(c)))
    }

    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Datum(Rc::new(Expr::Symbol(Symbol::new(name))))
    }

    pub fn empty_list() -> Value {
        Value::Datum(Expr::empty_list())
    }

    /// The node form of this value, for storage into a data slot. Procedures
    /// and the unspecified value get carrier nodes.
    pub fn into_datum(self) -> ExprRef {
        match self {
            Value::Datum(d) => d,
            Value::Function(f) => Rc::new(Expr::Procedure(f)),
            Value::Unspecified => Rc::new(Expr::Unspecified),
        }
    }

    /// The value form of a node pulled back out of a data slot.
    pub fn from_datum_node(d: ExprRef) -> Value {
        match &*d {
            Expr::Procedure(f) => Value::Function(f.clone()),
            Expr::Unspecified => Value::Unspecified,
            _ => Value::Datum(d),
        }
    }

    /// Exactly one value is false: the false boolean.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Datum(d) if matches!(&**d, Expr::Boolean(false)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Datum(d) => d.type_name(),
            Value::Function(_) => "procedure",
            Value::Unspecified => "unspecified",
        }
    }

    pub fn as_datum(&self) -> Option<&ExprRef> {
        match self {
            Value::Datum(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Datum(d) => match &**d {
                Expr::Number(n) => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Value::Datum(d) => match &**d {
                Expr::String(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<char> {
        match self {
            Value::Datum(d) => match &**d {
                Expr::Character(c) => Some(*c),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Datum(d) => {
                let mut out = String::new();
                write_datum(&mut out, d);
                write!(f, "{}", out)
            }
            Value::Function(Function::Builtin(b)) => write!(f, "#<procedure:{}>", b.name),
            Value::Function(Function::BuiltinWithContext(b)) => {
                write!(f, "#<procedure:{}>", b.name)
            }
            Value::Function(Function::Closure(_)) => write!(f, "#<procedure>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Datum(d) => write!(f, "Datum({})", self_display(d)),
            Value::Function(func) => write!(f, "{:?}", func),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

fn self_display(d: &ExprRef) -> String {
    let mut out = String::new();
    write_datum(&mut out, d);
    out
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(b) => write!(f, "Builtin({})", b.name),
            Function::BuiltinWithContext(b) => write!(f, "Builtin({})", b.name),
            Function::Closure(_) => write!(f, "Closure"),
        }
    }
}

/// Structural equality, used by tests and `equal?`. Closures compare by
/// identity only.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Datum(a), Value::Datum(b)) => datum_equal(a, b),
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Unspecified, Value::Unspecified) => true,
            _ => false,
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Builtin(a), Function::Builtin(b)) => a.name == b.name,
            (Function::BuiltinWithContext(a), Function::BuiltinWithContext(b)) => {
                a.name == b.name
            }
            (Function::Closure(a), Function::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The `eq?` relation lifted to values: reference identity for compound
/// data and closures, value equality for atoms.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Datum(x), Value::Datum(y)) => datum_eq(x, y),
        (Value::Function(x), Value::Function(y)) => x == y,
        (Value::Unspecified, Value::Unspecified) => true,
        _ => false,
    }
}

/// The `equal?` relation lifted to values.
pub fn value_equal(a: &Value, b: &Value) -> bool {
    a == b
}
