// Environments: a frame of bindings plus a parent link, modeling lexical
// scope. Frames are shared through `Rc` handles because closures capture the
// frame live at lambda evaluation time; the bindings map sits behind a
// `RefCell` so `set!` can reach enclosing frames through those handles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Symbol;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::values::Value;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }
    }

    pub fn with_parent(parent: Rc<Environment>) -> Self {
        Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Bind in this frame, shadowing any outer binding of the same name.
    pub fn define(&self, name: &Symbol, value: Value) {
        self.bindings.borrow_mut().insert(name.0.clone(), value);
    }

    /// Resolve a name through the frame chain.
    pub fn lookup(&self, name: &Symbol) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(&name.0) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.lookup(name)
        } else {
            None
        }
    }

    /// Rebind in the nearest enclosing frame that already defines the name.
    pub fn set(&self, name: &Symbol, value: Value) -> RuntimeResult<()> {
        if self.bindings.borrow().contains_key(&name.0) {
            self.bindings.borrow_mut().insert(name.0.clone(), value);
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.set(name, value)
        } else {
            Err(RuntimeError::SemanticError(format!(
                "set! of undefined identifier: {}",
                name
            )))
        }
    }

    /// Child frame binding each formal positionally. Length agreement is the
    /// caller's responsibility (arity is a call-site error, not a frame one).
    pub fn extend(self: &Rc<Self>, formals: &[Symbol], arguments: Vec<Value>) -> Rc<Environment> {
        let child = Environment::with_parent(self.clone());
        for (formal, argument) in formals.iter().zip(arguments) {
            child.define(formal, argument);
        }
        Rc::new(child)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::number::Number;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    fn num(n: i64) -> Value {
        Value::Datum(Rc::new(Expr::Number(Number::from_i64(n))))
    }

    #[test]
    fn lookup_walks_parents() {
        let root = Rc::new(Environment::new());
        root.define(&sym("x"), num(1));
        let child = Rc::new(Environment::with_parent(root));
        assert_eq!(child.lookup(&sym("x")), Some(num(1)));
        assert_eq!(child.lookup(&sym("y")), None);
    }

    #[test]
    fn define_shadows_locally() {
        let root = Rc::new(Environment::new());
        root.define(&sym("x"), num(1));
        let child = Rc::new(Environment::with_parent(root.clone()));
        child.define(&sym("x"), num(2));
        assert_eq!(child.lookup(&sym("x")), Some(num(2)));
        assert_eq!(root.lookup(&sym("x")), Some(num(1)));
    }

    #[test]
    fn set_mutates_nearest_defining_frame() {
        let root = Rc::new(Environment::new());
        root.define(&sym("x"), num(1));
        let child = Rc::new(Environment::with_parent(root.clone()));
        let grandchild = Rc::new(Environment::with_parent(child));
        grandchild.set(&sym("x"), num(5)).unwrap();
        assert_eq!(root.lookup(&sym("x")), Some(num(5)));
    }

    #[test]
    fn set_of_undefined_name_errors() {
        let root = Rc::new(Environment::new());
        assert!(matches!(
            root.set(&sym("nope"), num(1)),
            Err(RuntimeError::SemanticError(_))
        ));
    }

    #[test]
    fn extend_binds_positionally() {
        let root = Rc::new(Environment::new());
        let frame = root.extend(&[sym("a"), sym("b")], vec![num(1), num(2)]);
        assert_eq!(frame.lookup(&sym("a")), Some(num(1)));
        assert_eq!(frame.lookup(&sym("b")), Some(num(2)));
    }
}
