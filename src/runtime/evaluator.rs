// The tree-walking evaluator: dispatches on node kind and implements the
// special forms, closure application, and primitive invocation.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{
    ApplicationExpr, ApplyExpr, CondExpr, DoExpr, EvalExpr, Expr, ExprRef, LambdaExpr,
    LetrecExpr, SetExpr, SetSlotExpr, Symbol, VectorSetExpr,
};
use crate::parser::expression_from_datum;
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::stdlib::StandardLibrary;
use crate::runtime::values::{Closure, Function, Value};

/// Where interpreter output (`display`, `displayln`, `printf`) goes. Tests
/// swap in a buffer to observe what a program printed.
#[derive(Clone)]
pub enum OutputSink {
    Stdout,
    Buffer(Rc<RefCell<String>>),
}

impl OutputSink {
    pub fn buffer() -> (OutputSink, Rc<RefCell<String>>) {
        let buf = Rc::new(RefCell::new(String::new()));
        (OutputSink::Buffer(buf.clone()), buf)
    }

    fn write(&self, text: &str) {
        match self {
            OutputSink::Stdout => {
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            OutputSink::Buffer(buf) => buf.borrow_mut().push_str(text),
        }
    }
}

pub struct Evaluator {
    global_env: Rc<Environment>,
    output: OutputSink,
}

impl Evaluator {
    /// An evaluator over a fresh global environment seeded with every
    /// primitive, writing to stdout.
    pub fn new() -> Self {
        Self::with_output(OutputSink::Stdout)
    }

    pub fn with_output(output: OutputSink) -> Self {
        Evaluator {
            global_env: StandardLibrary::create_global_environment(),
            output,
        }
    }

    pub fn global_env(&self) -> Rc<Environment> {
        self.global_env.clone()
    }

    pub(crate) fn write_output(&self, text: &str) {
        self.output.write(text);
    }

    /// Evaluate a top-level form against the global environment.
    pub fn eval_toplevel(&self, expr: &ExprRef) -> RuntimeResult<Value> {
        let env = self.global_env.clone();
        self.eval(expr, &env)
    }

    pub fn eval(&self, expr: &ExprRef, env: &Rc<Environment>) -> RuntimeResult<Value> {
        match &**expr {
            // Self-evaluating kinds yield the node itself.
            Expr::Number(_)
            | Expr::String(_)
            | Expr::Boolean(_)
            | Expr::Character(_)
            | Expr::Vector(_)
            | Expr::Empty
            | Expr::Symbol(_)
            | Expr::Pair(_, _) => Ok(Value::Datum(expr.clone())),
            Expr::Procedure(_) | Expr::Unspecified => Ok(Value::from_datum_node(expr.clone())),

            Expr::Variable(name) => env
                .lookup(name)
                .ok_or_else(|| RuntimeError::UnboundIdentifier(name.clone())),

            Expr::Quote(datum) | Expr::Quasiquote(datum) => Ok(Value::Datum(datum.clone())),

            Expr::Sequence(forms) => self.eval_sequence(forms, env),
            Expr::Cond(cond) => self.eval_cond(cond, env),
            Expr::And(operands) => self.eval_and(operands, env),
            Expr::Or(operands) => self.eval_or(operands, env),
            Expr::Lambda(lambda) => Ok(self.eval_lambda(lambda, env)),
            Expr::Letrec(letrec) => self.eval_letrec(letrec, env),
            Expr::Set(form) => self.eval_set(form, env),
            Expr::SetCar(form) => self.eval_set_slot(form, env, true),
            Expr::SetCdr(form) => self.eval_set_slot(form, env, false),
            Expr::VectorSet(form) => self.eval_vector_set(form, env),
            Expr::Do(form) => self.eval_do(form, env),
            Expr::Define(form) => {
                let value = self.eval(&form.value, env)?;
                env.define(&form.name, value);
                Ok(Value::Unspecified)
            }
            Expr::Application(app) => self.eval_application(app, env),
            Expr::Apply(form) => self.eval_apply(form, env),
            Expr::Eval(form) => self.eval_meta(form, env),
        }
    }

    fn eval_sequence(&self, forms: &[ExprRef], env: &Rc<Environment>) -> RuntimeResult<Value> {
        let mut result = Value::Unspecified;
        for form in forms {
            result = self.eval(form, env)?;
        }
        Ok(result)
    }

    fn eval_cond(&self, cond: &CondExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        for clause in &cond.clauses {
            if self.eval(&clause.test, env)?.is_truthy() {
                return self.eval(&clause.body, env);
            }
        }
        match &cond.else_branch {
            Some(body) => self.eval(body, env),
            None => Ok(Value::Unspecified),
        }
    }

    fn eval_and(&self, operands: &[ExprRef], env: &Rc<Environment>) -> RuntimeResult<Value> {
        let mut result = Value::boolean(true);
        for operand in operands {
            result = self.eval(operand, env)?;
            if !result.is_truthy() {
                return Ok(result);
            }
        }
        Ok(result)
    }

    fn eval_or(&self, operands: &[ExprRef], env: &Rc<Environment>) -> RuntimeResult<Value> {
        let mut result = Value::boolean(false);
        for operand in operands {
            result = self.eval(operand, env)?;
            if result.is_truthy() {
                return Ok(result);
            }
        }
        Ok(result)
    }

    /// Lambda evaluation captures the environment; the body is not touched.
    fn eval_lambda(&self, lambda: &LambdaExpr, env: &Rc<Environment>) -> Value {
        Value::Function(Function::Closure(Rc::new(Closure {
            params: lambda.params.clone(),
            body: lambda.body.clone(),
            env: env.clone(),
        })))
    }

    /// Two phases: placeholders first so every right-hand side sees every
    /// name, then all results committed before the body runs.
    fn eval_letrec(&self, letrec: &LetrecExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let frame = Rc::new(Environment::with_parent(env.clone()));
        for binding in &letrec.bindings {
            frame.define(&binding.name, Value::Unspecified);
        }
        let mut results = Vec::with_capacity(letrec.bindings.len());
        for binding in &letrec.bindings {
            results.push(self.eval(&binding.value, &frame)?);
        }
        for (binding, result) in letrec.bindings.iter().zip(results) {
            frame.define(&binding.name, result);
        }
        self.eval(&letrec.body, &frame)
    }

    fn eval_set(&self, form: &SetExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let value = self.eval(&form.value, env)?;
        env.set(&form.name, value)?;
        Ok(Value::Unspecified)
    }

    fn eval_set_slot(
        &self,
        form: &SetSlotExpr,
        env: &Rc<Environment>,
        car: bool,
    ) -> RuntimeResult<Value> {
        let callee = if car { "set-car!" } else { "set-cdr!" };
        // The new slot value is evaluated before the target expression.
        let value = self.eval(&form.value, env)?.into_datum();
        let target = self.eval(&form.target, env)?;
        let datum = target.as_datum().ok_or_else(|| {
            RuntimeError::type_mismatch(callee, 1, "pair", target.type_name())
        })?;
        let updated = if car {
            datum.set_car(value)
        } else {
            datum.set_cdr(value)
        };
        if updated {
            Ok(Value::Unspecified)
        } else if datum.is_empty_list() {
            Err(RuntimeError::DomainError(format!("{}: empty list", callee)))
        } else {
            Err(RuntimeError::type_mismatch(
                callee,
                1,
                "pair",
                datum.type_name(),
            ))
        }
    }

    fn eval_vector_set(&self, form: &VectorSetExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let value = self.eval(&form.value, env)?.into_datum();
        let target = self.eval(&form.target, env)?;
        let index = self.eval(&form.index, env)?;

        let datum = target.as_datum().ok_or_else(|| {
            RuntimeError::type_mismatch("vector-set!", 1, "vector", target.type_name())
        })?;
        let items = match &**datum {
            Expr::Vector(items) => items,
            other => {
                return Err(RuntimeError::type_mismatch(
                    "vector-set!",
                    1,
                    "vector",
                    other.type_name(),
                ))
            }
        };
        let k = index
            .as_number()
            .and_then(|n| n.to_i64())
            .ok_or_else(|| {
                RuntimeError::type_mismatch("vector-set!", 2, "integer", index.type_name())
            })?;
        let len = items.borrow().len();
        if k < 0 || k as usize >= len {
            return Err(RuntimeError::DomainError(format!(
                "vector-set!: index {} out of range for vector of length {}",
                k, len
            )));
        }
        items.borrow_mut()[k as usize] = value;
        Ok(Value::Unspecified)
    }

    /// The iterative form runs as a host loop; the stack does not grow with
    /// the iteration count. Step expressions are evaluated against the
    /// pre-step bindings and committed together.
    fn eval_do(&self, form: &DoExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let frame = Rc::new(Environment::with_parent(env.clone()));
        for binding in &form.bindings {
            let init = self.eval(&binding.init, env)?;
            frame.define(&binding.name, init);
        }
        loop {
            if self.eval(&form.test, &frame)?.is_truthy() {
                return self.eval_sequence(&form.result_exprs, &frame);
            }
            for body_form in &form.body {
                self.eval(body_form, &frame)?;
            }
            let mut staged: Vec<(&Symbol, Value)> = Vec::with_capacity(form.bindings.len());
            for binding in &form.bindings {
                if let Some(step) = &binding.step {
                    staged.push((&binding.name, self.eval(step, &frame)?));
                }
            }
            for (name, value) in staged {
                frame.set(name, value)?;
            }
        }
    }

    fn eval_application(&self, app: &ApplicationExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let operator = self.eval(&app.operator, env)?;
        let mut arguments = Vec::with_capacity(app.operands.len());
        for operand in &app.operands {
            arguments.push(self.eval(operand, env)?);
        }
        self.call_function(operator, arguments)
    }

    pub fn call_function(&self, callee: Value, arguments: Vec<Value>) -> RuntimeResult<Value> {
        match callee {
            Value::Function(Function::Builtin(func)) => {
                if !func.arity.accepts(arguments.len()) {
                    return Err(RuntimeError::arity(&func.name, &func.arity, arguments.len()));
                }
                (func.func)(arguments)
            }
            Value::Function(Function::BuiltinWithContext(func)) => {
                if !func.arity.accepts(arguments.len()) {
                    return Err(RuntimeError::arity(&func.name, &func.arity, arguments.len()));
                }
                (func.func)(arguments, self)
            }
            Value::Function(Function::Closure(closure)) => {
                if closure.params.len() != arguments.len() {
                    return Err(RuntimeError::arity(
                        "lambda",
                        closure.params.len(),
                        arguments.len(),
                    ));
                }
                let frame = closure.env.extend(&closure.params, arguments);
                self.eval(&closure.body, &frame)
            }
            other => Err(RuntimeError::SemanticError(format!(
                "not applicable: {}",
                other
            ))),
        }
    }

    /// `(apply f args)`: the second operand must evaluate to a proper list.
    fn eval_apply(&self, form: &ApplyExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let procedure = self.eval(&form.procedure, env)?;
        let arguments = self.eval(&form.arguments, env)?;
        let datum = arguments.as_datum().ok_or_else(|| {
            RuntimeError::SemanticError(format!(
                "apply: argument list must be a proper list, got {}",
                arguments.type_name()
            ))
        })?;
        let elements = datum.list_elements().ok_or_else(|| {
            RuntimeError::SemanticError("apply: argument list must be a proper list".to_string())
        })?;
        let arguments = elements.into_iter().map(Value::from_datum_node).collect();
        self.call_function(procedure, arguments)
    }

    /// `(eval e)`: `e` must produce a quoted datum, which is lowered back to
    /// syntax and evaluated in the global environment.
    fn eval_meta(&self, form: &EvalExpr, env: &Rc<Environment>) -> RuntimeResult<Value> {
        let quoted = self.eval(&form.expression, env)?;
        let datum = quoted.as_datum().ok_or_else(|| {
            RuntimeError::SemanticError(format!(
                "eval: expected a quoted datum, got {}",
                quoted.type_name()
            ))
        })?;
        let expression = expression_from_datum(datum)
            .map_err(|e| RuntimeError::SemanticError(e.to_string()))?;
        let env = self.global_env.clone();
        self.eval(&expression, &env)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
