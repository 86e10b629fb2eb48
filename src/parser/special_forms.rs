// Lowers datum trees into typed AST nodes: recognizes the special-form set,
// desugars `let`/`let*` into lambda applications and the `define` procedure
// shorthand into a lambda declaration. The same lowering backs the `eval`
// form at runtime, which re-enters it on quoted data.

use std::rc::Rc;

use super::errors::ParseError;
use crate::ast::{
    ApplicationExpr, ApplyExpr, CondClause, CondExpr, DefineExpr, DoBinding, DoExpr, EvalExpr,
    Expr, ExprRef, LambdaExpr, LetBinding, LetrecExpr, SetExpr, SetSlotExpr, Symbol,
    VectorSetExpr,
};

/// Turn a datum into an evaluable expression. Data atoms pass through
/// unchanged (they are self-evaluating); identifiers become variable
/// references; lists become special forms or applications.
pub fn expression_from_datum(datum: &ExprRef) -> Result<ExprRef, ParseError> {
    match &**datum {
        Expr::Number(_)
        | Expr::String(_)
        | Expr::Boolean(_)
        | Expr::Character(_)
        | Expr::Vector(_)
        | Expr::Empty => Ok(datum.clone()),
        Expr::Symbol(name) => Ok(Rc::new(Expr::Variable(name.clone()))),
        Expr::Pair(_, _) => {
            let elements = datum.list_elements().ok_or_else(|| {
                ParseError::malformed("expression", "dotted list in expression position")
            })?;
            lower_list(&elements)
        }
        // Already-lowered syntax comes back out of `eval` on re-entry.
        _ => Ok(datum.clone()),
    }
}

fn lower_list(elements: &[ExprRef]) -> Result<ExprRef, ParseError> {
    if elements.is_empty() {
        return Ok(Expr::empty_list());
    }
    if let Expr::Symbol(head) = &*elements[0] {
        let rest = &elements[1..];
        match head.0.as_str() {
            "define" => return build_define(rest),
            "if" => return build_if(rest),
            "cond" => return build_cond(rest),
            "lambda" | "λ" => return build_lambda(rest),
            "begin" => return build_begin(rest),
            "quote" => return build_quote(rest, false),
            "quasiquote" => return build_quote(rest, true),
            "let" => return build_let(rest),
            "let*" => return build_let_star(rest),
            "letrec" => return build_letrec(rest),
            "set!" => return build_set(rest),
            "set-car!" => return build_set_slot(rest, true),
            "set-cdr!" => return build_set_slot(rest, false),
            "vector-set!" => return build_vector_set(rest),
            "do" => return build_do(rest),
            "and" => return Ok(Rc::new(Expr::And(lower_all(rest)?))),
            "or" => return Ok(Rc::new(Expr::Or(lower_all(rest)?))),
            "apply" => return build_apply(rest),
            "eval" => return build_eval(rest),
            "else" => {
                return Err(ParseError::malformed("cond", "else outside cond"));
            }
            _ => {}
        }
    }

    let operator = expression_from_datum(&elements[0])?;
    let operands = lower_all(&elements[1..])?;
    Ok(Rc::new(Expr::Application(ApplicationExpr {
        operator,
        operands,
    })))
}

fn lower_all(data: &[ExprRef]) -> Result<Vec<ExprRef>, ParseError> {
    data.iter().map(expression_from_datum).collect()
}

/// One or more body forms; several are wrapped in a begin block.
fn body_expression(form: &str, body: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match body {
        [] => Err(ParseError::malformed(form, "missing body")),
        [single] => expression_from_datum(single),
        many => Ok(Rc::new(Expr::Sequence(lower_all(many)?))),
    }
}

fn identifier(form: &str, datum: &ExprRef) -> Result<Symbol, ParseError> {
    match &**datum {
        Expr::Symbol(name) => Ok(name.clone()),
        other => Err(ParseError::malformed(
            form,
            format!("expected an identifier, got {}", other.type_name()),
        )),
    }
}

fn parameter_list(form: &str, datum: &ExprRef) -> Result<Vec<Symbol>, ParseError> {
    let elements = datum
        .list_elements()
        .ok_or_else(|| ParseError::malformed(form, "parameter list must be a proper list"))?;
    elements.iter().map(|p| identifier(form, p)).collect()
}

fn build_define(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [target, value] if matches!(&**target, Expr::Symbol(_)) => {
            let name = identifier("define", target)?;
            let value = expression_from_datum(value)?;
            Ok(Rc::new(Expr::Define(DefineExpr { name, value })))
        }
        [target, body @ ..] if matches!(&**target, Expr::Pair(_, _)) => {
            // Procedure shorthand: (define (f a b) body...).
            let header = target
                .list_elements()
                .ok_or_else(|| ParseError::malformed("define", "bad procedure header"))?;
            if header.is_empty() {
                return Err(ParseError::malformed("define", "bad procedure header"));
            }
            let name = identifier("define", &header[0])?;
            let params = header[1..]
                .iter()
                .map(|p| identifier("define", p))
                .collect::<Result<Vec<_>, _>>()?;
            let body = body_expression("define", body)?;
            Ok(Rc::new(Expr::Define(DefineExpr {
                name,
                value: Rc::new(Expr::Lambda(LambdaExpr { params, body })),
            })))
        }
        _ => Err(ParseError::malformed(
            "define",
            "expected (define name expr) or (define (name params) body)",
        )),
    }
}

fn build_if(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    // `if` is a cond with one predicate and one or two consequents.
    match rest {
        [test, consequent] => Ok(Rc::new(Expr::Cond(CondExpr {
            clauses: vec![CondClause {
                test: expression_from_datum(test)?,
                body: expression_from_datum(consequent)?,
            }],
            else_branch: None,
        }))),
        [test, consequent, alternative] => Ok(Rc::new(Expr::Cond(CondExpr {
            clauses: vec![CondClause {
                test: expression_from_datum(test)?,
                body: expression_from_datum(consequent)?,
            }],
            else_branch: Some(expression_from_datum(alternative)?),
        }))),
        _ => Err(ParseError::malformed(
            "if",
            "expected (if test consequent [alternative])",
        )),
    }
}

fn build_cond(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::malformed("cond", "expected at least one clause"));
    }
    let mut clauses = Vec::new();
    let mut else_branch = None;
    for (i, clause) in rest.iter().enumerate() {
        let parts = clause
            .list_elements()
            .ok_or_else(|| ParseError::malformed("cond", "clause must be a proper list"))?;
        if parts.is_empty() {
            return Err(ParseError::malformed("cond", "empty clause"));
        }
        let is_else = matches!(&*parts[0], Expr::Symbol(s) if s.0 == "else");
        if is_else {
            if i + 1 != rest.len() {
                return Err(ParseError::malformed("cond", "else clause must come last"));
            }
            else_branch = Some(body_expression("cond", &parts[1..])?);
        } else {
            clauses.push(CondClause {
                test: expression_from_datum(&parts[0])?,
                body: body_expression("cond", &parts[1..])?,
            });
        }
    }
    Ok(Rc::new(Expr::Cond(CondExpr {
        clauses,
        else_branch,
    })))
}

fn build_lambda(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [params, body @ ..] => {
            let params = parameter_list("lambda", params)?;
            let body = body_expression("lambda", body)?;
            Ok(Rc::new(Expr::Lambda(LambdaExpr { params, body })))
        }
        _ => Err(ParseError::malformed(
            "lambda",
            "expected (lambda (params) body)",
        )),
    }
}

fn build_begin(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    Ok(Rc::new(Expr::Sequence(lower_all(rest)?)))
}

fn build_quote(rest: &[ExprRef], quasi: bool) -> Result<ExprRef, ParseError> {
    let form = if quasi { "quasiquote" } else { "quote" };
    match rest {
        [datum] => {
            if quasi {
                Ok(Rc::new(Expr::Quasiquote(datum.clone())))
            } else {
                Ok(Rc::new(Expr::Quote(datum.clone())))
            }
        }
        _ => Err(ParseError::malformed(form, "expected exactly one datum")),
    }
}

fn binding_pairs(form: &str, datum: &ExprRef) -> Result<Vec<LetBinding>, ParseError> {
    let clauses = datum
        .list_elements()
        .ok_or_else(|| ParseError::malformed(form, "bindings must be a proper list"))?;
    clauses
        .iter()
        .map(|clause| {
            let parts = clause
                .list_elements()
                .ok_or_else(|| ParseError::malformed(form, "bad binding"))?;
            match parts.as_slice() {
                [name, value] => Ok(LetBinding {
                    name: identifier(form, name)?,
                    value: expression_from_datum(value)?,
                }),
                _ => Err(ParseError::malformed(form, "expected (name expr) bindings")),
            }
        })
        .collect()
}

/// `(let ((v e) ...) body)` is a single lambda application.
fn build_let(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [bindings, body @ ..] => {
            let bindings = binding_pairs("let", bindings)?;
            let body = body_expression("let", body)?;
            let (params, operands): (Vec<_>, Vec<_>) =
                bindings.into_iter().map(|b| (b.name, b.value)).unzip();
            Ok(Rc::new(Expr::Application(ApplicationExpr {
                operator: Rc::new(Expr::Lambda(LambdaExpr { params, body })),
                operands,
            })))
        }
        _ => Err(ParseError::malformed("let", "expected (let (bindings) body)")),
    }
}

/// `(let* ((v1 e1) (v2 e2)) body)` nests one-parameter lambda applications.
fn build_let_star(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [bindings, body @ ..] => {
            let bindings = binding_pairs("let*", bindings)?;
            let mut expr = body_expression("let*", body)?;
            for binding in bindings.into_iter().rev() {
                expr = Rc::new(Expr::Application(ApplicationExpr {
                    operator: Rc::new(Expr::Lambda(LambdaExpr {
                        params: vec![binding.name],
                        body: expr,
                    })),
                    operands: vec![binding.value],
                }));
            }
            Ok(expr)
        }
        _ => Err(ParseError::malformed(
            "let*",
            "expected (let* (bindings) body)",
        )),
    }
}

fn build_letrec(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [bindings, body @ ..] => Ok(Rc::new(Expr::Letrec(LetrecExpr {
            bindings: binding_pairs("letrec", bindings)?,
            body: body_expression("letrec", body)?,
        }))),
        _ => Err(ParseError::malformed(
            "letrec",
            "expected (letrec (bindings) body)",
        )),
    }
}

fn build_set(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [name, value] => Ok(Rc::new(Expr::Set(SetExpr {
            name: identifier("set!", name)?,
            value: expression_from_datum(value)?,
        }))),
        _ => Err(ParseError::malformed("set!", "expected (set! name expr)")),
    }
}

fn build_set_slot(rest: &[ExprRef], car: bool) -> Result<ExprRef, ParseError> {
    let form = if car { "set-car!" } else { "set-cdr!" };
    match rest {
        [target, value] => {
            let slot = SetSlotExpr {
                target: expression_from_datum(target)?,
                value: expression_from_datum(value)?,
            };
            Ok(Rc::new(if car {
                Expr::SetCar(slot)
            } else {
                Expr::SetCdr(slot)
            }))
        }
        _ => Err(ParseError::malformed(form, "expected (target value)")),
    }
}

fn build_vector_set(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [target, index, value] => Ok(Rc::new(Expr::VectorSet(VectorSetExpr {
            target: expression_from_datum(target)?,
            index: expression_from_datum(index)?,
            value: expression_from_datum(value)?,
        }))),
        _ => Err(ParseError::malformed(
            "vector-set!",
            "expected (vector-set! vector index value)",
        )),
    }
}

/// `(do ((var init step?) ...) (test result ...) body ...)`
fn build_do(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [bindings, exit, body @ ..] => {
            let binding_clauses = bindings
                .list_elements()
                .ok_or_else(|| ParseError::malformed("do", "bindings must be a proper list"))?;
            let bindings = binding_clauses
                .iter()
                .map(|clause| {
                    let parts = clause
                        .list_elements()
                        .ok_or_else(|| ParseError::malformed("do", "bad binding"))?;
                    match parts.as_slice() {
                        [name, init] => Ok(DoBinding {
                            name: identifier("do", name)?,
                            init: expression_from_datum(init)?,
                            step: None,
                        }),
                        [name, init, step] => Ok(DoBinding {
                            name: identifier("do", name)?,
                            init: expression_from_datum(init)?,
                            step: Some(expression_from_datum(step)?),
                        }),
                        _ => Err(ParseError::malformed("do", "expected (var init [step])")),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;

            let exit_parts = exit
                .list_elements()
                .ok_or_else(|| ParseError::malformed("do", "bad exit clause"))?;
            if exit_parts.is_empty() {
                return Err(ParseError::malformed("do", "exit clause needs a test"));
            }
            let test = expression_from_datum(&exit_parts[0])?;
            let result_exprs = lower_all(&exit_parts[1..])?;
            let body = lower_all(body)?;
            Ok(Rc::new(Expr::Do(DoExpr {
                bindings,
                test,
                result_exprs,
                body,
            })))
        }
        _ => Err(ParseError::malformed(
            "do",
            "expected (do (bindings) (test results) body)",
        )),
    }
}

fn build_apply(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [procedure, arguments] => Ok(Rc::new(Expr::Apply(ApplyExpr {
            procedure: expression_from_datum(procedure)?,
            arguments: expression_from_datum(arguments)?,
        }))),
        _ => Err(ParseError::malformed(
            "apply",
            "expected (apply procedure argument-list)",
        )),
    }
}

fn build_eval(rest: &[ExprRef]) -> Result<ExprRef, ParseError> {
    match rest {
        [expression] => Ok(Rc::new(Expr::Eval(EvalExpr {
            expression: expression_from_datum(expression)?,
        }))),
        _ => Err(ParseError::malformed("eval", "expected (eval expression)")),
    }
}
