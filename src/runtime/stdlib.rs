// The primitive library. Every builtin is seeded into the global environment
// as a first-class value, so `(define f +)` followed by `(f 1 2)` works like
// any other application.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ast::{Expr, Symbol};
use crate::number::Number;
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::values::{
    value_eq, value_equal, Arity, BuiltinFunction, BuiltinFunctionWithContext, Function, Value,
};

thread_local! {
    // One generator for the whole interpreter; `random-set-seed!` replaces it.
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

pub struct StandardLibrary;

impl StandardLibrary {
    /// A fresh global environment with the full primitive library loaded.
    pub fn create_global_environment() -> Rc<Environment> {
        let env = Rc::new(Environment::new());

        Self::load_io_functions(&env);
        Self::load_arithmetic_functions(&env);
        Self::load_transcendental_functions(&env);
        Self::load_comparison_functions(&env);
        Self::load_logic_functions(&env);
        Self::load_list_functions(&env);
        Self::load_vector_functions(&env);
        Self::load_predicate_functions(&env);
        Self::load_string_functions(&env);
        Self::load_character_functions(&env);
        Self::load_conversion_functions(&env);
        Self::load_random_functions(&env);

        env
    }

    fn define(
        env: &Environment,
        name: &str,
        arity: Arity,
        func: fn(Vec<Value>) -> RuntimeResult<Value>,
    ) {
        env.define(
            &Symbol::new(name),
            Value::Function(Function::Builtin(BuiltinFunction {
                name: name.to_string(),
                arity,
                func: Rc::new(func),
            })),
        );
    }

    fn define_with_context(
        env: &Environment,
        name: &str,
        arity: Arity,
        func: fn(Vec<Value>, &Evaluator) -> RuntimeResult<Value>,
    ) {
        env.define(
            &Symbol::new(name),
            Value::Function(Function::BuiltinWithContext(BuiltinFunctionWithContext {
                name: name.to_string(),
                arity,
                func: Rc::new(func),
            })),
        );
    }

    fn load_io_functions(env: &Environment) {
        Self::define_with_context(env, "display", Arity::Fixed(1), Self::display);
        Self::define_with_context(env, "displayln", Arity::Fixed(1), Self::displayln);
        Self::define_with_context(env, "printf", Arity::Variadic(1), Self::printf);
    }

    fn load_arithmetic_functions(env: &Environment) {
        Self::define(env, "+", Arity::Variadic(1), Self::add);
        Self::define(env, "-", Arity::Variadic(1), Self::subtract);
        Self::define(env, "*", Arity::Variadic(1), Self::multiply);
        Self::define(env, "/", Arity::Fixed(2), Self::divide);
        Self::define(env, "**", Arity::Fixed(2), Self::power);
        Self::define(env, "log", Arity::Fixed(1), Self::log);
        Self::define(env, "floor", Arity::Fixed(1), Self::floor);
        Self::define(env, "ceiling", Arity::Fixed(1), Self::ceiling);
        Self::define(env, "round", Arity::Fixed(1), Self::round);
        Self::define(env, "truncate", Arity::Fixed(1), Self::truncate);
        Self::define(env, "modulo", Arity::Fixed(2), Self::modulo);
        Self::define(env, "remainder", Arity::Fixed(2), Self::remainder);
    }

    fn load_transcendental_functions(env: &Environment) {
        Self::define(env, "sin", Arity::Fixed(1), Self::sin);
        Self::define(env, "cos", Arity::Fixed(1), Self::cos);
        Self::define(env, "tan", Arity::Fixed(1), Self::tan);
        Self::define(env, "sinh", Arity::Fixed(1), Self::sinh);
        Self::define(env, "cosh", Arity::Fixed(1), Self::cosh);
        Self::define(env, "tanh", Arity::Fixed(1), Self::tanh);
        Self::define(env, "asin", Arity::Fixed(1), Self::asin);
        Self::define(env, "acos", Arity::Fixed(1), Self::acos);
        Self::define(env, "atan", Arity::Fixed(1), Self::atan);
        Self::define(env, "asinh", Arity::Fixed(1), Self::asinh);
        Self::define(env, "acosh", Arity::Fixed(1), Self::acosh);
        Self::define(env, "atanh", Arity::Fixed(1), Self::atanh);
    }

    fn load_comparison_functions(env: &Environment) {
        Self::define(env, "<", Arity::Fixed(2), Self::less);
        Self::define(env, "<=", Arity::Fixed(2), Self::less_equal);
        Self::define(env, ">", Arity::Fixed(2), Self::greater);
        Self::define(env, ">=", Arity::Fixed(2), Self::greater_equal);
        Self::define(env, "=", Arity::Fixed(2), Self::numeric_equal);
        Self::define(env, "real-part", Arity::Fixed(1), Self::real_part);
        Self::define(env, "imag-part", Arity::Fixed(1), Self::imag_part);
    }

    fn load_logic_functions(env: &Environment) {
        Self::define(env, "not", Arity::Fixed(1), Self::not);
        Self::define(env, "equal?", Arity::Fixed(2), Self::equal_predicate);
        Self::define(env, "eq?", Arity::Fixed(2), Self::eq_predicate);
    }

    fn load_list_functions(env: &Environment) {
        Self::define(env, "cons", Arity::Fixed(2), Self::cons);
        Self::define(env, "list", Arity::Variadic(0), Self::list);
        Self::define(env, "car", Arity::Fixed(1), Self::car);
        Self::define(env, "cdr", Arity::Fixed(1), Self::cdr);
        Self::define(env, "null?", Arity::Fixed(1), Self::null_predicate);
        Self::define(env, "pair?", Arity::Fixed(1), Self::pair_predicate);
        Self::define(env, "list?", Arity::Fixed(1), Self::list_predicate);
    }

    fn load_vector_functions(env: &Environment) {
        Self::define(env, "vector", Arity::Variadic(0), Self::vector);
        Self::define(env, "vector-ref", Arity::Fixed(2), Self::vector_ref);
        Self::define(env, "vector-length", Arity::Fixed(1), Self::vector_length);
        Self::define(env, "vector?", Arity::Fixed(1), Self::vector_predicate);
    }

    fn load_predicate_functions(env: &Environment) {
        Self::define(env, "number?", Arity::Fixed(1), Self::number_predicate);
        Self::define(env, "real?", Arity::Fixed(1), Self::real_predicate);
        Self::define(env, "char?", Arity::Fixed(1), Self::char_predicate);
        Self::define(env, "string?", Arity::Fixed(1), Self::string_predicate);
        Self::define(env, "symbol?", Arity::Fixed(1), Self::symbol_predicate);
        Self::define(env, "procedure?", Arity::Fixed(1), Self::procedure_predicate);
    }

    fn load_string_functions(env: &Environment) {
        Self::define(env, "string-append", Arity::Variadic(0), Self::string_append);
        Self::define(env, "string-length", Arity::Fixed(1), Self::string_length);
        Self::define(env, "string<?", Arity::Fixed(2), Self::string_less);
        Self::define(env, "string<=?", Arity::Fixed(2), Self::string_less_equal);
        Self::define(env, "string>?", Arity::Fixed(2), Self::string_greater);
        Self::define(env, "string>=?", Arity::Fixed(2), Self::string_greater_equal);
        Self::define(env, "substring", Arity::Fixed(3), Self::substring);
    }

    fn load_character_functions(env: &Environment) {
        Self::define(env, "char<?", Arity::Fixed(2), Self::char_less);
        Self::define(env, "char<=?", Arity::Fixed(2), Self::char_less_equal);
        Self::define(env, "char>?", Arity::Fixed(2), Self::char_greater);
        Self::define(env, "char>=?", Arity::Fixed(2), Self::char_greater_equal);
    }

    fn load_conversion_functions(env: &Environment) {
        Self::define(env, "number->string", Arity::Fixed(1), Self::number_to_string);
        Self::define(env, "string->number", Arity::Fixed(1), Self::string_to_number);
        Self::define(env, "list->string", Arity::Fixed(1), Self::list_to_string);
        Self::define(env, "string->list", Arity::Fixed(1), Self::string_to_list);
    }

    fn load_random_functions(env: &Environment) {
        Self::define(env, "random", Arity::Fixed(0), Self::random);
        Self::define(env, "random-integer", Arity::Fixed(2), Self::random_integer);
        Self::define(env, "random-double", Arity::Fixed(2), Self::random_double);
        Self::define(env, "random-set-seed!", Arity::Fixed(1), Self::random_set_seed);
    }
}

// Operand accessors shared by the implementations. Positions in errors are
// 1-based.
fn number_arg<'a>(callee: &str, args: &'a [Value], idx: usize) -> RuntimeResult<&'a Number> {
    args[idx]
        .as_number()
        .ok_or_else(|| RuntimeError::type_mismatch(callee, idx + 1, "number", args[idx].type_name()))
}

fn real_arg<'a>(callee: &str, args: &'a [Value], idx: usize) -> RuntimeResult<&'a Number> {
    let n = number_arg(callee, args, idx)?;
    if n.is_real() {
        Ok(n)
    } else {
        Err(RuntimeError::type_mismatch(
            callee,
            idx + 1,
            "real",
            "complex number",
        ))
    }
}

fn integer_arg(callee: &str, args: &[Value], idx: usize) -> RuntimeResult<i64> {
    number_arg(callee, args, idx)?.to_i64().ok_or_else(|| {
        RuntimeError::type_mismatch(callee, idx + 1, "integer", args[idx].type_name())
    })
}

fn string_arg<'a>(callee: &str, args: &'a [Value], idx: usize) -> RuntimeResult<&'a String> {
    args[idx]
        .as_string()
        .ok_or_else(|| RuntimeError::type_mismatch(callee, idx + 1, "string", args[idx].type_name()))
}

fn char_arg(callee: &str, args: &[Value], idx: usize) -> RuntimeResult<char> {
    args[idx]
        .as_character()
        .ok_or_else(|| RuntimeError::type_mismatch(callee, idx + 1, "char", args[idx].type_name()))
}

fn transcendental(
    callee: &'static str,
    args: Vec<Value>,
    op: fn(&Number) -> Option<Number>,
) -> RuntimeResult<Value> {
    let n = number_arg(callee, &args, 0)?;
    op(n)
        .map(Value::number)
        .ok_or_else(|| RuntimeError::DomainError(format!("{}: result is not finite", callee)))
}

fn real_transcendental(
    callee: &'static str,
    args: Vec<Value>,
    op: fn(&Number) -> Option<Number>,
) -> RuntimeResult<Value> {
    let n = real_arg(callee, &args, 0)?;
    op(n)
        .map(Value::number)
        .ok_or_else(|| RuntimeError::DomainError(format!("{}: result is not finite", callee)))
}

fn rounding(
    callee: &'static str,
    args: Vec<Value>,
    op: fn(&Number) -> Number,
) -> RuntimeResult<Value> {
    let n = real_arg(callee, &args, 0)?;
    Ok(Value::number(op(n)))
}

fn comparison(
    callee: &'static str,
    args: Vec<Value>,
    accept: fn(std::cmp::Ordering) -> bool,
) -> RuntimeResult<Value> {
    let lhs = real_arg(callee, &args, 0)?;
    let rhs = real_arg(callee, &args, 1)?;
    Ok(Value::boolean(accept(lhs.cmp_real(rhs))))
}

fn string_comparison(
    callee: &'static str,
    args: Vec<Value>,
    accept: fn(std::cmp::Ordering) -> bool,
) -> RuntimeResult<Value> {
    let lhs = string_arg(callee, &args, 0)?;
    let rhs = string_arg(callee, &args, 1)?;
    Ok(Value::boolean(accept(lhs.cmp(rhs))))
}

fn char_comparison(
    callee: &'static str,
    args: Vec<Value>,
    accept: fn(std::cmp::Ordering) -> bool,
) -> RuntimeResult<Value> {
    let lhs = char_arg(callee, &args, 0)?;
    let rhs = char_arg(callee, &args, 1)?;
    Ok(Value::boolean(accept(lhs.cmp(&rhs))))
}

/// Implementations.
impl StandardLibrary {
    // I/O

    fn display(args: Vec<Value>, evaluator: &Evaluator) -> RuntimeResult<Value> {
        evaluator.write_output(&args[0].to_string());
        Ok(Value::Unspecified)
    }

    fn displayln(args: Vec<Value>, evaluator: &Evaluator) -> RuntimeResult<Value> {
        evaluator.write_output(&args[0].to_string());
        evaluator.write_output("\n");
        Ok(Value::Unspecified)
    }

    fn printf(args: Vec<Value>, evaluator: &Evaluator) -> RuntimeResult<Value> {
        let format = string_arg("printf", &args, 0)?.clone();
        let mut out = String::new();
        let mut next = 1;
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '~' {
                out.push(c);
                continue;
            }
            let directive = chars.next().ok_or_else(|| {
                RuntimeError::SemanticError("printf: dangling ~ in format string".to_string())
            })?;
            if next >= args.len() {
                return Err(RuntimeError::arity(
                    "printf",
                    format!("an argument for each ~{} directive", directive),
                    args.len() - 1,
                ));
            }
            let arg = &args[next];
            match directive {
                's' | 'd' | 'l' => out.push_str(&arg.to_string()),
                'x' => out.push_str(&number_arg("printf", &args, next)?.to_radix_string(16)),
                'o' => out.push_str(&number_arg("printf", &args, next)?.to_radix_string(8)),
                'b' => out.push_str(&number_arg("printf", &args, next)?.to_radix_string(2)),
                'g' => match args[next].as_datum().map(|d| &**d) {
                    Some(Expr::Boolean(b)) => out.push_str(if *b { "#t" } else { "#f" }),
                    _ => {
                        return Err(RuntimeError::type_mismatch(
                            "printf",
                            next + 1,
                            "boolean",
                            args[next].type_name(),
                        ))
                    }
                },
                'c' => out.push(char_arg("printf", &args, next)?),
                'y' => match args[next].as_datum().map(|d| &**d) {
                    Some(Expr::Symbol(s)) | Some(Expr::Variable(s)) => out.push_str(&s.0),
                    _ => {
                        return Err(RuntimeError::type_mismatch(
                            "printf",
                            next + 1,
                            "symbol",
                            args[next].type_name(),
                        ))
                    }
                },
                other => {
                    return Err(RuntimeError::SemanticError(format!(
                        "printf: unknown format directive ~{}",
                        other
                    )))
                }
            }
            next += 1;
        }
        evaluator.write_output(&out);
        Ok(Value::Unspecified)
    }

    // Arithmetic

    fn add(args: Vec<Value>) -> RuntimeResult<Value> {
        let mut result = number_arg("+", &args, 0)?.clone();
        for idx in 1..args.len() {
            result = result.add(number_arg("+", &args, idx)?);
        }
        Ok(Value::number(result))
    }

    fn subtract(args: Vec<Value>) -> RuntimeResult<Value> {
        let first = number_arg("-", &args, 0)?.clone();
        if args.len() == 1 {
            return Ok(Value::number(first.negate()));
        }
        let mut result = first;
        for idx in 1..args.len() {
            result = result.subtract(number_arg("-", &args, idx)?);
        }
        Ok(Value::number(result))
    }

    fn multiply(args: Vec<Value>) -> RuntimeResult<Value> {
        let mut result = number_arg("*", &args, 0)?.clone();
        for idx in 1..args.len() {
            result = result.multiply(number_arg("*", &args, idx)?);
        }
        Ok(Value::number(result))
    }

    fn divide(args: Vec<Value>) -> RuntimeResult<Value> {
        let dividend = number_arg("/", &args, 0)?;
        let divisor = number_arg("/", &args, 1)?;
        if divisor.is_zero() {
            return Err(RuntimeError::DomainError("division by zero".to_string()));
        }
        Ok(Value::number(dividend.divide(divisor)))
    }

    fn power(args: Vec<Value>) -> RuntimeResult<Value> {
        let base = number_arg("**", &args, 0)?;
        let exponent = number_arg("**", &args, 1)?;
        base.pow(exponent)
            .map(Value::number)
            .ok_or_else(|| RuntimeError::DomainError("**: result is not representable".to_string()))
    }

    fn log(args: Vec<Value>) -> RuntimeResult<Value> {
        let n = number_arg("log", &args, 0)?;
        n.log()
            .map(Value::number)
            .ok_or_else(|| RuntimeError::DomainError("log: undefined for zero".to_string()))
    }

    fn floor(args: Vec<Value>) -> RuntimeResult<Value> {
        rounding("floor", args, Number::floor)
    }

    fn ceiling(args: Vec<Value>) -> RuntimeResult<Value> {
        rounding("ceiling", args, Number::ceiling)
    }

    fn round(args: Vec<Value>) -> RuntimeResult<Value> {
        rounding("round", args, Number::round)
    }

    fn truncate(args: Vec<Value>) -> RuntimeResult<Value> {
        rounding("truncate", args, Number::truncate)
    }

    fn modulo(args: Vec<Value>) -> RuntimeResult<Value> {
        let dividend = real_arg("modulo", &args, 0)?;
        let divisor = real_arg("modulo", &args, 1)?;
        if divisor.is_zero() {
            return Err(RuntimeError::DomainError("modulo: division by zero".to_string()));
        }
        Ok(Value::number(dividend.modulo(divisor)))
    }

    fn remainder(args: Vec<Value>) -> RuntimeResult<Value> {
        let dividend = real_arg("remainder", &args, 0)?;
        let divisor = real_arg("remainder", &args, 1)?;
        if divisor.is_zero() {
            return Err(RuntimeError::DomainError(
                "remainder: division by zero".to_string(),
            ));
        }
        Ok(Value::number(dividend.remainder(divisor)))
    }

    // Transcendental

    fn sin(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("sin", args, Number::sin)
    }

    fn cos(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("cos", args, Number::cos)
    }

    fn tan(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("tan", args, Number::tan)
    }

    fn sinh(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("sinh", args, Number::sinh)
    }

    fn cosh(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("cosh", args, Number::cosh)
    }

    fn tanh(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("tanh", args, Number::tanh)
    }

    fn asin(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("asin", args, Number::asin)
    }

    fn acos(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("acos", args, Number::acos)
    }

    fn atan(args: Vec<Value>) -> RuntimeResult<Value> {
        transcendental("atan", args, Number::atan)
    }

    fn asinh(args: Vec<Value>) -> RuntimeResult<Value> {
        real_transcendental("asinh", args, Number::asinh)
    }

    fn acosh(args: Vec<Value>) -> RuntimeResult<Value> {
        real_transcendental("acosh", args, Number::acosh)
    }

    fn atanh(args: Vec<Value>) -> RuntimeResult<Value> {
        real_transcendental("atanh", args, Number::atanh)
    }

    // Comparison

    fn less(args: Vec<Value>) -> RuntimeResult<Value> {
        comparison("<", args, std::cmp::Ordering::is_lt)
    }

    fn less_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        comparison("<=", args, std::cmp::Ordering::is_le)
    }

    fn greater(args: Vec<Value>) -> RuntimeResult<Value> {
        comparison(">", args, std::cmp::Ordering::is_gt)
    }

    fn greater_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        comparison(">=", args, std::cmp::Ordering::is_ge)
    }

    /// `=` compares both components, so complex operands are allowed.
    fn numeric_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        let lhs = number_arg("=", &args, 0)?;
        let rhs = number_arg("=", &args, 1)?;
        Ok(Value::boolean(lhs == rhs))
    }

    fn real_part(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::number(number_arg("real-part", &args, 0)?.real_part()))
    }

    fn imag_part(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::number(number_arg("imag-part", &args, 0)?.imag_part()))
    }

    // Logic

    fn not(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(!args[0].is_truthy()))
    }

    fn equal_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(value_equal(&args[0], &args[1])))
    }

    fn eq_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(value_eq(&args[0], &args[1])))
    }

    // Pairs and lists

    fn cons(args: Vec<Value>) -> RuntimeResult<Value> {
        let car = args[0].clone().into_datum();
        let cdr = args[1].clone().into_datum();
        Ok(Value::Datum(Expr::cons(car, cdr)))
    }

    fn list(args: Vec<Value>) -> RuntimeResult<Value> {
        let items = args.into_iter().map(Value::into_datum).collect();
        Ok(Value::Datum(Expr::list_from(items)))
    }

    fn car(args: Vec<Value>) -> RuntimeResult<Value> {
        let datum = args[0]
            .as_datum()
            .filter(|d| d.is_pair() || d.is_empty_list())
            .ok_or_else(|| RuntimeError::type_mismatch("car", 1, "pair", args[0].type_name()))?;
        datum
            .car()
            .map(Value::from_datum_node)
            .ok_or_else(|| RuntimeError::DomainError("car: empty list".to_string()))
    }

    fn cdr(args: Vec<Value>) -> RuntimeResult<Value> {
        let datum = args[0]
            .as_datum()
            .filter(|d| d.is_pair() || d.is_empty_list())
            .ok_or_else(|| RuntimeError::type_mismatch("cdr", 1, "pair", args[0].type_name()))?;
        datum
            .cdr()
            .map(Value::from_datum_node)
            .ok_or_else(|| RuntimeError::DomainError("cdr: empty list".to_string()))
    }

    fn null_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(matches!(
            args[0].as_datum().map(|d| &**d),
            Some(Expr::Empty)
        )))
    }

    fn pair_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(
            args[0].as_datum().map(|d| d.is_pair()).unwrap_or(false),
        ))
    }

    fn list_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(
            args[0]
                .as_datum()
                .map(|d| d.is_proper_list())
                .unwrap_or(false),
        ))
    }

    // Vectors

    fn vector(args: Vec<Value>) -> RuntimeResult<Value> {
        let items: Vec<_> = args.into_iter().map(Value::into_datum).collect();
        Ok(Value::Datum(Rc::new(Expr::Vector(RefCell::new(items)))))
    }

    fn vector_ref(args: Vec<Value>) -> RuntimeResult<Value> {
        let datum = args[0]
            .as_datum()
            .ok_or_else(|| RuntimeError::type_mismatch("vector-ref", 1, "vector", args[0].type_name()))?;
        let items = match &**datum {
            Expr::Vector(items) => items,
            other => {
                return Err(RuntimeError::type_mismatch(
                    "vector-ref",
                    1,
                    "vector",
                    other.type_name(),
                ))
            }
        };
        let k = integer_arg("vector-ref", &args, 1)?;
        let items = items.borrow();
        if k < 0 || k as usize >= items.len() {
            return Err(RuntimeError::DomainError(format!(
                "vector-ref: index {} out of range for vector of length {}",
                k,
                items.len()
            )));
        }
        Ok(Value::from_datum_node(items[k as usize].clone()))
    }

    fn vector_length(args: Vec<Value>) -> RuntimeResult<Value> {
        let datum = args[0].as_datum().ok_or_else(|| {
            RuntimeError::type_mismatch("vector-length", 1, "vector", args[0].type_name())
        })?;
        match &**datum {
            Expr::Vector(items) => Ok(Value::number(Number::from_usize(items.borrow().len()))),
            other => Err(RuntimeError::type_mismatch(
                "vector-length",
                1,
                "vector",
                other.type_name(),
            )),
        }
    }

    fn vector_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(matches!(
            args[0].as_datum().map(|d| &**d),
            Some(Expr::Vector(_))
        )))
    }

    // Type predicates

    fn number_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(args[0].as_number().is_some()))
    }

    fn real_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        let n = number_arg("real?", &args, 0)?;
        Ok(Value::boolean(n.is_real()))
    }

    fn char_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(args[0].as_character().is_some()))
    }

    fn string_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(args[0].as_string().is_some()))
    }

    fn symbol_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(matches!(
            args[0].as_datum().map(|d| &**d),
            Some(Expr::Symbol(_)) | Some(Expr::Variable(_))
        )))
    }

    fn procedure_predicate(args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::boolean(matches!(args[0], Value::Function(_))))
    }

    // Strings

    fn string_append(args: Vec<Value>) -> RuntimeResult<Value> {
        let mut out = String::new();
        for idx in 0..args.len() {
            out.push_str(string_arg("string-append", &args, idx)?);
        }
        Ok(Value::string(out))
    }

    fn string_length(args: Vec<Value>) -> RuntimeResult<Value> {
        let s = string_arg("string-length", &args, 0)?;
        Ok(Value::number(Number::from_usize(s.chars().count())))
    }

    fn string_less(args: Vec<Value>) -> RuntimeResult<Value> {
        string_comparison("string<?", args, std::cmp::Ordering::is_lt)
    }

    fn string_less_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        string_comparison("string<=?", args, std::cmp::Ordering::is_le)
    }

    fn string_greater(args: Vec<Value>) -> RuntimeResult<Value> {
        string_comparison("string>?", args, std::cmp::Ordering::is_gt)
    }

    fn string_greater_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        string_comparison("string>=?", args, std::cmp::Ordering::is_ge)
    }

    /// Bounds: 0 <= start <= end <= length.
    fn substring(args: Vec<Value>) -> RuntimeResult<Value> {
        let s = string_arg("substring", &args, 0)?;
        let start = integer_arg("substring", &args, 1)?;
        let end = integer_arg("substring", &args, 2)?;
        let chars: Vec<char> = s.chars().collect();
        if start < 0 || end < start || end as usize > chars.len() {
            return Err(RuntimeError::DomainError(format!(
                "substring: bad range [{}, {}) for string of length {}",
                start,
                end,
                chars.len()
            )));
        }
        let out: String = chars[start as usize..end as usize].iter().collect();
        Ok(Value::string(out))
    }

    // Characters

    fn char_less(args: Vec<Value>) -> RuntimeResult<Value> {
        char_comparison("char<?", args, std::cmp::Ordering::is_lt)
    }

    fn char_less_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        char_comparison("char<=?", args, std::cmp::Ordering::is_le)
    }

    fn char_greater(args: Vec<Value>) -> RuntimeResult<Value> {
        char_comparison("char>?", args, std::cmp::Ordering::is_gt)
    }

    fn char_greater_equal(args: Vec<Value>) -> RuntimeResult<Value> {
        char_comparison("char>=?", args, std::cmp::Ordering::is_ge)
    }

    // Conversions

    fn number_to_string(args: Vec<Value>) -> RuntimeResult<Value> {
        let n = number_arg("number->string", &args, 0)?;
        Ok(Value::string(n.to_string()))
    }

    /// Parses a numeric literal; yields `#f` when the text is not a number.
    fn string_to_number(args: Vec<Value>) -> RuntimeResult<Value> {
        let s = string_arg("string->number", &args, 0)?;
        Ok(match Number::parse(s.trim()) {
            Some(n) => Value::number(n),
            None => Value::boolean(false),
        })
    }

    fn list_to_string(args: Vec<Value>) -> RuntimeResult<Value> {
        let datum = args[0].as_datum().ok_or_else(|| {
            RuntimeError::type_mismatch("list->string", 1, "list", args[0].type_name())
        })?;
        let elements = datum.list_elements().ok_or_else(|| {
            RuntimeError::type_mismatch("list->string", 1, "proper list", datum.type_name())
        })?;
        let mut out = String::with_capacity(elements.len());
        for (idx, element) in elements.iter().enumerate() {
            match &**element {
                Expr::Character(c) => out.push(*c),
                other => {
                    return Err(RuntimeError::type_mismatch(
                        "list->string",
                        idx + 1,
                        "char",
                        other.type_name(),
                    ))
                }
            }
        }
        Ok(Value::string(out))
    }

    fn string_to_list(args: Vec<Value>) -> RuntimeResult<Value> {
        let s = string_arg("string->list", &args, 0)?;
        let items: Vec<_> = s.chars().map(|c| Rc::new(Expr::Character(c))).collect();
        Ok(Value::Datum(Expr::list_from(items)))
    }

    // Random

    fn random(_args: Vec<Value>) -> RuntimeResult<Value> {
        let x: f64 = RNG.with(|rng| rng.borrow_mut().gen());
        Number::from_f64(x)
            .map(Value::number)
            .ok_or_else(|| RuntimeError::DomainError("random: bad generator output".to_string()))
    }

    /// Inclusive on both ends.
    fn random_integer(args: Vec<Value>) -> RuntimeResult<Value> {
        let min = integer_arg("random-integer", &args, 0)?;
        let max = integer_arg("random-integer", &args, 1)?;
        if max < min {
            return Err(RuntimeError::DomainError(format!(
                "random-integer: empty range [{}, {}]",
                min, max
            )));
        }
        let n = RNG.with(|rng| rng.borrow_mut().gen_range(min..=max));
        Ok(Value::number(Number::from_i64(n)))
    }

    fn random_double(args: Vec<Value>) -> RuntimeResult<Value> {
        let min = real_arg("random-double", &args, 0)?
            .to_f64()
            .ok_or_else(|| RuntimeError::DomainError("random-double: bound too large".to_string()))?;
        let max = real_arg("random-double", &args, 1)?
            .to_f64()
            .ok_or_else(|| RuntimeError::DomainError("random-double: bound too large".to_string()))?;
        let unit: f64 = RNG.with(|rng| rng.borrow_mut().gen());
        Number::from_f64(min + (max - min) * unit)
            .map(Value::number)
            .ok_or_else(|| RuntimeError::DomainError("random-double: bad range".to_string()))
    }

    fn random_set_seed(args: Vec<Value>) -> RuntimeResult<Value> {
        let seed = integer_arg("random-set-seed!", &args, 0)?;
        RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed as u64));
        Ok(Value::Unspecified)
    }
}
