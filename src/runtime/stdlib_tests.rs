// Contract tests for the primitive library, driven through parsed source.

use crate::number::Number;
use crate::runtime::error::RuntimeError;
use crate::runtime::evaluator::OutputSink;
use crate::runtime::values::Value;
use crate::runtime::{InterpreterError, Runtime};

fn eval(source: &str) -> Value {
    Runtime::new()
        .evaluate(source)
        .unwrap_or_else(|e| panic!("{} failed: {}", source, e))
}

fn eval_err(source: &str) -> RuntimeError {
    match Runtime::new().evaluate(source) {
        Err(InterpreterError::Runtime(e)) => e,
        Ok(v) => panic!("{} unexpectedly evaluated to {}", source, v),
        Err(other) => panic!("{} failed to parse: {}", source, other),
    }
}

fn num(n: i64) -> Value {
    Value::number(Number::from_i64(n))
}

fn shown(source: &str) -> String {
    eval(source).to_string()
}

#[test]
fn arithmetic_folds() {
    assert_eq!(eval("(+ 1 2 3)"), num(6));
    assert_eq!(eval("(- 10 1 2)"), num(7));
    assert_eq!(eval("(- 4)"), num(-4));
    assert_eq!(eval("(* 2 3 4)"), num(24));
    assert_eq!(eval("(/ 6 2)"), num(3));
    assert_eq!(shown("(/ 1 4)"), "0.25");
    assert_eq!(eval("(** 2 10)"), num(1024));
}

#[test]
fn arithmetic_boundaries() {
    assert!(matches!(eval_err("(/ 1 0)"), RuntimeError::DomainError(_)));
    assert!(matches!(eval_err("(+ 1 \"x\")"), RuntimeError::TypeMismatch { .. }));
    assert!(matches!(eval_err("(+)"), RuntimeError::ArityMismatch { .. }));
    assert!(matches!(eval_err("(/ 1 2 3)"), RuntimeError::ArityMismatch { .. }));
}

#[test]
fn rounding_requires_real_operands() {
    assert_eq!(eval("(floor 2.7)"), num(2));
    assert_eq!(eval("(ceiling 2.1)"), num(3));
    assert_eq!(eval("(round 2.5)"), num(3));
    assert_eq!(eval("(truncate -2.7)"), num(-2));
    assert!(matches!(
        eval_err("(floor (** -1 0.5))"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn modulo_and_remainder_signs() {
    assert_eq!(eval("(modulo 7 3)"), num(1));
    assert_eq!(eval("(modulo -7 3)"), num(2));
    assert_eq!(eval("(modulo 7 -3)"), num(-2));
    assert_eq!(eval("(remainder 7 3)"), num(1));
    assert_eq!(eval("(remainder -7 3)"), num(-1));
    assert_eq!(eval("(remainder 7 -3)"), num(1));
    assert!(matches!(eval_err("(modulo 7 0)"), RuntimeError::DomainError(_)));
}

#[test]
fn quotient_identity_holds() {
    // n = (truncate (/ n m)) * m + (remainder n m)
    for (n, m) in [(17, 5), (-17, 5), (17, -5), (-17, -5)] {
        let source = format!(
            "(= {n} (+ (* (truncate (/ {n} {m})) {m}) (remainder {n} {m})))",
        );
        assert_eq!(eval(&source), Value::boolean(true), "n={n} m={m}");
    }
}

#[test]
fn complex_arithmetic_components() {
    assert_eq!(shown("(** -1 0.5)").split('+').count(), 2);
    assert_eq!(eval("(real-part 3)"), num(3));
    assert_eq!(eval("(imag-part 3)"), num(0));
    assert_eq!(eval("(= 1.0 1)"), Value::boolean(true));
}

#[test]
fn ordering_rejects_complex_operands() {
    assert_eq!(eval("(< 1 2)"), Value::boolean(true));
    assert_eq!(eval("(>= 2 2)"), Value::boolean(true));
    assert!(matches!(
        eval_err("(< (** -1 0.5) 1)"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn truthiness_has_one_false_value() {
    assert_eq!(eval("(not #f)"), Value::boolean(true));
    assert_eq!(eval("(not 0)"), Value::boolean(false));
    assert_eq!(eval("(not '())"), Value::boolean(false));
    assert_eq!(eval("(not \"\")"), Value::boolean(false));
}

#[test]
fn equality_relations() {
    assert_eq!(eval("(equal? '(1 2 (3)) '(1 2 (3)))"), Value::boolean(true));
    assert_eq!(eval("(eq? '(1) '(1))"), Value::boolean(false));
    assert_eq!(eval("(let ((l '(1 2))) (eq? l l))"), Value::boolean(true));
    assert_eq!(eval("(eq? 'a 'a)"), Value::boolean(true));
    assert_eq!(eval("(equal? 1 \"1\")"), Value::boolean(false));
    assert_eq!(eval("(let ((v 42)) (equal? v v))"), Value::boolean(true));
}

#[test]
fn list_operations() {
    assert_eq!(shown("(cons 1 2)"), "(1 . 2)");
    assert_eq!(shown("(list 1 2 3)"), "(1 2 3)");
    assert_eq!(eval("(car '(1 2))"), num(1));
    assert_eq!(shown("(cdr '(1 2))"), "(2)");
    assert_eq!(eval("(null? '())"), Value::boolean(true));
    assert_eq!(eval("(null? '(1))"), Value::boolean(false));
    assert_eq!(eval("(pair? '(1))"), Value::boolean(true));
    assert_eq!(eval("(pair? '())"), Value::boolean(false));
    assert_eq!(eval("(list? '(1 2 3))"), Value::boolean(true));
    assert_eq!(eval("(list? (cons 1 2))"), Value::boolean(false));
}

#[test]
fn car_and_cdr_reject_the_empty_list() {
    assert!(matches!(eval_err("(car '())"), RuntimeError::DomainError(_)));
    assert!(matches!(eval_err("(cdr '())"), RuntimeError::DomainError(_)));
    assert!(matches!(eval_err("(car 5)"), RuntimeError::TypeMismatch { .. }));
}

#[test]
fn vector_operations() {
    assert_eq!(shown("(vector 1 2 3)"), "#(1 2 3)");
    assert_eq!(eval("(vector-ref (vector 1 2 3) 1)"), num(2));
    assert_eq!(eval("(vector-length (vector 1 2 3))"), num(3));
    assert_eq!(eval("(vector? (vector))"), Value::boolean(true));
    assert!(matches!(
        eval_err("(vector-ref (vector 1) 1)"),
        RuntimeError::DomainError(_)
    ));
    assert!(matches!(
        eval_err("(vector-ref (vector 1) -1)"),
        RuntimeError::DomainError(_)
    ));
}

#[test]
fn type_predicates() {
    assert_eq!(eval("(number? 1)"), Value::boolean(true));
    assert_eq!(eval("(real? 1)"), Value::boolean(true));
    assert_eq!(eval("(real? (** -1 0.5))"), Value::boolean(false));
    assert!(matches!(eval_err("(real? \"x\")"), RuntimeError::TypeMismatch { .. }));
    assert_eq!(eval("(char? #\\a)"), Value::boolean(true));
    assert_eq!(eval("(string? \"s\")"), Value::boolean(true));
    assert_eq!(eval("(symbol? 'a)"), Value::boolean(true));
    assert_eq!(eval("(procedure? +)"), Value::boolean(true));
    assert_eq!(eval("(procedure? (lambda (x) x))"), Value::boolean(true));
    assert_eq!(eval("(procedure? 1)"), Value::boolean(false));
}

#[test]
fn string_operations() {
    assert_eq!(eval("(string-append \"foo\" \"bar\")"), Value::string("foobar"));
    assert_eq!(eval("(string-length \"hello\")"), num(5));
    assert_eq!(eval("(string<? \"abc\" \"abd\")"), Value::boolean(true));
    assert_eq!(eval("(string>=? \"b\" \"b\")"), Value::boolean(true));
    assert_eq!(eval("(substring \"hello\" 1 3)"), Value::string("el"));
    assert_eq!(eval("(substring \"hello\" 0 0)"), Value::string(""));
}

#[test]
fn substring_bounds() {
    assert!(matches!(
        eval_err("(substring \"hello\" 3 2)"),
        RuntimeError::DomainError(_)
    ));
    assert!(matches!(
        eval_err("(substring \"hello\" 0 6)"),
        RuntimeError::DomainError(_)
    ));
    assert!(matches!(
        eval_err("(substring \"hello\" -1 2)"),
        RuntimeError::DomainError(_)
    ));
}

#[test]
fn character_comparisons() {
    assert_eq!(eval("(char<? #\\a #\\b)"), Value::boolean(true));
    assert_eq!(eval("(char>=? #\\b #\\b)"), Value::boolean(true));
    assert!(matches!(
        eval_err("(char<? #\\a 1)"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn conversions_round_trip() {
    assert_eq!(eval("(number->string 720)"), Value::string("720"));
    assert_eq!(eval("(string->number \"1.5\")"), Value::number(Number::parse("1.5").unwrap()));
    assert_eq!(eval("(string->number \"nope\")"), Value::boolean(false));
    assert_eq!(
        eval("(= 2.5 (string->number (number->string 2.5)))"),
        Value::boolean(true)
    );
    assert_eq!(eval("(list->string (list #\\h #\\i))"), Value::string("hi"));
    assert_eq!(shown("(string->list \"hi\")"), "(h i)");
    assert_eq!(
        eval("(list->string (string->list \"round\"))"),
        Value::string("round")
    );
    assert_eq!(
        eval("(equal? '(#\\a #\\b) (string->list (list->string '(#\\a #\\b))))"),
        Value::boolean(true)
    );
}

#[test]
fn list_to_string_requires_characters() {
    assert!(matches!(
        eval_err("(list->string '(1 2))"),
        RuntimeError::TypeMismatch { .. }
    ));
    assert!(matches!(
        eval_err("(list->string (cons #\\a #\\b))"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn random_generator_is_seedable() {
    let runtime = Runtime::new();
    runtime.evaluate("(random-set-seed! 42)").unwrap();
    let a = runtime.evaluate("(random-integer 0 1000000)").unwrap();
    runtime.evaluate("(random-set-seed! 42)").unwrap();
    let b = runtime.evaluate("(random-integer 0 1000000)").unwrap();
    assert_eq!(a, b);
}

#[test]
fn random_ranges() {
    let runtime = Runtime::new();
    for _ in 0..50 {
        let v = runtime.evaluate("(random-integer 3 5)").unwrap();
        let n = v.as_number().and_then(|n| n.to_i64()).unwrap();
        assert!((3..=5).contains(&n));
    }
    assert_eq!(
        runtime.evaluate("(random-integer 4 4)").unwrap(),
        num(4)
    );
    let unit = runtime.evaluate("(random)").unwrap();
    let x = unit.as_number().and_then(|n| n.to_f64()).unwrap();
    assert!((0.0..1.0).contains(&x));
    let d = runtime.evaluate("(random-double 2 3)").unwrap();
    let x = d.as_number().and_then(|n| n.to_f64()).unwrap();
    assert!((2.0..=3.0).contains(&x));
    assert!(matches!(
        eval_err("(random-integer 5 3)"),
        RuntimeError::DomainError(_)
    ));
}

#[test]
fn printf_directives() {
    let (sink, buffer) = OutputSink::buffer();
    let runtime = Runtime::with_output(sink);
    runtime
        .evaluate(r#"(printf "~d + ~d = ~s!" 1 2 3)"#)
        .unwrap();
    runtime
        .evaluate(r#"(printf " ~x ~o ~b ~g ~c ~y" 255 8 5 #t #\z 'sym)"#)
        .unwrap();
    assert_eq!(&*buffer.borrow(), "1 + 2 = 3! ff 10 101 #t z sym");
}

#[test]
fn printf_checks_arguments() {
    assert!(matches!(
        eval_err(r#"(printf "~d ~d" 1)"#),
        RuntimeError::ArityMismatch { .. }
    ));
    assert!(matches!(
        eval_err(r#"(printf "~q" 1)"#),
        RuntimeError::SemanticError(_)
    ));
    assert!(matches!(
        eval_err(r#"(printf "~g" 3)"#),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn display_writes_raw_text() {
    let (sink, buffer) = OutputSink::buffer();
    let runtime = Runtime::with_output(sink);
    runtime
        .evaluate(r#"(display "text") (display #\!) (displayln '(1 2)) (display 1.50)"#)
        .unwrap();
    assert_eq!(&*buffer.borrow(), "text!(1 2)\n1.5");
}

#[test]
fn transcendental_functions() {
    assert_eq!(eval("(sin 0)"), num(0));
    assert_eq!(eval("(cos 0)"), num(1));
    assert_eq!(eval("(tanh 0)"), num(0));
    assert_eq!(eval("(asinh 0)"), num(0));
    assert_eq!(eval("(= 0 (log 1))"), Value::boolean(true));
    assert!(matches!(eval_err("(log 0)"), RuntimeError::DomainError(_)));
    assert!(matches!(
        eval_err("(atanh (** -1 0.5))"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn primitives_are_first_class() {
    assert_eq!(eval("(define f +) (f 1 2)"), num(3));
    assert_eq!(eval("(define g (car (list +))) (g 2 3)"), num(5));
    assert_eq!(eval("(apply + '(1 2 3))"), num(6));
}
