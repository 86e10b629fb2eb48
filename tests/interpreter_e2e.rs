// End-to-end programs: parse, evaluate, and assert on the printed output.

use microscheme::runtime::{OutputSink, Runtime};

/// Run a full program and return what it printed.
fn run(source: &str) -> String {
    let (sink, buffer) = OutputSink::buffer();
    let runtime = Runtime::with_output(sink);
    let program = microscheme::parse(source).unwrap_or_else(|e| panic!("parse failed: {}", e));
    for form in &program.forms {
        runtime
            .evaluator()
            .eval_toplevel(form)
            .unwrap_or_else(|e| panic!("evaluation failed: {}", e));
    }
    let out = buffer.borrow().clone();
    out
}

#[test]
fn displays_a_sum() {
    assert_eq!(run("(display (+ 1 2 3))"), "6");
}

#[test]
fn recursive_factorial() {
    let source = r#"
        (define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))
        (display (fact 6))
    "#;
    assert_eq!(run(source), "720");
}

#[test]
fn closure_counter_keeps_private_state() {
    let source = r#"
        (define c (let ((x 0)) (lambda () (set! x (+ x 1)) x)))
        (display (c)) (display (c)) (display (c))
    "#;
    assert_eq!(run(source), "123");
}

#[test]
fn shared_cell_mutation_is_visible() {
    let source = r#"
        (define l (list 1 2 3))
        (set-car! (cdr l) 99)
        (display l)
    "#;
    assert_eq!(run(source), "(1 99 3)");
}

#[test]
fn do_loop_sums_indices() {
    assert_eq!(
        run("(display (do ((i 0 (+ i 1)) (s 0 (+ s i))) ((= i 5) s)))"),
        "10"
    );
}

#[test]
fn user_defined_map() {
    let source = r#"
        (define (map-like f l)
          (if (null? l)
              '()
              (cons (f (car l)) (map-like f (cdr l)))))
        (display (map-like (lambda (x) (* x x)) '(1 2 3)))
    "#;
    assert_eq!(run(source), "(1 4 9)");
}

#[test]
fn do_steps_are_simultaneous() {
    // b's step reads a before a's step commits.
    let source = r#"
        (display (do ((a 1 b) (b 2 (+ a b)) (n 0 (+ n 1)))
                     ((= n 5) a)))
    "#;
    // Sequential assignment would double `a` each round and print 32.
    assert_eq!(run(source), "13");
}

#[test]
fn do_loop_runs_many_iterations_without_stack_growth() {
    assert_eq!(
        run("(display (do ((i 0 (+ i 1)) (s 0 (+ s i))) ((= i 100000) s)))"),
        "4999950000"
    );
}

#[test]
fn letrec_mutual_recursion() {
    let source = r#"
        (display
          (letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
                   (odd?  (lambda (n) (if (= n 0) #f (even? (- n 1))))))
            (even? 10)))
    "#;
    assert_eq!(run(source), "#t");
}

#[test]
fn let_star_sees_earlier_bindings() {
    assert_eq!(run("(display (let* ((x 2) (y (* x 3))) (+ x y)))"), "8");
}

#[test]
fn cond_takes_first_truthy_clause() {
    let source = r#"
        (define (classify n)
          (cond ((< n 0) "negative")
                ((= n 0) "zero")
                (else "positive")))
        (display (classify -5))
        (display (classify 0))
        (display (classify 3))
    "#;
    assert_eq!(run(source), "negativezeropositive");
}

#[test]
fn and_or_short_circuit() {
    let source = r#"
        (define x 0)
        (and #f (set! x 1))
        (or #t (set! x 2))
        (display x)
        (display (and 1 2 3))
        (display (or #f 7))
        (display (and))
        (display (or))
    "#;
    assert_eq!(run(source), "037#t#f");
}

#[test]
fn quoted_data_is_not_evaluated() {
    assert_eq!(run("(display '(+ 1 2))"), "(+ 1 2)");
    assert_eq!(run("(display 'hello)"), "hello");
    assert_eq!(run("(display `(1 2))"), "(1 2)");
}

#[test]
fn eval_reenters_the_evaluator() {
    assert_eq!(run("(display (eval '(+ 1 2)))"), "3");
    assert_eq!(
        run("(define program '(define y 21)) (eval program) (display (* 2 y))"),
        "42"
    );
}

#[test]
fn apply_spreads_a_list() {
    assert_eq!(run("(display (apply + (list 1 2 3)))"), "6");
    assert_eq!(
        run("(display (apply (lambda (a b) (- a b)) '(10 4)))"),
        "6"
    );
}

#[test]
fn set_reaches_the_defining_frame() {
    let source = r#"
        (define x 1)
        (define (bump) (set! x (+ x 10)))
        (bump)
        (bump)
        (display x)
    "#;
    assert_eq!(run(source), "21");
}

#[test]
fn vector_set_mutates_in_place() {
    let source = r#"
        (define v (vector 1 2 3))
        (vector-set! v 0 99)
        (display v)
    "#;
    assert_eq!(run(source), "#(99 2 3)");
}

#[test]
fn begin_returns_last_value() {
    assert_eq!(run("(display (begin 1 2 3))"), "3");
}

#[test]
fn lexical_capture_over_mutation() {
    // The closure sees the binding, not a snapshot of its value.
    let source = r#"
        (define x 1)
        (define (get) x)
        (set! x 5)
        (display (get))
    "#;
    assert_eq!(run(source), "5");
}

#[test]
fn shadowing_does_not_leak() {
    let source = r#"
        (define x 1)
        (display (let ((x 2)) x))
        (display x)
    "#;
    assert_eq!(run(source), "21");
}

#[test]
fn higher_order_procedures() {
    let source = r#"
        (define (compose f g) (lambda (x) (f (g x))))
        (define add1 (lambda (n) (+ n 1)))
        (define double (lambda (n) (* n 2)))
        (display ((compose add1 double) 5))
    "#;
    assert_eq!(run(source), "11");
}

#[test]
fn complex_results_carry_components() {
    assert_eq!(run("(display (imag-part (** -1 0.5)))"), "1");
    assert_eq!(run("(display (real? (** -1 0.5)))"), "#f");
    assert!(run("(display (** -1 0.5))").ends_with("i"));
}

#[test]
fn dotted_pairs_print_with_dots() {
    assert_eq!(run("(display (cons 1 (cons 2 3)))"), "(1 2 . 3)");
    assert_eq!(run("(display '())"), "()");
}

#[test]
fn cyclic_structure_prints_bounded() {
    let source = r#"
        (define l (list 1 2))
        (set-cdr! (cdr l) l)
        (display (list? l))
        (display (equal? l l))
    "#;
    assert_eq!(run(source), "#f#t");
}

#[test]
fn fresh_environments_evaluate_alike() {
    let source = "(display (map-or-sum 4))";
    let prelude = r#"
        (define (map-or-sum n) (if (< n 3) n (+ n (map-or-sum (- n 1)))))
    "#;
    let program = format!("{}{}", prelude, source);
    assert_eq!(run(&program), run(&program));
}

mod failures {
    use microscheme::runtime::{InterpreterError, Runtime, RuntimeError};

    fn run_err(source: &str) -> RuntimeError {
        match Runtime::new().evaluate(source) {
            Err(InterpreterError::Runtime(e)) => e,
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn unbound_identifier() {
        assert!(matches!(
            run_err("(+ 1 nope)"),
            RuntimeError::UnboundIdentifier(_)
        ));
    }

    #[test]
    fn closure_arity_is_checked() {
        assert!(matches!(
            run_err("((lambda (a b) a) 1)"),
            RuntimeError::ArityMismatch { .. }
        ));
    }

    #[test]
    fn applying_a_non_procedure() {
        assert!(matches!(
            run_err("(define x 5) (x 1)"),
            RuntimeError::SemanticError(_)
        ));
    }

    #[test]
    fn set_of_undefined_identifier() {
        assert!(matches!(
            run_err("(set! ghost 1)"),
            RuntimeError::SemanticError(_)
        ));
    }

    #[test]
    fn set_car_rejects_non_pairs() {
        assert!(matches!(
            run_err("(set-car! 5 1)"),
            RuntimeError::TypeMismatch { .. }
        ));
        assert!(matches!(
            run_err("(set-car! '() 1)"),
            RuntimeError::DomainError(_)
        ));
    }

    #[test]
    fn apply_requires_a_proper_list() {
        assert!(matches!(
            run_err("(apply + 5)"),
            RuntimeError::SemanticError(_)
        ));
        assert!(matches!(
            run_err("(apply + (cons 1 2))"),
            RuntimeError::SemanticError(_)
        ));
    }

    #[test]
    fn eval_requires_a_datum() {
        assert!(matches!(
            run_err("(eval +)"),
            RuntimeError::SemanticError(_)
        ));
    }

    #[test]
    fn driver_continues_after_a_failed_form() {
        let program = microscheme::parse("(car '()) (define ok 1) ok").unwrap();
        let runtime = Runtime::new();
        assert_eq!(runtime.run_program(&program), 1);
        // The later define still ran.
        assert_eq!(
            runtime.evaluate("ok").unwrap(),
            microscheme::Value::number(microscheme::Number::from_i64(1))
        );
    }
}
