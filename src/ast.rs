// Syntax tree for MicroScheme. Parsed programs and runtime data share this
// representation: quoted data evaluates to the node itself, and `set-car!` /
// `set-cdr!` / `vector-set!` mutate slots in place. Nodes are handed around
// as `Rc` so a mutated cell is visible through every alias.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::number::Number;
use crate::runtime::values::Function;

pub type ExprRef = Rc<Expr>;

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A whole program: the ordered top-level forms.
#[derive(Debug, Clone)]
pub struct Program {
    pub forms: Vec<ExprRef>,
}

#[derive(Debug)]
pub enum Expr {
    // Data kinds. These are self-evaluating (or, for symbols and pairs,
    // produced by quotation) and are what the list/vector mutators act on.
    Number(Number),
    String(String),
    Boolean(bool),
    Character(char),
    Symbol(Symbol),
    Pair(RefCell<ExprRef>, RefCell<ExprRef>),
    Empty,
    Vector(RefCell<Vec<ExprRef>>),
    /// A procedure stored into a data structure; the captured environment
    /// rides along with it.
    Procedure(Function),
    /// The unspecified value, when a data slot absorbs one.
    Unspecified,

    // Syntax kinds, produced by the parser's lowering pass.
    Variable(Symbol),
    Quote(ExprRef),
    Quasiquote(ExprRef),
    Sequence(Vec<ExprRef>),
    Cond(CondExpr),
    Lambda(LambdaExpr),
    Letrec(LetrecExpr),
    Set(SetExpr),
    SetCar(SetSlotExpr),
    SetCdr(SetSlotExpr),
    VectorSet(VectorSetExpr),
    Do(DoExpr),
    Define(DefineExpr),
    Application(ApplicationExpr),
    Apply(ApplyExpr),
    Eval(EvalExpr),
    And(Vec<ExprRef>),
    Or(Vec<ExprRef>),
}

#[derive(Debug, Clone)]
pub struct CondClause {
    pub test: ExprRef,
    pub body: ExprRef,
}

#[derive(Debug, Clone)]
pub struct CondExpr {
    pub clauses: Vec<CondClause>,
    pub else_branch: Option<ExprRef>,
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub params: Vec<Symbol>,
    pub body: ExprRef,
}

#[derive(Debug, Clone)]
pub struct LetBinding {
    pub name: Symbol,
    pub value: ExprRef,
}

#[derive(Debug, Clone)]
pub struct LetrecExpr {
    pub bindings: Vec<LetBinding>,
    pub body: ExprRef,
}

#[derive(Debug, Clone)]
pub struct SetExpr {
    pub name: Symbol,
    pub value: ExprRef,
}

/// `set-car!` / `set-cdr!`: a target pair expression and the new slot value.
#[derive(Debug, Clone)]
pub struct SetSlotExpr {
    pub target: ExprRef,
    pub value: ExprRef,
}

#[derive(Debug, Clone)]
pub struct VectorSetExpr {
    pub target: ExprRef,
    pub index: ExprRef,
    pub value: ExprRef,
}

#[derive(Debug, Clone)]
pub struct DoBinding {
    pub name: Symbol,
    pub init: ExprRef,
    pub step: Option<ExprRef>,
}

#[derive(Debug, Clone)]
pub struct DoExpr {
    pub bindings: Vec<DoBinding>,
    pub test: ExprRef,
    pub result_exprs: Vec<ExprRef>,
    pub body: Vec<ExprRef>,
}

#[derive(Debug, Clone)]
pub struct DefineExpr {
    pub name: Symbol,
    pub value: ExprRef,
}

#[derive(Debug, Clone)]
pub struct ApplicationExpr {
    pub operator: ExprRef,
    pub operands: Vec<ExprRef>,
}

#[derive(Debug, Clone)]
pub struct ApplyExpr {
    pub procedure: ExprRef,
    pub arguments: ExprRef,
}

#[derive(Debug, Clone)]
pub struct EvalExpr {
    pub expression: ExprRef,
}

thread_local! {
    // One canonical empty list per process; `eq?` and the printer rely on
    // every `()` being this cell.
    static EMPTY_LIST: ExprRef = Rc::new(Expr::Empty);
}

impl Expr {
    pub fn empty_list() -> ExprRef {
        EMPTY_LIST.with(|e| e.clone())
    }

    pub fn cons(car: ExprRef, cdr: ExprRef) -> ExprRef {
        Rc::new(Expr::Pair(RefCell::new(car), RefCell::new(cdr)))
    }

    /// Build a proper list out of the given elements.
    pub fn list_from(items: Vec<ExprRef>) -> ExprRef {
        let mut tail = Self::empty_list();
        for item in items.into_iter().rev() {
            tail = Self::cons(item, tail);
        }
        tail
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Expr::Pair(_, _))
    }

    pub fn car(&self) -> Option<ExprRef> {
        match self {
            Expr::Pair(car, _) => Some(car.borrow().clone()),
            _ => None,
        }
    }

    pub fn cdr(&self) -> Option<ExprRef> {
        match self {
            Expr::Pair(_, cdr) => Some(cdr.borrow().clone()),
            _ => None,
        }
    }

    pub fn set_car(&self, value: ExprRef) -> bool {
        match self {
            Expr::Pair(car, _) => {
                *car.borrow_mut() = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_cdr(&self, value: ExprRef) -> bool {
        match self {
            Expr::Pair(_, cdr) => {
                *cdr.borrow_mut() = value;
                true
            }
            _ => false,
        }
    }

    /// True when the cdr chain terminates in the empty list. Cyclic chains
    /// are not proper.
    pub fn is_proper_list(&self) -> bool {
        self.list_elements().is_some()
    }

    /// Collect a proper list's elements. `None` for improper or cyclic chains.
    pub fn list_elements(&self) -> Option<Vec<ExprRef>> {
        let mut seen: HashSet<*const Expr> = HashSet::new();
        let mut items = Vec::new();
        let mut cursor: ExprRef = match self {
            Expr::Empty => return Some(items),
            Expr::Pair(car, cdr) => {
                seen.insert(self as *const Expr);
                items.push(car.borrow().clone());
                cdr.borrow().clone()
            }
            _ => return None,
        };
        loop {
            let next = match &*cursor {
                Expr::Empty => return Some(items),
                Expr::Pair(car, cdr) => {
                    if !seen.insert(Rc::as_ptr(&cursor)) {
                        return None;
                    }
                    items.push(car.borrow().clone());
                    cdr.borrow().clone()
                }
                _ => return None,
            };
            cursor = next;
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Expr::Number(_) => "number",
            Expr::String(_) => "string",
            Expr::Boolean(_) => "boolean",
            Expr::Character(_) => "char",
            Expr::Symbol(_) => "symbol",
            Expr::Pair(_, _) => "pair",
            Expr::Empty => "()",
            Expr::Vector(_) => "vector",
            Expr::Procedure(_) => "procedure",
            Expr::Unspecified => "unspecified",
            Expr::Variable(_) => "variable",
            Expr::Quote(_) | Expr::Quasiquote(_) => "quoted datum",
            Expr::Sequence(_) => "begin",
            Expr::Cond(_) => "cond",
            Expr::Lambda(_) => "lambda",
            Expr::Letrec(_) => "letrec",
            Expr::Set(_) => "set!",
            Expr::SetCar(_) => "set-car!",
            Expr::SetCdr(_) => "set-cdr!",
            Expr::VectorSet(_) => "vector-set!",
            Expr::Do(_) => "do",
            Expr::Define(_) => "define",
            Expr::Application(_) => "application",
            Expr::Apply(_) => "apply",
            Expr::Eval(_) => "eval",
            Expr::And(_) => "and",
            Expr::Or(_) => "or",
        }
    }
}

/// Structural equality over data, the `equal?` relation. Pairs and vectors
/// compare element-wise; a revisited pair of cells proves a cycle, which
/// cannot produce a finite distinguishing path, so it compares equal.
pub fn datum_equal(a: &ExprRef, b: &ExprRef) -> bool {
    fn go(a: &ExprRef, b: &ExprRef, seen: &mut HashSet<(*const Expr, *const Expr)>) -> bool {
        match (&**a, &**b) {
            (Expr::Number(x), Expr::Number(y)) => x == y,
            (Expr::String(x), Expr::String(y)) => x == y,
            (Expr::Boolean(x), Expr::Boolean(y)) => x == y,
            (Expr::Character(x), Expr::Character(y)) => x == y,
            (Expr::Symbol(x), Expr::Symbol(y)) => x == y,
            (Expr::Variable(x), Expr::Variable(y)) => x == y,
            (Expr::Symbol(x), Expr::Variable(y)) | (Expr::Variable(x), Expr::Symbol(y)) => x == y,
            (Expr::Empty, Expr::Empty) => true,
            (Expr::Procedure(x), Expr::Procedure(y)) => x == y,
            (Expr::Pair(ac, ad), Expr::Pair(bc, bd)) => {
                if !seen.insert((Rc::as_ptr(a), Rc::as_ptr(b))) {
                    return true;
                }
                let (ac, ad) = (ac.borrow().clone(), ad.borrow().clone());
                let (bc, bd) = (bc.borrow().clone(), bd.borrow().clone());
                go(&ac, &bc, seen) && go(&ad, &bd, seen)
            }
            (Expr::Vector(xs), Expr::Vector(ys)) => {
                if !seen.insert((Rc::as_ptr(a), Rc::as_ptr(b))) {
                    return true;
                }
                let (xs, ys) = (xs.borrow().clone(), ys.borrow().clone());
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| go(x, y, seen))
            }
            _ => false,
        }
    }
    go(a, b, &mut HashSet::new())
}

/// Identity-flavored equality, the `eq?` relation: reference identity for
/// pairs and vectors, value equality for atoms.
pub fn datum_eq(a: &ExprRef, b: &ExprRef) -> bool {
    match (&**a, &**b) {
        (Expr::Pair(_, _), Expr::Pair(_, _)) | (Expr::Vector(_), Expr::Vector(_)) => {
            Rc::ptr_eq(a, b)
        }
        (Expr::Empty, Expr::Empty) => true,
        (Expr::Number(x), Expr::Number(y)) => x == y,
        (Expr::String(x), Expr::String(y)) => x == y,
        (Expr::Boolean(x), Expr::Boolean(y)) => x == y,
        (Expr::Character(x), Expr::Character(y)) => x == y,
        (Expr::Symbol(x), Expr::Symbol(y)) => x == y,
        (Expr::Variable(x), Expr::Variable(y)) => x == y,
        (Expr::Symbol(x), Expr::Variable(y)) | (Expr::Variable(x), Expr::Symbol(y)) => x == y,
        (Expr::Procedure(x), Expr::Procedure(y)) => x == y,
        _ => false,
    }
}

/// Render a datum in display syntax: raw strings and characters, `(a b . c)`
/// dotted tails, `#(...)` vectors. Cells revisited on the current path (a
/// cycle built with the pair mutators) print as `...`.
pub fn write_datum(out: &mut String, datum: &ExprRef) {
    let mut on_path: HashSet<*const Expr> = HashSet::new();
    write_datum_inner(out, datum, &mut on_path);
}

fn write_datum_inner(out: &mut String, datum: &ExprRef, on_path: &mut HashSet<*const Expr>) {
    match &**datum {
        Expr::Number(n) => out.push_str(&n.to_string()),
        Expr::String(s) => out.push_str(s),
        Expr::Boolean(b) => out.push_str(if *b { "#t" } else { "#f" }),
        Expr::Character(c) => out.push(*c),
        Expr::Symbol(s) | Expr::Variable(s) => out.push_str(&s.0),
        Expr::Empty => out.push_str("()"),
        Expr::Procedure(f) => out.push_str(&f.display_marker()),
        Expr::Unspecified => out.push_str("#<unspecified>"),
        Expr::Pair(_, _) => {
            out.push('(');
            // Spine cells stay marked until the whole list is written so a
            // cycle back into any of them is caught; they are unmarked on the
            // way out so shared (acyclic) structure prints normally.
            let mut spine: Vec<*const Expr> = Vec::new();
            let mut cursor = datum.clone();
            loop {
                let ptr = Rc::as_ptr(&cursor);
                if !on_path.insert(ptr) {
                    out.push_str("...");
                    break;
                }
                spine.push(ptr);
                let (car, cdr) = match &*cursor {
                    Expr::Pair(car, cdr) => (car.borrow().clone(), cdr.borrow().clone()),
                    _ => unreachable!(),
                };
                write_datum_inner(out, &car, on_path);
                if cdr.is_empty_list() {
                    break;
                }
                if cdr.is_pair() {
                    out.push(' ');
                    cursor = cdr;
                    continue;
                }
                out.push_str(" . ");
                write_datum_inner(out, &cdr, on_path);
                break;
            }
            for ptr in spine {
                on_path.remove(&ptr);
            }
            out.push(')');
        }
        Expr::Vector(items) => {
            let ptr = Rc::as_ptr(datum);
            if !on_path.insert(ptr) {
                out.push_str("...");
                return;
            }
            out.push_str("#(");
            let items = items.borrow().clone();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_datum_inner(out, item, on_path);
            }
            out.push(')');
            on_path.remove(&ptr);
        }
        _ => out.push_str("#<syntax>"),
    }
}
