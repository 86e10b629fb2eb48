// Builds datum trees out of pest pairs. Quote abbreviations expand to
// `(quote d)` / `(quasiquote d)` lists so the lowering pass sees one shape.

use std::cell::RefCell;
use std::rc::Rc;

use pest::iterators::Pair;

use super::errors::ParseError;
use super::Rule;
use crate::ast::{Expr, ExprRef, Symbol};
use crate::number::Number;

pub(super) fn build_datum(pair: Pair<Rule>) -> Result<ExprRef, ParseError> {
    match pair.as_rule() {
        Rule::number => {
            let text = pair.as_str();
            let n = Number::parse(text).ok_or_else(|| ParseError::Syntax {
                message: format!("invalid number literal: {}", text),
            })?;
            Ok(Rc::new(Expr::Number(n)))
        }
        Rule::boolean => {
            // #t / #true / #f / #false, case-insensitive letters.
            let truth = pair
                .as_str()
                .chars()
                .nth(1)
                .map(|c| c.eq_ignore_ascii_case(&'t'))
                .unwrap_or(false);
            Ok(Rc::new(Expr::Boolean(truth)))
        }
        Rule::character => {
            let c = pair.as_str().chars().nth(2).ok_or_else(|| ParseError::Syntax {
                message: "empty character literal".to_string(),
            })?;
            Ok(Rc::new(Expr::Character(c)))
        }
        Rule::string => {
            let raw = pair.as_str();
            let inner = &raw[1..raw.len() - 1];
            Ok(Rc::new(Expr::String(unescape(inner))))
        }
        Rule::identifier => Ok(Rc::new(Expr::Symbol(Symbol::new(pair.as_str())))),
        Rule::quoted => {
            let inner = build_datum(first_inner(pair)?)?;
            Ok(abbreviation("quote", inner))
        }
        Rule::quasiquoted => {
            let inner = build_datum(first_inner(pair)?)?;
            Ok(abbreviation("quasiquote", inner))
        }
        Rule::vector => {
            let items = pair
                .into_inner()
                .map(build_datum)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Rc::new(Expr::Vector(RefCell::new(items))))
        }
        Rule::list => build_list(pair),
        rule => Err(ParseError::Syntax {
            message: format!("unexpected rule {:?}", rule),
        }),
    }
}

fn build_list(pair: Pair<Rule>) -> Result<ExprRef, ParseError> {
    let mut items = Vec::new();
    let mut tail: Option<ExprRef> = None;
    let mut after_dot = false;
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::dot {
            if items.is_empty() {
                return Err(ParseError::malformed("list", "dotted tail with no head"));
            }
            after_dot = true;
            continue;
        }
        let datum = build_datum(inner)?;
        if after_dot {
            tail = Some(datum);
            after_dot = false;
        } else {
            items.push(datum);
        }
    }

    let mut chain = tail.unwrap_or_else(Expr::empty_list);
    for item in items.into_iter().rev() {
        chain = Expr::cons(item, chain);
    }
    Ok(chain)
}

fn abbreviation(keyword: &str, datum: ExprRef) -> ExprRef {
    Expr::list_from(vec![Rc::new(Expr::Symbol(Symbol::new(keyword))), datum])
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, ParseError> {
    pair.into_inner().next().ok_or_else(|| ParseError::Syntax {
        message: "expected a datum".to_string(),
    })
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    out
}
