use pest::Parser;

use crate::ast::{ExprRef, Program};

pub mod errors;
pub mod expressions;
pub mod special_forms;

pub use errors::ParseError;
pub use special_forms::expression_from_datum;

use expressions::build_datum;

#[derive(pest_derive::Parser)]
#[grammar = "microscheme.pest"]
pub struct MicroSchemeParser;

/// Parse a full program: every top-level form, in order.
pub fn parse(input: &str) -> Result<Program, ParseError> {
    let pairs = MicroSchemeParser::parse(Rule::program, input).map_err(ParseError::from)?;
    let program = pairs
        .peek()
        .expect("parse should have yielded one program rule");

    let mut forms = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        let datum = build_datum(pair)?;
        forms.push(expression_from_datum(&datum)?);
    }
    Ok(Program { forms })
}

/// Parse exactly one expression, for the REPL and tests.
pub fn parse_expression(input: &str) -> Result<ExprRef, ParseError> {
    let program = parse(input)?;
    match program.forms.len() {
        1 => Ok(program.forms.into_iter().next().unwrap()),
        n => Err(ParseError::Syntax {
            message: format!("expected a single expression, found {} forms", n),
        }),
    }
}
