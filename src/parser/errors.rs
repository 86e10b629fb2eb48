// Parse errors, including conversion from pest's error type.

use std::fmt;

use super::Rule;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Bad surface syntax, reported by pest with location context.
    Syntax { message: String },
    /// A structurally valid s-expression that is not a valid form, e.g.
    /// `(lambda)` or a dotted tail in expression position.
    MalformedForm { form: String, message: String },
}

impl ParseError {
    pub fn malformed(form: &str, message: impl Into<String>) -> ParseError {
        ParseError::MalformedForm {
            form: form.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { message } => write!(f, "parse error: {}", message),
            ParseError::MalformedForm { form, message } => {
                write!(f, "malformed {}: {}", form, message)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Syntax {
            message: err.to_string(),
        }
    }
}
