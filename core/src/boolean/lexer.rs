use crate::error::QueryError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    // A term is a maximal run of letters; anything unmatched is dropped.
    static ref QUERY_RE: Regex = Regex::new(r"!|\p{L}+|[&|]").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Not,
    And,
    Or,
}

impl Operator {
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Not => 3,
            Operator::And => 2,
            Operator::Or => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Not => '!',
            Operator::And => '&',
            Operator::Or => '|',
        }
    }

    fn from_match(s: &str) -> Option<Self> {
        match s {
            "!" => Some(Operator::Not),
            "&" => Some(Operator::And),
            "|" => Some(Operator::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Term(String),
    Op(Operator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Term(t) => f.write_str(t),
            Token::Op(op) => write!(f, "{}", op.symbol()),
        }
    }
}

/// Split a boolean query into terms and operators.
pub fn tokenize(query: &str) -> Vec<Token> {
    QUERY_RE
        .find_iter(query)
        .map(|m| match Operator::from_match(m.as_str()) {
            Some(op) => Token::Op(op),
            None => Token::Term(m.as_str().to_string()),
        })
        .collect()
}

/// Like [`tokenize`], for input read straight off a byte stream.
pub fn tokenize_bytes(raw: &[u8]) -> Result<Vec<Token>, QueryError> {
    let query = std::str::from_utf8(raw).map_err(|e| QueryError::Tokenize(e.to_string()))?;
    Ok(tokenize(query))
}
