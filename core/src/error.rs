use thiserror::Error;

/// Why a boolean query could not be turned into an expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// `&` or `|` without two operands.
    MissingOperands,
    /// `!` with nothing to negate.
    MissingNegatedTerm,
    /// `!` applied to something other than a single term, e.g. `!!a`.
    /// Rejected rather than evaluated as the whole universe.
    NegatedExpression,
    /// No terms at all.
    Empty,
    /// Operands left over after every operator was applied.
    DanglingOperands,
}

/// Recoverable errors produced while evaluating a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("failed to tokenize query: {0}")]
    Tokenize(String),
    #[error("malformed query: {}", .0.describe())]
    Malformed(MalformedKind),
}

impl MalformedKind {
    fn describe(&self) -> &'static str {
        match self {
            Self::MissingOperands => "binary operator needs an operand on each side",
            Self::MissingNegatedTerm => "no term found after '!'",
            Self::NegatedExpression => "'!' can only negate a single term",
            Self::Empty => "query contains no terms",
            Self::DanglingOperands => "terms must be joined with '&' or '|'",
        }
    }
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Tokenize(_) => "QUERY_TOKENIZE",
            Self::Malformed(_) => "QUERY_MALFORMED",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "error": self.to_string(),
        })
    }
}
