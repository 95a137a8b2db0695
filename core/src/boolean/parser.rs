use super::lexer::{Operator, Token};
use crate::error::{MalformedKind, QueryError};
use std::fmt;

/// Boolean expression tree. Negation holds a term, never a sub-expression,
/// so `!!a` fails to parse with [`MalformedKind::NegatedExpression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Term(t) => f.write_str(t),
            Expr::Not(t) => write!(f, "!{t}"),
            Expr::And(l, r) => write!(f, "({l} & {r})"),
            Expr::Or(l, r) => write!(f, "({l} | {r})"),
        }
    }
}

/// Shunting-yard without parentheses. `!` is pushed as a prefix operator;
/// a binary operator first pops every stacked operator of equal or higher
/// precedence.
pub fn to_postfix(tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Operator> = Vec::new();

    for token in tokens {
        match token {
            Token::Op(Operator::Not) => operators.push(Operator::Not),
            Token::Op(op) => {
                while let Some(&top) = operators.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(Token::Op(top));
                    operators.pop();
                }
                operators.push(op);
            }
            term @ Token::Term(_) => output.push(term),
        }
    }

    while let Some(op) = operators.pop() {
        output.push(Token::Op(op));
    }
    output
}

pub fn build_tree(postfix: Vec<Token>) -> Result<Expr, QueryError> {
    let mut stack: Vec<Expr> = Vec::new();

    for token in postfix {
        let node = match token {
            Token::Term(t) => Expr::Term(t),
            Token::Op(Operator::Not) => match stack.pop() {
                Some(Expr::Term(t)) => Expr::Not(t),
                Some(_) => return Err(QueryError::Malformed(MalformedKind::NegatedExpression)),
                None => return Err(QueryError::Malformed(MalformedKind::MissingNegatedTerm)),
            },
            Token::Op(op) => {
                let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                    return Err(QueryError::Malformed(MalformedKind::MissingOperands));
                };
                let (left, right) = (Box::new(left), Box::new(right));
                match op {
                    Operator::And => Expr::And(left, right),
                    _ => Expr::Or(left, right),
                }
            }
        };
        stack.push(node);
    }

    match stack.len() {
        0 => Err(QueryError::Malformed(MalformedKind::Empty)),
        1 => Ok(stack.remove(0)),
        _ => Err(QueryError::Malformed(MalformedKind::DanglingOperands)),
    }
}
