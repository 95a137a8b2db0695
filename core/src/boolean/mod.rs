//! Boolean retrieval over an [`InvertedIndex`].
//!
//! A query goes through three stages: [`lexer::tokenize`] splits it into terms
//! and the operators `!`, `&`, `|`; [`parser::to_postfix`] orders them by
//! precedence (`!` > `&` > `|`, no parentheses); [`parser::build_tree`] turns
//! the postfix form into an [`Expr`]. Evaluation is plain set algebra, with
//! negation taken against the index universe.

pub mod lexer;
pub mod parser;

pub use parser::Expr;

use crate::error::QueryError;
use crate::index::{sort_doc_ids, DocId, InvertedIndex};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct BooleanEngine {
    index: InvertedIndex,
}

impl BooleanEngine {
    pub fn new(index: InvertedIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn parse(query: &str) -> Result<Expr, QueryError> {
        parser::build_tree(parser::to_postfix(lexer::tokenize(query)))
    }

    /// Documents matching `query`, unordered.
    pub fn search(&self, query: &str) -> Result<HashSet<DocId>, QueryError> {
        let expr = Self::parse(query)?;
        tracing::debug!(%expr, "evaluating boolean query");
        Ok(self.evaluate(&expr).into_iter().map(str::to_string).collect())
    }

    /// Same as [`BooleanEngine::search`] for raw, possibly non UTF-8, input.
    pub fn search_bytes(&self, raw: &[u8]) -> Result<HashSet<DocId>, QueryError> {
        let tokens = lexer::tokenize_bytes(raw)?;
        let expr = parser::build_tree(parser::to_postfix(tokens))?;
        Ok(self.evaluate(&expr).into_iter().map(str::to_string).collect())
    }

    /// Matching ids in presentation order (numeric-aware).
    pub fn search_sorted(&self, query: &str) -> Result<Vec<DocId>, QueryError> {
        let expr = Self::parse(query)?;
        let hits = self.evaluate(&expr);
        Ok(sort_doc_ids(hits).into_iter().map(str::to_string).collect())
    }

    pub fn evaluate<'a>(&'a self, expr: &Expr) -> HashSet<&'a str> {
        match expr {
            Expr::Term(term) => self.term_set(term),
            Expr::Not(term) => self.complement(term),
            Expr::And(left, right) => {
                let (left, right) = (self.evaluate(left), self.evaluate(right));
                let (small, large) = if left.len() <= right.len() { (left, right) } else { (right, left) };
                small.into_iter().filter(|doc| large.contains(doc)).collect()
            }
            Expr::Or(left, right) => {
                let mut out = self.evaluate(left);
                out.extend(self.evaluate(right));
                out
            }
        }
    }

    fn term_set(&self, term: &str) -> HashSet<&str> {
        self.index
            .postings(term)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn complement(&self, term: &str) -> HashSet<&str> {
        let excluded = self.index.postings(term);
        self.index
            .universe()
            .iter()
            .filter(|doc| excluded.map_or(true, |ids| !ids.contains(*doc)))
            .map(String::as_str)
            .collect()
    }
}
