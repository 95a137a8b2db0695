use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

pub type DocId = String;
pub type Term = String;

/// One entry of the corpus metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub id: DocId,
    pub url: String,
}

/// Term → set of documents containing it, plus the derived universe.
///
/// Posting sets carry no order. Anything that prints or vectorizes must go
/// through [`InvertedIndex::sorted_terms`] or [`InvertedIndex::sorted_postings`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<Term, HashSet<DocId>>,
    universe: HashSet<DocId>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an already materialized term → ids mapping (e.g. loaded from disk).
    /// Duplicate ids collapse and terms with no ids are dropped.
    pub fn from_postings<I, D>(postings: I) -> Self
    where
        I: IntoIterator<Item = (Term, D)>,
        D: IntoIterator<Item = DocId>,
    {
        let mut builder = IndexBuilder::new();
        for (term, ids) in postings {
            for id in ids {
                builder.insert(&term, &id);
            }
        }
        builder.finish()
    }

    /// Posting set of `term`; `None` when the term was never indexed.
    pub fn postings(&self, term: &str) -> Option<&HashSet<DocId>> {
        self.postings.get(term)
    }

    pub fn doc_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, HashSet::len)
    }

    pub fn universe(&self) -> &HashSet<DocId> {
        &self.universe
    }

    pub fn num_docs(&self) -> usize {
        self.universe.len()
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Term, &HashSet<DocId>)> {
        self.postings.iter()
    }

    /// Alphabetically sorted terms. This order is the vocabulary order.
    pub fn sorted_terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.postings.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }

    /// Deterministic view of the whole index: terms sorted, ids sorted with [`compare_doc_ids`].
    pub fn sorted_postings(&self) -> BTreeMap<&str, Vec<&str>> {
        self.postings
            .iter()
            .map(|(term, ids)| (term.as_str(), sort_doc_ids(ids.iter().map(String::as_str))))
            .collect()
    }

    fn rebuild_universe(&mut self) {
        self.universe = self.postings.values().flatten().cloned().collect();
    }
}

/// Accumulates postings one document at a time.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    postings: HashMap<Term, HashSet<DocId>>,
    documents: usize,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every distinct term of `tokens` for `doc_id`. Repeats are no-ops.
    pub fn add_document<I, S>(&mut self, doc_id: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.documents += 1;
        for token in tokens {
            let term = token.as_ref();
            if term.is_empty() {
                continue;
            }
            self.insert(term, doc_id);
        }
    }

    fn insert(&mut self, term: &str, doc_id: &str) {
        match self.postings.get_mut(term) {
            Some(ids) => {
                if !ids.contains(doc_id) {
                    ids.insert(doc_id.to_string());
                }
            }
            None => {
                let mut ids = HashSet::new();
                ids.insert(doc_id.to_string());
                self.postings.insert(term.to_string(), ids);
            }
        }
    }

    /// Number of `add_document` calls so far, including documents with no terms.
    pub fn documents_added(&self) -> usize {
        self.documents
    }

    pub fn finish(self) -> InvertedIndex {
        let mut index = InvertedIndex { postings: self.postings, universe: HashSet::new() };
        index.rebuild_universe();
        index
    }
}

/// [`IndexBuilder`] behind a lock, for producers running on several threads.
#[derive(Debug, Default)]
pub struct SharedIndexBuilder {
    inner: Mutex<IndexBuilder>,
}

impl SharedIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deduplicates locally first so the lock is held only for the merge.
    pub fn add_document<I, S>(&self, doc_id: &str, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_string()).collect();
        distinct.sort_unstable();
        distinct.dedup();
        self.inner.lock().add_document(doc_id, distinct);
    }

    pub fn documents_added(&self) -> usize {
        self.inner.lock().documents_added()
    }

    pub fn finish(self) -> InvertedIndex {
        self.inner.into_inner().finish()
    }
}

/// Numeric order when both ids parse as integers, otherwise byte order.
/// Numeric ids sort before non-numeric ones.
pub fn compare_doc_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn sort_doc_ids<'a, I>(ids: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<&str> = ids.into_iter().collect();
    out.sort_by(|a, b| compare_doc_ids(a, b));
    out
}
