//! Vector-space ranking: documents and queries become dense TF-IDF vectors
//! over the sorted vocabulary and are compared by cosine similarity.

use crate::index::{compare_doc_ids, DocId, DocMeta, InvertedIndex, Term};
use crate::stats::{Statistics, TermWeights};
use crate::tokenizer::query_terms;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

pub const DEFAULT_TOP_K: usize = 10;

pub type DocumentVector = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingConfig {
    pub top_k: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

/// Sorted distinct terms; a term's position is its vector dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    terms: Vec<Term>,
    positions: HashMap<Term, usize>,
}

impl Vocabulary {
    pub fn from_index(index: &InvertedIndex) -> Self {
        Self::from_terms(index.sorted_terms().into_iter().map(str::to_string))
    }

    /// Any order in, sorted and deduplicated out.
    pub fn from_terms<I: IntoIterator<Item = Term>>(terms: I) -> Self {
        let mut terms: Vec<Term> = terms.into_iter().collect();
        terms.sort_unstable();
        terms.dedup();
        let positions = terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        Self { terms, positions }
    }

    pub fn position(&self, term: &str) -> Option<usize> {
        self.positions.get(term).copied()
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Dense vector with `weights` placed at their term positions; unknown terms are ignored.
    pub fn densify<'a, I>(&self, weights: I) -> DocumentVector
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut v = vec![0.0; self.len()];
        for (term, w) in weights {
            if let Some(pos) = self.position(term) {
                v[pos] = w;
            }
        }
        v
    }
}

/// Cosine of the angle between `a` and `b`, 0 when either has zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f64,
    pub url: String,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc: {}\tscore: {:.6}\turl: {}", self.doc_id, self.score, self.url)
    }
}

#[derive(Debug)]
pub struct VectorEngine {
    vocabulary: Vocabulary,
    idf: TermWeights,
    tfidf: BTreeMap<DocId, TermWeights>,
    urls: HashMap<DocId, String>,
    config: RankingConfig,
    vectors: OnceLock<Vec<(DocId, DocumentVector)>>,
}

impl VectorEngine {
    pub fn new(vocabulary: Vocabulary, idf: TermWeights, tfidf: BTreeMap<DocId, TermWeights>, docs: &[DocMeta], config: RankingConfig) -> Self {
        let urls = docs.iter().map(|d| (d.id.clone(), d.url.clone())).collect();
        Self { vocabulary, idf, tfidf, urls, config, vectors: OnceLock::new() }
    }

    pub fn from_statistics(index: &InvertedIndex, stats: &Statistics, docs: &[DocMeta], config: RankingConfig) -> Self {
        Self::new(Vocabulary::from_index(index), stats.idf.clone(), stats.tfidf.clone(), docs, config)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn num_docs(&self) -> usize {
        self.tfidf.len()
    }

    pub fn url(&self, doc_id: &str) -> Option<&str> {
        self.urls.get(doc_id).map(String::as_str)
    }

    /// Dense TF-IDF vector of one document, `None` for a document with no weights.
    pub fn document_vector(&self, doc_id: &str) -> Option<DocumentVector> {
        let weights = self.tfidf.get(doc_id)?;
        Some(self.vocabulary.densify(weights.iter().map(|(t, w)| (t.as_str(), *w))))
    }

    fn document_vectors(&self) -> &[(DocId, DocumentVector)] {
        self.vectors.get_or_init(|| {
            let vectors: Vec<_> = self
                .tfidf
                .iter()
                .map(|(id, weights)| (id.clone(), self.vocabulary.densify(weights.iter().map(|(t, w)| (t.as_str(), *w)))))
                .collect();
            tracing::debug!(documents = vectors.len(), dimensions = self.vocabulary.len(), "document vectors built");
            vectors
        })
    }

    /// Query term counts weighted by IDF and divided by the query length.
    /// Terms with no IDF or outside the vocabulary are dropped.
    pub fn query_vector(&self, query: &str) -> DocumentVector {
        let terms = query_terms(query);
        let total = terms.len() as f64;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for term in &terms {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
        self.vocabulary.densify(counts.into_iter().filter_map(|(term, count)| {
            let idf = self.idf.get(term)?;
            Some((term, count as f64 * idf / total))
        }))
    }

    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_top(query, self.config.top_k)
    }

    /// Best `k` documents by cosine similarity; non-positive scores are dropped.
    pub fn search_top(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let q = self.query_vector(query);
        let mut results: Vec<SearchResult> = self
            .document_vectors()
            .iter()
            .filter_map(|(doc_id, v)| {
                let score = cosine_similarity(&q, v);
                (score > 0.0).then(|| SearchResult {
                    doc_id: doc_id.clone(),
                    score,
                    url: self.url(doc_id).unwrap_or_default().to_string(),
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| compare_doc_ids(&a.doc_id, &b.doc_id))
        });
        results.truncate(k);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;
    use crate::stats::{StatisticsBuilder, StatsConfig};

    fn engine(top_k: usize) -> VectorEngine {
        let corpus = [
            ("1", vec!["cat", "dog", "cat"]),
            ("2", vec!["dog", "bird"]),
            ("3", vec!["cat", "bird", "bird"]),
        ];
        let mut ib = IndexBuilder::new();
        let mut sb = StatisticsBuilder::new(StatsConfig::default());
        let mut docs = Vec::new();
        for (id, tokens) in &corpus {
            ib.add_document(id, tokens);
            sb.add_document(id, tokens);
            docs.push(DocMeta { id: id.to_string(), url: format!("https://pets.example/{id}") });
        }
        let index = ib.finish();
        let stats = sb.finish(&index);
        VectorEngine::from_statistics(&index, &stats, &docs, RankingConfig { top_k })
    }

    #[test]
    fn cosine_edge_cases() {
        let v = [0.3, 1.2, 0.0, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&v, &[0.0; 4]), 0.0);
        assert_eq!(cosine_similarity(&[0.0; 4], &[0.0; 4]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn vocabulary_order_is_sorted() {
        let vocab = Vocabulary::from_terms(vec!["dog".to_string(), "bird".to_string(), "cat".to_string(), "dog".to_string()]);
        assert_eq!(vocab.terms(), &["bird", "cat", "dog"]);
        assert_eq!(vocab.position("dog"), Some(2));
        assert_eq!(vocab.position("cow"), None);
        assert_eq!(engine(10).vocabulary(), &vocab);
    }

    #[test]
    fn document_vector_is_zero_where_absent() {
        let e = engine(10);
        let v = e.document_vector("2").unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v[1], 0.0);
        assert!(v[0] > 0.0 && v[2] > 0.0);
        assert!(e.document_vector("404").is_none());
        assert_eq!(e.num_docs(), 3);
    }

    #[test]
    fn query_vector_drops_unknown_terms() {
        let e = engine(10);
        let q = e.query_vector("CAT unicorn");
        let idf_cat = (3.0f64 / 2.0).ln();
        assert!((q[1] - idf_cat / 2.0).abs() < 1e-12);
        assert_eq!(q[0], 0.0);
        assert!(e.query_vector("unicorn").iter().all(|w| *w == 0.0));
    }

    #[test]
    fn ranks_by_cosine() {
        let e = engine(10);
        let results = e.search("cat");
        let ids: Vec<&str> = results.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!((results[0].score - 2.0 / 5f64.sqrt()).abs() < 1e-9);
        assert_eq!(results[0].url, "https://pets.example/1");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(results.iter().all(|r| r.score > 0.0 && r.score <= 1.0));
    }

    #[test]
    fn ties_break_on_doc_id_and_k_truncates() {
        let e = engine(1);
        let all = e.search_top("dog bird", 10);
        assert_eq!(all.len(), 3);
        let top = e.search("dog bird");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0], all[0]);
        assert!(e.search("").is_empty());
        assert!(e.search("unicorn").is_empty());
    }

    #[test]
    fn result_line_format() {
        let r = SearchResult { doc_id: "4".into(), score: 0.5, url: "https://x.example".into() };
        assert_eq!(r.to_string(), "doc: 4\tscore: 0.500000\turl: https://x.example");
    }
}
