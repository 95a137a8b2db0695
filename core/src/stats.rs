use crate::index::{DocId, InvertedIndex, Term};
use std::collections::BTreeMap;

pub type TermWeights = BTreeMap<Term, f64>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsConfig {
    /// Use ln(1 + N/df) instead of ln(N/df).
    pub smoothed_idf: bool,
}

/// TF, IDF and TF-IDF tables of one corpus snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub tf: BTreeMap<DocId, TermWeights>,
    pub idf: TermWeights,
    /// Only (document, term) pairs present in the postings.
    pub tfidf: BTreeMap<DocId, TermWeights>,
}

impl Statistics {
    pub fn tf(&self, doc: &str, term: &str) -> Option<f64> {
        self.tf.get(doc)?.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    pub fn tfidf(&self, doc: &str, term: &str) -> Option<f64> {
        self.tfidf.get(doc)?.get(term).copied()
    }
}

/// Relative frequency of each distinct token. Empty input gives an empty map.
pub fn term_frequencies<S: AsRef<str>>(tokens: &[S]) -> TermWeights {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_ref()).or_insert(0) += 1;
    }
    let total = tokens.len() as f64;
    counts
        .into_iter()
        .map(|(term, count)| (term.to_string(), count as f64 / total))
        .collect()
}

pub fn inverse_document_frequency(num_docs: usize, doc_freq: usize, config: StatsConfig) -> f64 {
    let ratio = num_docs as f64 / doc_freq.max(1) as f64;
    if config.smoothed_idf {
        (1.0 + ratio).ln()
    } else {
        ratio.ln()
    }
}

/// IDF of every indexed term, with N taken as the size of the universe.
pub fn idf_table(index: &InvertedIndex, config: StatsConfig) -> TermWeights {
    let n = index.num_docs();
    index
        .iter()
        .map(|(term, ids)| (term.clone(), inverse_document_frequency(n, ids.len(), config)))
        .collect()
}

/// Collects per-document term frequencies, then joins them with an index.
#[derive(Debug, Default)]
pub struct StatisticsBuilder {
    config: StatsConfig,
    tf: BTreeMap<DocId, TermWeights>,
}

impl StatisticsBuilder {
    pub fn new(config: StatsConfig) -> Self {
        Self { config, tf: BTreeMap::new() }
    }

    /// Takes the raw stream: repetitions count.
    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: &str, tokens: &[S]) {
        self.add_frequencies(doc_id.to_string(), term_frequencies(tokens));
    }

    /// For frequencies computed elsewhere, e.g. on a worker thread.
    pub fn add_frequencies(&mut self, doc_id: DocId, tf: TermWeights) {
        self.tf.insert(doc_id, tf);
    }

    pub fn documents(&self) -> usize {
        self.tf.len()
    }

    pub fn finish(self, index: &InvertedIndex) -> Statistics {
        let idf = idf_table(index, self.config);
        let mut tfidf: BTreeMap<DocId, TermWeights> = BTreeMap::new();
        let mut missing = 0usize;

        for (term, ids) in index.iter() {
            let term_idf = idf.get(term).copied().unwrap_or_default();
            for id in ids {
                match self.tf.get(id).and_then(|weights| weights.get(term)) {
                    Some(tf) => {
                        tfidf.entry(id.clone()).or_default().insert(term.clone(), tf * term_idf);
                    }
                    None => missing += 1,
                }
            }
        }
        if missing > 0 {
            tracing::warn!(missing, "postings without term frequencies were left out of tf-idf");
        }
        tracing::info!(documents = self.tf.len(), terms = idf.len(), "statistics computed");

        Statistics { tf: self.tf, idf, tfidf }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;

    const EPS: f64 = 1e-12;

    fn corpus() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("1", vec!["cat", "dog", "cat"]),
            ("2", vec!["dog", "bird"]),
            ("3", vec!["cat", "bird", "bird"]),
        ]
    }

    fn build(config: StatsConfig) -> (InvertedIndex, Statistics) {
        let mut ib = IndexBuilder::new();
        let mut sb = StatisticsBuilder::new(config);
        for (id, tokens) in corpus() {
            ib.add_document(id, &tokens);
            sb.add_document(id, &tokens);
        }
        let index = ib.finish();
        let stats = sb.finish(&index);
        (index, stats)
    }

    #[test]
    fn tf_is_relative_count() {
        let (_, s) = build(StatsConfig::default());
        assert!((s.tf("1", "cat").unwrap() - 2.0 / 3.0).abs() < EPS);
        assert!((s.tf("1", "dog").unwrap() - 1.0 / 3.0).abs() < EPS);
        assert_eq!(s.tf("1", "bird"), None);
    }

    #[test]
    fn tf_sums_to_one() {
        let (_, s) = build(StatsConfig::default());
        for weights in s.tf.values() {
            let sum: f64 = weights.values().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        assert!(term_frequencies::<&str>(&[]).is_empty());
    }

    #[test]
    fn idf_uses_natural_log() {
        let (_, s) = build(StatsConfig::default());
        assert!((s.idf("cat").unwrap() - (3.0f64 / 2.0).ln()).abs() < EPS);
        let (_, smoothed) = build(StatsConfig { smoothed_idf: true });
        assert!((smoothed.idf("cat").unwrap() - (1.0 + 3.0f64 / 2.0).ln()).abs() < EPS);
    }

    #[test]
    fn idf_does_not_grow_with_document_frequency() {
        let mut dfs: Vec<(usize, f64)> = (1..=10).map(|df| (df, inverse_document_frequency(10, df, StatsConfig::default()))).collect();
        dfs.sort_by_key(|(df, _)| *df);
        for pair in dfs.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(inverse_document_frequency(10, 10, StatsConfig::default()), 0.0);
    }

    #[test]
    fn tfidf_is_sparse_product() {
        let (index, s) = build(StatsConfig::default());
        let expected = 2.0 / 3.0 * (3.0f64 / 2.0).ln();
        assert!((s.tfidf("1", "cat").unwrap() - expected).abs() < EPS);
        assert_eq!(s.tfidf("2", "cat"), None);
        let pairs: usize = s.tfidf.values().map(BTreeMap::len).sum();
        let postings: usize = index.iter().map(|(_, ids)| ids.len()).sum();
        assert_eq!(pairs, postings);
    }

    #[test]
    fn postings_without_tokens_are_skipped() {
        let mut ib = IndexBuilder::new();
        ib.add_document("1", ["cat"]);
        ib.add_document("2", ["cat", "dog"]);
        let index = ib.finish();
        let mut sb = StatisticsBuilder::new(StatsConfig::default());
        sb.add_document("1", &["cat"]);
        let s = sb.finish(&index);
        assert!(s.tfidf.contains_key("1"));
        assert!(!s.tfidf.contains_key("2"));
        assert_eq!(s.idf.len(), 2);
    }
}
