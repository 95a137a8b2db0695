//! Token handling for text that is already normalized upstream.
//!
//! Corpus files hold lemmatized, lowercased tokens separated by whitespace,
//! so nothing here stems or filters stop words.

/// Split a normalized token file into its tokens, repetitions preserved.
pub fn corpus_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Terms of a free-text ranked query: lowercased and whitespace-separated.
pub fn query_terms(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}
