use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry_core::persist::{load_index, save_index, save_index_text, save_meta, save_statistics, IndexMeta, IndexPaths};
use quarry_core::stats::{term_frequencies, TermWeights};
use quarry_core::{Corpus, DocId, SharedIndexBuilder, StatisticsBuilder, StatsConfig};
use rayon::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the inverted index and TF-IDF tables of a normalized corpus", long_about = None)]
struct Cli {
    /// Worker threads for reading documents (0 = one per core)
    #[arg(long, global = true, default_value_t = 0)]
    threads: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted index from a corpus directory (index.json + <id>.txt token files)
    Build {
        /// Corpus directory, or its index.json metadata file
        #[arg(long)]
        input: String,
        /// Output directory
        #[arg(long)]
        output: String,
    },
    /// Compute TF, IDF and TF-IDF tables for a built index
    Stats {
        /// Path to inverted_index.json
        #[arg(long)]
        index: String,
        /// Corpus directory the index was built from
        #[arg(long)]
        corpus: String,
        /// Output directory
        #[arg(long)]
        output: String,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
    },
}

/// Level used when `RUST_LOG` is unset; keeps skipped-document warnings and the build summary visible.
const DEFAULT_LOG_FILTER: &str = "info";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<()> {
    fmt().with_env_filter(log_filter()).init();
    let cli = Cli::parse();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new().num_threads(cli.threads).build_global().context("configuring worker pool")?;
    }

    match cli.command {
        Commands::Build { input, output } => build_index(&input, &output),
        Commands::Stats { index, corpus, output, smoothed_idf } => {
            compute_statistics(&index, &corpus, &output, StatsConfig { smoothed_idf })
        }
    }
}

fn build_index(input: &str, output: &str) -> Result<()> {
    let corpus = Corpus::open(input)?;
    let out_paths = IndexPaths::new(output);
    fs::create_dir_all(&out_paths.root)?;
    tracing::info!(documents = corpus.len(), root = %corpus.root().display(), "building index");

    let builder = SharedIndexBuilder::new();
    let skipped = AtomicUsize::new(0);
    corpus.documents().par_iter().for_each(|doc| match corpus.read_tokens(doc) {
        Ok(tokens) => builder.add_document(&doc.id, &tokens),
        Err(e) => {
            skipped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(doc_id = %doc.id, "skipping document: {e:#}");
        }
    });

    let ingested = builder.documents_added();
    let index = builder.finish();
    tracing::info!(ingested, skipped = skipped.into_inner(), num_docs = index.num_docs(), num_terms = index.num_terms(), "ingested documents");

    save_index(&out_paths, &index)?;
    save_index_text(&out_paths, &index)?;
    save_meta(&out_paths, &IndexMeta::for_index(&index))?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn compute_statistics(index_path: &str, corpus_dir: &str, output: &str, config: StatsConfig) -> Result<()> {
    let index = load_index(Path::new(index_path))?;
    let corpus = Corpus::open(corpus_dir)?;

    let frequencies: Vec<(DocId, TermWeights)> = corpus
        .documents()
        .par_iter()
        .filter_map(|doc| match corpus.read_tokens(doc) {
            Ok(tokens) => Some((doc.id.clone(), term_frequencies(&tokens))),
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, "no term frequencies for document: {e:#}");
                None
            }
        })
        .collect();

    let mut builder = StatisticsBuilder::new(config);
    for (doc_id, tf) in frequencies {
        builder.add_frequencies(doc_id, tf);
    }
    let stats = builder.finish(&index);
    save_statistics(&IndexPaths::new(output), &stats)?;

    tracing::info!(output, smoothed_idf = config.smoothed_idf, "statistics written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::persist::{load_idf, load_tfidf};

    fn write_corpus(dir: &Path) {
        fs::write(
            dir.join("index.json"),
            r#"[{"id":"1","url":"https://pets.example/1"},{"id":"2","url":"https://pets.example/2"},{"id":"3","url":"https://pets.example/3"},{"id":"4","url":"https://pets.example/4"}]"#,
        )
        .unwrap();
        fs::write(dir.join("1.txt"), "cat dog cat").unwrap();
        fs::write(dir.join("2.txt"), "dog bird").unwrap();
        fs::write(dir.join("3.txt"), "cat\nbird bird\n").unwrap();
        // 4.txt is missing on purpose
    }

    #[test]
    fn default_filter_reports_skips() {
        use tracing_subscriber::filter::LevelFilter;
        let hint = EnvFilter::new(DEFAULT_LOG_FILTER).max_level_hint();
        assert_eq!(hint, Some(LevelFilter::INFO));
        assert!(hint.is_some_and(|level| level >= LevelFilter::WARN));
    }

    #[test]
    fn build_skips_unreadable_documents() {
        let corpus = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_corpus(corpus.path());

        build_index(corpus.path().to_str().unwrap(), out.path().to_str().unwrap()).unwrap();

        let paths = IndexPaths::new(out.path());
        let index = load_index(&paths.index_json()).unwrap();
        assert_eq!(index.num_docs(), 3);
        let text = fs::read_to_string(paths.index_text()).unwrap();
        assert_eq!(text, "bird: 2, 3\ncat: 1, 3\ndog: 1, 2\n");
        let meta: serde_json::Value = serde_json::from_str(&fs::read_to_string(paths.meta()).unwrap()).unwrap();
        assert_eq!(meta["num_terms"], 3);
    }

    #[test]
    fn stats_follow_the_index() {
        let corpus = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_corpus(corpus.path());
        let corpus_dir = corpus.path().to_str().unwrap();
        let out_dir = out.path().to_str().unwrap();

        build_index(corpus_dir, out_dir).unwrap();
        let paths = IndexPaths::new(out.path());
        compute_statistics(paths.index_json().to_str().unwrap(), corpus_dir, out_dir, StatsConfig::default()).unwrap();

        let idf = load_idf(&paths.idf()).unwrap();
        assert!((idf["cat"] - 1.5f64.ln()).abs() < 1e-6);
        let tfidf = load_tfidf(&paths.tfidf()).unwrap();
        assert!((tfidf["1"]["cat"] - 2.0 / 3.0 * 1.5f64.ln()).abs() < 1e-6);
        assert!(!tfidf["2"].contains_key("cat"));
    }
}
