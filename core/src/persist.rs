use crate::index::{compare_doc_ids, DocId, InvertedIndex};
use crate::stats::{Statistics, TermWeights};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub num_docs: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

impl IndexMeta {
    pub fn for_index(index: &InvertedIndex) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { num_docs: index.num_docs(), num_terms: index.num_terms(), created_at, version: FORMAT_VERSION }
    }
}

/// File layout of an output directory.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_json(&self) -> PathBuf { self.root.join("inverted_index.json") }
    pub fn index_text(&self) -> PathBuf { self.root.join("inverted_index.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn tf(&self) -> PathBuf { self.root.join("tf.csv") }
    pub fn idf(&self) -> PathBuf { self.root.join("idf.csv") }
    pub fn tfidf(&self) -> PathBuf { self.root.join("tf-idf.csv") }
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let path = paths.index_json();
    let mut f = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
    serde_json::to_writer_pretty(&mut f, &index.sorted_postings())?;
    f.flush()?;
    Ok(())
}

pub fn load_index(path: &Path) -> Result<InvertedIndex> {
    let data = std::fs::read(path).with_context(|| format!("reading index {}", path.display()))?;
    let raw: HashMap<String, Vec<DocId>> = serde_json::from_slice(&data).with_context(|| format!("parsing index {}", path.display()))?;
    Ok(InvertedIndex::from_postings(raw))
}

/// `term: id, id, ...`, one line per term, alphabetical.
pub fn save_index_text(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let path = paths.index_text();
    let mut w = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
    for (term, ids) in index.sorted_postings() {
        writeln!(w, "{}: {}", term, ids.join(", "))?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_meta(paths: &IndexPaths, meta: &IndexMeta) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    std::fs::write(paths.meta(), json)?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<IndexMeta> {
    let path = paths.meta();
    let data = std::fs::read_to_string(&path).with_context(|| format!("reading meta {}", path.display()))?;
    let meta: IndexMeta = serde_json::from_str(&data).with_context(|| format!("parsing meta {}", path.display()))?;
    Ok(meta)
}

fn fixed6(v: f64) -> String {
    format!("{v:.6}")
}

fn sorted_docs<'a, V>(table: &'a BTreeMap<DocId, V>) -> Vec<(&'a DocId, &'a V)> {
    let mut rows: Vec<_> = table.iter().collect();
    rows.sort_by(|a, b| compare_doc_ids(a.0, b.0));
    rows
}

fn save_doc_table(path: &Path, value_column: &str, table: &BTreeMap<DocId, TermWeights>) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    w.write_record(["fileId", "word", value_column])?;
    for (doc, weights) in sorted_docs(table) {
        for (term, value) in weights {
            w.write_record([doc.as_str(), term.as_str(), fixed6(*value).as_str()])?;
        }
    }
    w.flush()?;
    Ok(())
}

pub fn save_tf(paths: &IndexPaths, tf: &BTreeMap<DocId, TermWeights>) -> Result<()> {
    save_doc_table(&paths.tf(), "tf", tf)
}

pub fn save_tfidf(paths: &IndexPaths, tfidf: &BTreeMap<DocId, TermWeights>) -> Result<()> {
    save_doc_table(&paths.tfidf(), "tf-idf", tfidf)
}

pub fn save_idf(paths: &IndexPaths, idf: &TermWeights) -> Result<()> {
    let path = paths.idf();
    let mut w = csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    w.write_record(["word", "idf"])?;
    for (term, value) in idf {
        w.write_record([term.as_str(), fixed6(*value).as_str()])?;
    }
    w.flush()?;
    Ok(())
}

pub fn save_statistics(paths: &IndexPaths, stats: &Statistics) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_tf(paths, &stats.tf)?;
    save_idf(paths, &stats.idf)?;
    save_tfidf(paths, &stats.tfidf)?;
    Ok(())
}

fn load_doc_table(path: &Path) -> Result<BTreeMap<DocId, TermWeights>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut table: BTreeMap<DocId, TermWeights> = BTreeMap::new();
    for row in rdr.deserialize::<(DocId, String, f64)>() {
        let (doc, term, value) = row.with_context(|| format!("parsing {}", path.display()))?;
        table.entry(doc).or_default().insert(term, value);
    }
    Ok(table)
}

pub fn load_tf(path: &Path) -> Result<BTreeMap<DocId, TermWeights>> {
    load_doc_table(path)
}

pub fn load_tfidf(path: &Path) -> Result<BTreeMap<DocId, TermWeights>> {
    load_doc_table(path)
}

pub fn load_idf(path: &Path) -> Result<TermWeights> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut idf = TermWeights::new();
    for row in rdr.deserialize::<(String, f64)>() {
        let (term, value) = row.with_context(|| format!("parsing {}", path.display()))?;
        idf.insert(term, value);
    }
    Ok(idf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;
    use crate::stats::{StatisticsBuilder, StatsConfig};
    use tempfile::tempdir;

    fn sample() -> (InvertedIndex, Statistics) {
        let mut ib = IndexBuilder::new();
        let mut sb = StatisticsBuilder::new(StatsConfig::default());
        for (id, tokens) in [("10", vec!["cat", "dog", "cat"]), ("2", vec!["dog", "bird"])] {
            ib.add_document(id, &tokens);
            sb.add_document(id, &tokens);
        }
        let index = ib.finish();
        let stats = sb.finish(&index);
        (index, stats)
    }

    #[test]
    fn index_json_reloads_to_same_sets() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (index, _) = sample();
        save_index(&paths, &index).unwrap();
        let loaded = load_index(&paths.index_json()).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn text_dump_is_sorted() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (index, _) = sample();
        save_index_text(&paths, &index).unwrap();
        let text = std::fs::read_to_string(paths.index_text()).unwrap();
        assert_eq!(text, "bird: 2\ncat: 10\ndog: 2, 10\n");
    }

    #[test]
    fn tables_use_six_decimals() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (_, stats) = sample();
        save_statistics(&paths, &stats).unwrap();

        let tf = std::fs::read_to_string(paths.tf()).unwrap();
        let mut lines = tf.lines();
        assert_eq!(lines.next(), Some("fileId,word,tf"));
        assert_eq!(lines.next(), Some("2,bird,0.500000"));
        assert!(tf.contains("10,cat,0.666667"));

        let idf = std::fs::read_to_string(paths.idf()).unwrap();
        assert!(idf.starts_with("word,idf\nbird,0.693147\n"));
        assert!(std::fs::read_to_string(paths.tfidf()).unwrap().starts_with("fileId,word,tf-idf\n"));

        let reloaded = load_idf(&paths.idf()).unwrap();
        assert!((reloaded["cat"] - stats.idf["cat"]).abs() < 1e-6);
        let tfidf = load_tfidf(&paths.tfidf()).unwrap();
        assert_eq!(tfidf.len(), stats.tfidf.len());
        assert!((load_tf(&paths.tf()).unwrap()["10"]["dog"] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn meta_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let (index, _) = sample();
        let meta = IndexMeta::for_index(&index);
        save_meta(&paths, &meta).unwrap();
        let loaded = load_meta(&paths).unwrap();
        assert_eq!(loaded.num_docs, 2);
        assert_eq!(loaded.num_terms, 3);
        assert_eq!(loaded.version, FORMAT_VERSION);
        assert!(!loaded.created_at.is_empty());
    }

    #[test]
    fn missing_files_are_errors() {
        let dir = tempdir().unwrap();
        assert!(load_index(&dir.path().join("nope.json")).is_err());
        assert!(load_idf(&dir.path().join("nope.csv")).is_err());
        let err = load_meta(&IndexPaths::new(dir.path())).unwrap_err();
        assert!(err.to_string().contains("meta.json"));
    }

    #[test]
    fn malformed_tables_are_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idf.csv");
        std::fs::write(&path, "word,idf\ncat,not-a-number\n").unwrap();
        assert!(load_idf(&path).is_err());
    }
}
