use crate::index::DocMeta;
use crate::tokenizer::corpus_tokens;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "index.json";

/// A directory of normalized token files described by a metadata list.
///
/// Layout: `<dir>/index.json` with `[{"id": .., "url": ..}, ..]` and one
/// `<dir>/<id>.txt` per document.
#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    docs: Vec<DocMeta>,
}

impl Corpus {
    /// Accepts either the corpus directory or the metadata file itself.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (root, metadata) = if path.is_dir() {
            (path.to_path_buf(), path.join(METADATA_FILE))
        } else {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, path.to_path_buf())
        };
        let docs = load_metadata(&metadata)?;
        Ok(Self { root, docs })
    }

    pub fn from_parts<P: Into<PathBuf>>(root: P, docs: Vec<DocMeta>) -> Self {
        Self { root: root.into(), docs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn documents(&self) -> &[DocMeta] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn token_path(&self, doc: &DocMeta) -> PathBuf {
        self.root.join(format!("{}.txt", doc.id))
    }

    /// Read one document's token stream. Failure concerns this document only.
    pub fn read_tokens(&self, doc: &DocMeta) -> Result<Vec<String>> {
        let path = self.token_path(doc);
        let text = fs::read_to_string(&path).with_context(|| format!("reading tokens of document {} from {}", doc.id, path.display()))?;
        Ok(corpus_tokens(&text))
    }
}

pub fn load_metadata(path: &Path) -> Result<Vec<DocMeta>> {
    let data = fs::read(path).with_context(|| format!("reading metadata {}", path.display()))?;
    let docs: Vec<DocMeta> = serde_json::from_slice(&data).with_context(|| format!("parsing metadata {}", path.display()))?;
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_directory_or_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE), r#"[{"id":"1","url":"https://a.example/1"}]"#).unwrap();
        fs::write(dir.path().join("1.txt"), "cat dog cat").unwrap();

        let by_dir = Corpus::open(dir.path()).unwrap();
        let by_file = Corpus::open(dir.path().join(METADATA_FILE)).unwrap();
        assert_eq!(by_dir.documents(), by_file.documents());
        assert_eq!(by_dir.len(), 1);
        assert_eq!(by_file.root(), dir.path());

        let tokens = by_file.read_tokens(&by_file.documents()[0]).unwrap();
        assert_eq!(tokens, vec!["cat", "dog", "cat"]);
    }

    #[test]
    fn missing_token_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::from_parts(dir.path(), vec![DocMeta { id: "9".into(), url: String::new() }]);
        let err = corpus.read_tokens(&corpus.documents()[0]).unwrap_err();
        assert!(err.to_string().contains("document 9"));
    }

    #[test]
    fn malformed_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE), "{not json").unwrap();
        assert!(Corpus::open(dir.path()).is_err());
    }
}
