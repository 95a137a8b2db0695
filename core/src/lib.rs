pub mod boolean;
pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod stats;
pub mod tokenizer;
pub mod vector;

pub use boolean::{BooleanEngine, Expr};
pub use corpus::Corpus;
pub use error::{MalformedKind, QueryError};
pub use index::{compare_doc_ids, DocId, DocMeta, IndexBuilder, InvertedIndex, SharedIndexBuilder, Term};
pub use stats::{Statistics, StatisticsBuilder, StatsConfig};
pub use vector::{RankingConfig, SearchResult, VectorEngine, Vocabulary};
