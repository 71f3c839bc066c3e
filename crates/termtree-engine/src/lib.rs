//! Document search on top of the term index: tokenizing, ingestion,
//! fuzzy query expansion, BM25F ranking and persistence.

pub mod config;
pub mod document;
pub mod engine;
pub mod io;
pub mod snapshot;
pub mod tokenize;

pub use config::{EngineConfig, FieldConfig};
pub use document::{read_documents, Document};
pub use engine::{EngineSummary, FieldSummary, QueryOptions, SearchEngine, SearchHit};
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use tokenize::{is_stop_word, tokenize};
