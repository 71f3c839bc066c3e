//! Fuzzy/prefix term index with compact serialization and BM25F ranking

pub mod bm25f;
mod compact;
mod distance;
mod error;
mod posting;
mod tree;

pub use bm25f::{Bm25fParams, FieldStats, FieldTotals};
pub use compact::{CompactEntry, CompactTree};
pub use distance::distance;
pub use error::{IndexError, Result};
pub use posting::{has_hits, DocId, FieldId, Occurrence, Posting};
pub use tree::{
    FuzzyMatch, FuzzyOptions, PrefixMatch, PrefixOptions, TermTree, ValueFilter,
    DEFAULT_MAX_ERRORS,
};

/// Term index carrying search postings
pub type TermIndex = TermTree<Posting>;
