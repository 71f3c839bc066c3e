//! On-disk form of a search engine

use crate::config::EngineConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use termtree_index::{CompactTree, FieldStats, Posting};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to restore a [`crate::SearchEngine`].
///
/// `documents[i]` is the external id of document `i`; `tree` is the compact
/// term index, which keeps shared radix/BK nodes shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub config: EngineConfig,
    pub documents: Vec<String>,
    pub stats: FieldStats,
    pub tree: CompactTree<Posting>,
}
