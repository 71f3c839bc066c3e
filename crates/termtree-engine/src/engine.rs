//! SearchEngine: document ingestion, fuzzy query expansion and BM25F ranking

use crate::config::EngineConfig;
use crate::document::Document;
use crate::io::atomic_write;
use crate::snapshot::{Snapshot, SNAPSHOT_VERSION};
use crate::tokenize::{is_stop_word, tokenize};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use termtree_index::{
    bm25f, has_hits, DocId, FieldId, FieldStats, FieldTotals, FuzzyOptions, Posting,
    PrefixOptions, TermIndex, ValueFilter,
};
use tracing::{debug, info};

const DEFAULT_LIMIT: usize = 10;

/// Per-query knobs; unset values fall back to the engine config
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub limit: usize,
    pub fuzzy: Option<bool>,
    pub max_errors: Option<usize>,
    /// Field weight overrides by field name
    pub weights: BTreeMap<String, f64>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            fuzzy: None,
            max_errors: None,
            weights: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub weight: f64,
    pub totals: FieldTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub documents: usize,
    pub keys: usize,
    pub nodes: usize,
    pub fields: Vec<FieldSummary>,
}

pub struct SearchEngine {
    config: EngineConfig,
    index: TermIndex,
    stats: FieldStats,
    // DocId -> external id
    external_ids: Vec<String>,
    known_ids: HashSet<String>,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let stats = FieldStats::with_fields(field_ids(&config)?);

        Ok(Self {
            config,
            index: TermIndex::new(),
            stats,
            external_ids: Vec::new(),
            known_ids: HashSet::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &TermIndex {
        &self.index
    }

    pub fn stats(&self) -> &FieldStats {
        &self.stats
    }

    /// Number of ingested documents
    pub fn len(&self) -> usize {
        self.external_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external_ids.is_empty()
    }

    /// Index the configured fields of `doc`. Fields the config does not name are ignored.
    pub fn add_document(&mut self, doc: &Document) -> Result<DocId> {
        if self.known_ids.contains(&doc.id) {
            bail!("duplicate document id {:?}", doc.id);
        }
        let doc_id = DocId::try_from(self.external_ids.len()).context("too many documents")?;

        for (pos, field) in self.config.fields.iter().enumerate() {
            let text = match doc.fields.get(&field.name) {
                Some(text) => text,
                None => continue,
            };
            let field_id = FieldId::try_from(pos)?;
            let tokens = tokenize(text);
            self.stats.record(doc_id, field_id, tokens.len())?;

            let mut frequencies: BTreeMap<&str, u32> = BTreeMap::new();
            for token in &tokens {
                *frequencies.entry(token.as_str()).or_insert(0) += 1;
            }

            for (token, frequency) in frequencies {
                // First sighting registers the key for fuzzy matching; later hits
                // only append postings.
                if !self.index.contains(token) {
                    self.index.insert(token, [Posting::Raw])?;
                }
                if self.config.stop_words && is_stop_word(token) {
                    continue;
                }
                self.index
                    .insert_no_fuzzy(token, [Posting::hit(doc_id, field_id, frequency)])?;
            }
        }

        self.known_ids.insert(doc.id.clone());
        self.external_ids.push(doc.id.clone());
        debug!(id = %doc.id, doc_id, "indexed document");
        Ok(doc_id)
    }

    pub fn add_documents<'a>(
        &mut self,
        docs: impl IntoIterator<Item = &'a Document>,
    ) -> Result<usize> {
        let mut added = 0;
        for doc in docs {
            self.add_document(doc)?;
            added += 1;
        }
        info!(added, keys = self.index.len(), "ingested documents");
        Ok(added)
    }

    /// Query tokens after optional fuzzy expansion
    pub fn expand_query(&self, query: &str, options: &QueryOptions) -> Result<BTreeSet<String>> {
        let tokens: BTreeSet<String> = tokenize(query).into_iter().collect();
        let mut terms = tokens.clone();

        if options.fuzzy.unwrap_or(self.config.fuzzy) {
            let expandable = tokens
                .iter()
                .filter(|t| t.chars().count() >= self.config.min_fuzzy_len);
            let hits_only: ValueFilter<'_, Posting> = &has_hits;
            let fuzzy = FuzzyOptions {
                max_errors: options.max_errors.unwrap_or(self.config.max_errors),
                filter: Some(hits_only),
                ..FuzzyOptions::default()
            };
            terms.extend(self.index.batch_fuzzy_matches(expandable, &fuzzy)?);
        }
        Ok(terms)
    }

    pub fn search(&self, query: &str, options: &QueryOptions) -> Result<Vec<SearchHit>> {
        if options.limit == 0 {
            bail!("limit must be greater than zero");
        }
        let weights = self.config.weights(&options.weights)?;
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let terms = self.expand_query(query, options)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        debug!(query, terms = ?terms, "expanded query");

        let ranked = bm25f::score(
            &terms,
            &self.index,
            &self.stats,
            &weights,
            self.config.params(),
        )?;

        Ok(ranked
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.external_ids.get(doc_id as usize).map(|id| SearchHit {
                    id: id.clone(),
                    doc_id,
                    score,
                })
            })
            .take(options.limit)
            .collect())
    }

    /// Indexed terms starting with `prefix`, in code point order
    pub fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let options = PrefixOptions {
            limit: Some(limit),
            ..PrefixOptions::default()
        };
        let matches = self.index.prefix_matches(&prefix.to_lowercase(), &options)?;
        Ok(matches.into_iter().map(|m| m.key).collect())
    }

    /// Indexed terms within `max_errors` edits of `term`, with their distances
    pub fn expand(
        &self,
        term: &str,
        max_errors: usize,
        limit: usize,
    ) -> Result<Vec<(String, usize)>> {
        let options = FuzzyOptions {
            max_errors,
            limit: Some(limit),
            ..FuzzyOptions::default()
        };
        let matches = self.index.fuzzy_matches(&term.to_lowercase(), &options)?;
        Ok(matches.into_iter().map(|m| (m.key, m.distance)).collect())
    }

    pub fn summary(&self) -> EngineSummary {
        let fields = self
            .config
            .fields
            .iter()
            .enumerate()
            .map(|(pos, field)| FieldSummary {
                name: field.name.clone(),
                weight: field.weight,
                totals: FieldId::try_from(pos)
                    .ok()
                    .and_then(|id| self.stats.totals(id))
                    .unwrap_or_default(),
            })
            .collect();

        EngineSummary {
            documents: self.len(),
            keys: self.index.len(),
            nodes: self.index.node_count(),
            fields,
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            config: self.config.clone(),
            documents: self.external_ids.clone(),
            stats: self.stats.clone(),
            tree: self.index.to_compact(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            bail!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        snapshot.config.validate()?;
        for id in field_ids(&snapshot.config)? {
            if !snapshot.stats.is_known(id) {
                bail!("snapshot statistics lack field {}", id);
            }
        }

        snapshot
            .stats
            .validate(snapshot.documents.len())
            .context("snapshot statistics")?;

        let index = TermIndex::from_compact(snapshot.tree)?;
        let known_ids: HashSet<String> = snapshot.documents.iter().cloned().collect();
        if known_ids.len() != snapshot.documents.len() {
            bail!("snapshot repeats a document id");
        }

        Ok(Self {
            config: snapshot.config,
            index,
            stats: snapshot.stats,
            external_ids: snapshot.documents,
            known_ids,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(&self.to_snapshot())?;
        atomic_write(path, &json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = json.len(), "saved index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Self::from_snapshot(snapshot).with_context(|| format!("loading {}", path.display()))
    }
}

fn field_ids(config: &EngineConfig) -> Result<Vec<FieldId>> {
    (0..config.fields.len())
        .map(|pos| FieldId::try_from(pos).context("too many fields"))
        .collect()
}
