//! Engine configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use termtree_index::{Bm25fParams, FieldId, DEFAULT_MAX_ERRORS};

fn default_weight() -> f64 {
    1.0
}

/// A searchable document field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// BM25F weight, 0 keeps the field indexed but unscored by default
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Indexed fields; a field's position is its field id
    pub fields: Vec<FieldConfig>,

    /// BM25F term-frequency saturation
    pub k1: f64,

    /// BM25F length normalization
    pub b: f64,

    /// Edit budget for query expansion
    pub max_errors: usize,

    /// Expand query tokens with fuzzy matches unless a query says otherwise
    pub fuzzy: bool,

    /// Query tokens shorter than this (in chars) are never expanded
    pub min_fuzzy_len: usize,

    /// Keep stop words out of scoring (they stay available for suggestions)
    pub stop_words: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        let params = Bm25fParams::default();
        Self {
            fields: vec![FieldConfig::new("title", 2.0), FieldConfig::new("body", 1.0)],
            k1: params.k1,
            b: params.b,
            max_errors: DEFAULT_MAX_ERRORS,
            fuzzy: true,
            min_fuzzy_len: 4,
            stop_words: true,
        }
    }

    /// Read a JSON config file; missing keys fall back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            bail!("at least one field must be configured");
        }
        if FieldId::try_from(self.fields.len()).is_err() {
            bail!("too many fields: {}", self.fields.len());
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                bail!("field names must not be empty");
            }
            if !seen.insert(field.name.as_str()) {
                bail!("duplicate field {:?}", field.name);
            }
            if !field.weight.is_finite() || field.weight < 0.0 {
                bail!("invalid weight {} for field {:?}", field.weight, field.name);
            }
        }
        self.params().validate()?;
        Ok(())
    }

    pub fn params(&self) -> Bm25fParams {
        Bm25fParams {
            k1: self.k1,
            b: self.b,
        }
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|field| field.name == name)
            .and_then(|pos| FieldId::try_from(pos).ok())
    }

    /// Configured weights keyed by field id, with `overrides` applied by name
    pub fn weights(&self, overrides: &BTreeMap<String, f64>) -> Result<BTreeMap<FieldId, f64>> {
        let mut weights = BTreeMap::new();
        for (pos, field) in self.fields.iter().enumerate() {
            weights.insert(FieldId::try_from(pos)?, field.weight);
        }
        for (name, &weight) in overrides {
            let id = match self.field_id(name) {
                Some(id) => id,
                None => bail!("unknown field {:?}", name),
            };
            weights.insert(id, weight);
        }
        Ok(weights)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
