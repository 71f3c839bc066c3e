//! Documents as flat field-name to text maps

use crate::io::read_jsonl;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-facing identifier, unique per engine
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    /// Build a document from a JSON object.
    ///
    /// `id` (string or number) becomes the document id. Nested objects flatten into
    /// dotted names (`{"meta": {"author": ..}}` -> `meta.author`), arrays are joined
    /// with spaces, nulls and booleans are dropped.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            _ => bail!("document must be a JSON object"),
        };
        let id = match object.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(_) => bail!("document id must be a string or a number"),
            None => bail!("document has no id"),
        };

        let mut doc = Document::new(id);
        for (key, value) in object {
            if key != "id" {
                flatten(key, value, &mut doc.fields);
            }
        }
        Ok(doc)
    }
}

/// Load documents from a JSONL file. Records that are not valid documents are skipped.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let records: Vec<Value> =
        read_jsonl(path).with_context(|| format!("reading {}", path.display()))?;

    let mut docs = Vec::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        match Document::from_json(record) {
            Ok(doc) => docs.push(doc),
            Err(err) => warn!(
                path = %path.display(),
                record = pos,
                error = %err,
                "skipping document"
            ),
        }
    }
    Ok(docs)
}

fn flatten(name: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(object) => {
            for (key, nested) in object {
                flatten(&format!("{}.{}", name, key), nested, out);
            }
        }
        other => {
            if let Some(text) = text_of(other) {
                out.insert(name.to_string(), text);
            }
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_of).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}
