//! Errors raised by the term index, the compact serializer and the ranker

use crate::posting::FieldId;

#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// Keys must contain at least one character.
    #[error("cannot insert an empty key")]
    EmptyKey,

    /// An insert must carry at least one value, otherwise the key would be invisible.
    #[error("cannot insert key {0:?} without values")]
    NoValues(String),

    #[error("limit must be greater than zero")]
    ZeroLimit,

    #[error("unknown field id {0}")]
    UnknownField(FieldId),

    #[error("invalid weight {weight} for field {field}")]
    InvalidWeight { field: FieldId, weight: f64 },

    #[error("invalid ranking parameters: {0}")]
    InvalidParams(&'static str),

    /// Serialized input that cannot describe a valid graph.
    #[error("malformed compact tree: {0}")]
    Malformed(String),

    #[error("inconsistent field statistics: {0}")]
    InconsistentStats(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
