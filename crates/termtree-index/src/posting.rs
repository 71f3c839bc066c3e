//! Postings attached to term index leaves

use serde::{Deserialize, Serialize};

pub type DocId = u32;
pub type FieldId = u32;

/// A term occurring `frequency` times in one field of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub doc_id: DocId,
    pub field_id: FieldId,
    pub frequency: u32,
}

/// Payload entry stored under a key.
///
/// `Raw` only records that the key was seen as a token, it is never scored.
/// A key holds at most one `Raw`, always ahead of its hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WirePosting", into = "WirePosting")]
pub enum Posting {
    Raw,
    Hit(Occurrence),
}

impl Posting {
    pub fn hit(doc_id: DocId, field_id: FieldId, frequency: u32) -> Self {
        Posting::Hit(Occurrence {
            doc_id,
            field_id,
            frequency,
        })
    }

    pub fn occurrence(&self) -> Option<&Occurrence> {
        match self {
            Posting::Hit(occ) => Some(occ),
            Posting::Raw => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Posting::Raw)
    }
}

/// True if any entry can contribute to a score
pub fn has_hits(values: &[Posting]) -> bool {
    values.iter().any(|p| !p.is_raw())
}

const RAW_MARKER: u8 = 0;

// Hits travel as `[doc, field, freq]`, the sentinel as a bare `0`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WirePosting {
    Marker(u8),
    Hit(DocId, FieldId, u32),
}

impl From<Posting> for WirePosting {
    fn from(posting: Posting) -> Self {
        match posting {
            Posting::Raw => WirePosting::Marker(RAW_MARKER),
            Posting::Hit(occ) => WirePosting::Hit(occ.doc_id, occ.field_id, occ.frequency),
        }
    }
}

impl TryFrom<WirePosting> for Posting {
    type Error = String;

    fn try_from(wire: WirePosting) -> Result<Self, Self::Error> {
        match wire {
            WirePosting::Marker(RAW_MARKER) => Ok(Posting::Raw),
            WirePosting::Marker(other) => Err(format!("unknown posting marker {}", other)),
            WirePosting::Hit(doc_id, field_id, frequency) => {
                Ok(Posting::hit(doc_id, field_id, frequency))
            }
        }
    }
}
