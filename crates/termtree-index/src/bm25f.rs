//! BM25F scoring over term index postings
//!
//! Field statistics are owned by the ingestion side and handed in at query time;
//! the ranker itself keeps no state.

use crate::error::{IndexError, Result};
use crate::posting::{DocId, FieldId, Posting};
use crate::tree::TermTree;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

const K1: f64 = 1.2;
const B: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25fParams {
    /// Term-frequency saturation
    pub k1: f64,
    /// Length normalization, 0 disables it
    pub b: f64,
}

impl Default for Bm25fParams {
    fn default() -> Self {
        Self { k1: K1, b: B }
    }
}

impl Bm25fParams {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(IndexError::InvalidParams("k1 must be a finite value >= 0"));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(IndexError::InvalidParams("b must be within [0, 1]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTotals {
    /// Documents with this field present
    pub doc_count: usize,
    /// Sum of token lengths over those documents
    pub total_length: usize,
}

/// Per-field corpus statistics and per-document field lengths
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    fields: BTreeMap<FieldId, FieldTotals>,
    doc_lengths: BTreeMap<DocId, BTreeMap<FieldId, usize>>,
}

impl FieldStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: impl IntoIterator<Item = FieldId>) -> Self {
        let mut stats = Self::new();
        for field in fields {
            stats.register_field(field);
        }
        stats
    }

    pub fn register_field(&mut self, field: FieldId) {
        self.fields.entry(field).or_default();
    }

    pub fn is_known(&self, field: FieldId) -> bool {
        self.fields.contains_key(&field)
    }

    /// Record the token length of `field` in `doc`, replacing an earlier value
    pub fn record(&mut self, doc: DocId, field: FieldId, length: usize) -> Result<()> {
        let totals = self
            .fields
            .get_mut(&field)
            .ok_or(IndexError::UnknownField(field))?;

        let lengths = self.doc_lengths.entry(doc).or_default();
        let (doc_count, remaining) = match lengths.get(&field) {
            Some(&previous) => (totals.doc_count, totals.total_length.checked_sub(previous)),
            None => (totals.doc_count + 1, Some(totals.total_length)),
        };
        let total_length = remaining
            .and_then(|rest| rest.checked_add(length))
            .ok_or_else(|| {
                IndexError::InconsistentStats(format!(
                    "total length of field {} does not cover document {}",
                    field, doc
                ))
            })?;

        lengths.insert(field, length);
        totals.doc_count = doc_count;
        totals.total_length = total_length;
        Ok(())
    }

    /// Check that the field totals are the sums of the per-document lengths and that
    /// every document id is below `doc_count`.
    pub fn validate(&self, doc_count: usize) -> Result<()> {
        let mut expected: BTreeMap<FieldId, FieldTotals> = self
            .fields
            .keys()
            .map(|&field| (field, FieldTotals::default()))
            .collect();

        for (&doc, fields) in &self.doc_lengths {
            if doc as usize >= doc_count {
                return Err(IndexError::InconsistentStats(format!(
                    "lengths recorded for unknown document {}",
                    doc
                )));
            }
            for (&field, &length) in fields {
                let totals = expected
                    .get_mut(&field)
                    .ok_or(IndexError::UnknownField(field))?;
                totals.doc_count += 1;
                totals.total_length = totals
                    .total_length
                    .checked_add(length)
                    .ok_or_else(|| {
                        IndexError::InconsistentStats(format!("field {} length overflows", field))
                    })?;
            }
        }

        let mismatch = expected
            .iter()
            .find(|&(field, totals)| self.fields.get(field) != Some(totals));
        match mismatch {
            Some((field, _)) => Err(IndexError::InconsistentStats(format!(
                "totals of field {} disagree with document lengths",
                field
            ))),
            None => Ok(()),
        }
    }

    pub fn totals(&self, field: FieldId) -> Option<FieldTotals> {
        self.fields.get(&field).copied()
    }

    /// Token length of `field` in `doc`, 0 when the document lacks the field
    pub fn doc_length(&self, doc: DocId, field: FieldId) -> usize {
        self.doc_lengths
            .get(&doc)
            .and_then(|fields| fields.get(&field))
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct documents with at least one recorded field
    pub fn document_count(&self) -> usize {
        self.doc_lengths.len()
    }
}

/// Rank documents for `query_tokens` with BM25F.
///
/// `field_weights` selects the scored fields (weight > 0). Returns
/// `(doc_id, score)` by descending score, ties broken by ascending doc id.
/// An index without documents or without any length in the selected fields
/// yields no results.
pub fn score<I>(
    query_tokens: I,
    index: &TermTree<Posting>,
    stats: &FieldStats,
    field_weights: &BTreeMap<FieldId, f64>,
    params: Bm25fParams,
) -> Result<Vec<(DocId, f64)>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    params.validate()?;

    let mut selected: BTreeMap<FieldId, f64> = BTreeMap::new();
    for (&field, &weight) in field_weights {
        if !stats.is_known(field) {
            return Err(IndexError::UnknownField(field));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(IndexError::InvalidWeight { field, weight });
        }
        if weight > 0.0 {
            selected.insert(field, weight);
        }
    }

    let doc_count = selected
        .keys()
        .filter_map(|&field| stats.totals(field))
        .map(|totals| totals.doc_count)
        .max()
        .unwrap_or(0);
    if doc_count == 0 {
        return Ok(Vec::new());
    }
    let n = doc_count as f64;

    let avg_dl: f64 = selected
        .iter()
        .filter_map(|(&field, &weight)| {
            stats
                .totals(field)
                .map(|totals| weight * totals.total_length as f64 / n)
        })
        .sum();
    if avg_dl <= 0.0 {
        return Ok(Vec::new());
    }

    let tokens: BTreeSet<String> = query_tokens
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .collect();

    let mut totals: HashMap<DocId, f64> = HashMap::new();
    for token in &tokens {
        let postings = match index.lookup(token) {
            Some(postings) => postings,
            None => continue,
        };

        // doc -> (weighted tf, weighted length)
        let mut per_doc: BTreeMap<DocId, (f64, f64)> = BTreeMap::new();
        for occ in postings.iter().filter_map(Posting::occurrence) {
            let weight = match selected.get(&occ.field_id) {
                Some(&weight) => weight,
                None => continue,
            };
            let entry = per_doc.entry(occ.doc_id).or_insert((0.0, 0.0));
            entry.0 += weight * occ.frequency as f64;
            entry.1 += weight * stats.doc_length(occ.doc_id, occ.field_id) as f64;
        }
        if per_doc.is_empty() {
            continue;
        }

        let df = per_doc.len() as f64;
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

        for (doc, (tf, dl)) in per_doc {
            let norm = tf + params.k1 * (1.0 - params.b + params.b * dl / avg_dl);
            if norm > 0.0 {
                *totals.entry(doc).or_insert(0.0) += tf / norm * idf;
            }
        }
    }

    let mut ranked: Vec<(DocId, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(FieldId, f64)]) -> BTreeMap<FieldId, f64> {
        pairs.iter().copied().collect()
    }

    /// Two documents of length 50; "test" once in doc 0 and twice in doc 1
    fn two_doc_setup() -> (TermTree<Posting>, FieldStats) {
        let mut index = TermTree::new();
        index
            .insert("test", [Posting::Raw, Posting::hit(0, 0, 1), Posting::hit(1, 0, 2)])
            .unwrap();

        let mut stats = FieldStats::with_fields([0]);
        stats.record(0, 0, 50).unwrap();
        stats.record(1, 0, 50).unwrap();
        (index, stats)
    }

    #[test]
    fn test_bm25f_empty() {
        let index = TermTree::new();
        let stats = FieldStats::with_fields([0]);
        let results = score(
            ["test"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        assert_eq!(results.len(), 0);
    }

    #[test]
    fn test_bm25f_ranks_higher_frequency_first() {
        let (index, stats) = two_doc_setup();
        let results = score(
            ["test"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert!(results[0].1 > results[1].1);

        // avg_dl = 50, df = 2, N = 2
        let idf = 1.2f64.ln();
        assert!((results[0].1 - 2.0 / 3.2 * idf).abs() < 1e-12);
        assert!((results[1].1 - 1.0 / 2.2 * idf).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_tokens_contribute_nothing() {
        let (index, stats) = two_doc_setup();
        let with_noise = score(
            ["test", "missing", "test"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        let plain = score(
            ["test"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        assert_eq!(with_noise, plain);
    }

    #[test]
    fn test_field_weights_shift_ranking() {
        let mut index = TermTree::new();
        // doc 0 has "rust" in the title (field 0), doc 1 in the body (field 1)
        index
            .insert("rust", [Posting::hit(0, 0, 1), Posting::hit(1, 1, 1)])
            .unwrap();
        index.insert("other", [Posting::hit(2, 1, 1)]).unwrap();

        let mut stats = FieldStats::with_fields([0, 1]);
        for doc in 0..3 {
            stats.record(doc, 0, 5).unwrap();
            stats.record(doc, 1, 5).unwrap();
        }

        let title_heavy = score(
            ["rust"],
            &index,
            &stats,
            &weights(&[(0, 3.0), (1, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        assert_eq!(title_heavy[0].0, 0);

        let body_only = score(
            ["rust"],
            &index,
            &stats,
            &weights(&[(0, 0.0), (1, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        assert_eq!(body_only.len(), 1);
        assert_eq!(body_only[0].0, 1);
    }

    #[test]
    fn test_ties_break_by_doc_id() {
        let mut index = TermTree::new();
        index
            .insert(
                "same",
                [Posting::hit(7, 0, 1), Posting::hit(3, 0, 1), Posting::hit(5, 0, 1)],
            )
            .unwrap();
        let mut stats = FieldStats::with_fields([0]);
        for doc in [3, 5, 7, 9] {
            stats.record(doc, 0, 10).unwrap();
        }

        let results = score(
            ["same"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        let ids: Vec<DocId> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn test_raw_postings_are_not_scored() {
        let mut index = TermTree::new();
        index.insert("the", [Posting::Raw]).unwrap();
        let mut stats = FieldStats::with_fields([0]);
        stats.record(0, 0, 3).unwrap();

        let results = score(
            ["the"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_length_corpus_is_guarded() {
        let (index, _) = two_doc_setup();
        let mut stats = FieldStats::with_fields([0]);
        stats.record(0, 0, 0).unwrap();
        let results = score(
            ["test"],
            &index,
            &stats,
            &weights(&[(0, 1.0)]),
            Bm25fParams::default(),
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_arguments() {
        let (index, stats) = two_doc_setup();
        let params = Bm25fParams::default();

        let unknown = score(["test"], &index, &stats, &weights(&[(9, 1.0)]), params);
        assert!(matches!(unknown, Err(IndexError::UnknownField(9))));

        let negative = score(["test"], &index, &stats, &weights(&[(0, -1.0)]), params);
        assert!(matches!(negative, Err(IndexError::InvalidWeight { .. })));

        let nan = score(["test"], &index, &stats, &weights(&[(0, f64::NAN)]), params);
        assert!(nan.is_err());

        let bad_b = Bm25fParams { k1: 1.2, b: 1.5 };
        assert!(score(["test"], &index, &stats, &weights(&[(0, 1.0)]), bad_b).is_err());
    }

    #[test]
    fn test_field_stats_record_replaces() {
        let mut stats = FieldStats::with_fields([0, 1]);
        stats.record(1, 0, 10).unwrap();
        stats.record(2, 0, 4).unwrap();
        stats.record(1, 0, 6).unwrap();

        let totals = stats.totals(0).unwrap();
        assert_eq!(totals.doc_count, 2);
        assert_eq!(totals.total_length, 10);
        assert_eq!(stats.doc_length(1, 0), 6);
        assert_eq!(stats.doc_length(1, 1), 0);
        assert_eq!(stats.document_count(), 2);
        assert!(matches!(
            stats.record(1, 5, 1),
            Err(IndexError::UnknownField(5))
        ));
    }

    #[test]
    fn test_field_stats_roundtrip() {
        let (_, stats) = two_doc_setup();
        let json = serde_json::to_string(&stats).unwrap();
        let parsed: FieldStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn test_field_stats_reject_tampered_totals() {
        let mut stats = FieldStats::with_fields([0]);
        stats.record(0, 0, 5).unwrap();
        stats.fields.insert(
            0,
            FieldTotals {
                doc_count: 1,
                total_length: 2,
            },
        );

        assert!(matches!(stats.validate(1), Err(IndexError::InconsistentStats(_))));
        assert!(matches!(stats.record(0, 0, 3), Err(IndexError::InconsistentStats(_))));
        assert_eq!(stats.doc_length(0, 0), 5);
    }

    #[test]
    fn test_field_stats_validate() {
        let (_, stats) = two_doc_setup();
        let docs = stats.document_count();
        assert!(stats.validate(docs).is_ok());
        assert!(stats.validate(docs - 1).is_err());
        assert!(FieldStats::new().validate(0).is_ok());
    }
}
