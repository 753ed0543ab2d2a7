//! Document length table: the L2 norm of each document's TF-IDF vector.

use crate::corpus::DocTokens;
use crate::error::{RankError, Result};
use crate::index::{DocId, Term, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Length of one document over the distinct terms of its token list.
///
/// Takes a [`WeightedIndex`], so lengths are always built from TF-IDF weights.
/// Terms with no posting for `doc_id` add nothing; an empty list has length 0.
pub fn doc_length(doc_id: DocId, terms: &[Term], index: &WeightedIndex) -> f32 {
    let mut seen: HashSet<&str> = HashSet::with_capacity(terms.len());
    let mut sum = 0.0f32;
    for term in terms {
        if !seen.insert(term.as_str()) { continue; }
        if let Some(w) = index.weight(term, doc_id) {
            sum += w * w;
        }
    }
    sum.sqrt()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLengths {
    lengths: HashMap<DocId, f32>,
}

impl DocumentLengths {
    /// Builds the table for every doc id in `[0, num_docs)`. Documents without
    /// a token list get length 0.
    pub fn compute(index: &WeightedIndex, doc_tokens: &DocTokens, num_docs: u32) -> Self {
        let lengths = (0..num_docs)
            .map(|doc| (doc, doc_tokens.get(doc).map_or(0.0, |terms| doc_length(doc, terms, index))))
            .collect::<HashMap<_, _>>();
        let empty = lengths.values().filter(|&&l| l == 0.0).count();
        tracing::debug!(num_docs, empty, "computed document lengths");
        Self { lengths }
    }

    pub fn get(&self, doc_id: DocId) -> Option<f32> { self.lengths.get(&doc_id).copied() }

    pub fn insert(&mut self, doc_id: DocId, length: f32) { self.lengths.insert(doc_id, length); }

    pub fn len(&self) -> usize { self.lengths.len() }

    pub fn is_empty(&self) -> bool { self.lengths.is_empty() }

    /// Rejects a supplied table with doc ids outside the corpus or non-finite lengths.
    pub fn validate(&self, num_docs: u32) -> Result<()> {
        for (&doc, &length) in &self.lengths {
            if doc >= num_docs {
                return Err(RankError::Configuration(format!(
                    "length given for doc {doc} outside a corpus of {num_docs}"
                )));
            }
            if !length.is_finite() || length < 0.0 {
                return Err(RankError::Configuration(format!("invalid length {length} for doc {doc}")));
            }
        }
        Ok(())
    }
}

impl FromIterator<(DocId, f32)> for DocumentLengths {
    fn from_iter<I: IntoIterator<Item = (DocId, f32)>>(iter: I) -> Self {
        Self { lengths: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RawIndex;
    use crate::stats::compute_idf;

    fn terms(words: &[&str]) -> Vec<Term> { words.iter().map(|w| w.to_string()).collect() }

    fn weighted(docs: &[(DocId, Vec<Term>)], num_docs: u32) -> WeightedIndex {
        let mut raw = RawIndex::new();
        for (doc, tokens) in docs {
            raw.add_document(*doc, tokens);
        }
        let idf = compute_idf(&raw, num_docs).unwrap();
        raw.into_weighted(&idf).unwrap()
    }

    #[test]
    fn length_uses_each_distinct_term_once() {
        let doc0 = terms(&["cat", "cat", "dog"]);
        let index = weighted(&[(0, doc0.clone()), (1, terms(&["dog"]))], 4);
        // cat: tf 2 * idf 2 = 4; dog: tf 1 * idf 1 = 1
        let len = doc_length(0, &doc0, &index);
        assert!((len - 17f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn empty_document_has_zero_length() {
        let index = weighted(&[(0, terms(&["cat"]))], 2);
        assert_eq!(doc_length(1, &[], &index), 0.0);
    }

    #[test]
    fn compute_covers_whole_corpus() {
        let doc0 = terms(&["cat"]);
        let index = weighted(&[(0, doc0.clone())], 3);
        let mut tokens = DocTokens::new();
        tokens.insert(0, doc0);
        let lengths = DocumentLengths::compute(&index, &tokens, 3);
        assert_eq!(lengths.len(), 3);
        assert!(lengths.get(0).unwrap() > 0.0);
        assert_eq!(lengths.get(2), Some(0.0));
    }

    #[test]
    fn supplied_lengths_are_validated() {
        let lengths: DocumentLengths = [(5, 1.0)].into_iter().collect();
        assert!(lengths.validate(3).is_err());
        let lengths: DocumentLengths = [(0, f32::INFINITY)].into_iter().collect();
        assert!(lengths.validate(3).is_err());
    }
}
