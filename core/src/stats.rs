//! Lexical statistics: inverse document frequency.

use crate::error::{RankError, Result};
use crate::index::{RawIndex, Term};
use std::collections::HashMap;

/// `log2(N / df)` per indexed term.
///
/// Terms absent from the table contribute zero weight to any score; callers
/// look weights up through [`IdfTable::weight`] rather than treating absence
/// as an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdfTable {
    idf: HashMap<Term, f32>,
}

impl IdfTable {
    pub fn get(&self, term: &str) -> Option<f32> { self.idf.get(term).copied() }

    /// IDF of `term`, 0 when the term is not in the vocabulary.
    pub fn weight(&self, term: &str) -> f32 { self.get(term).unwrap_or(0.0) }

    pub fn contains(&self, term: &str) -> bool { self.idf.contains_key(term) }

    pub fn len(&self) -> usize { self.idf.len() }

    pub fn is_empty(&self) -> bool { self.idf.is_empty() }
}

/// Computes IDF for every term in `index` from the size of its posting map.
///
/// Fails when `num_docs` is zero, when a posting map is empty, or when the
/// index disagrees with the declared corpus size.
pub fn compute_idf(index: &RawIndex, num_docs: u32) -> Result<IdfTable> {
    if num_docs == 0 {
        return Err(RankError::Configuration("corpus size must be positive".into()));
    }
    let n = num_docs as f32;
    let mut idf = HashMap::with_capacity(index.num_terms());
    for (term, postings) in index.terms() {
        let df = postings.len();
        if df == 0 {
            return Err(RankError::Domain(format!("term {term:?} has an empty posting map")));
        }
        if df > num_docs as usize {
            return Err(RankError::Configuration(format!(
                "term {term:?} occurs in {df} documents but the corpus has {num_docs}"
            )));
        }
        if let Some(doc) = postings.keys().find(|&&doc| doc >= num_docs) {
            return Err(RankError::Configuration(format!(
                "term {term:?} has a posting for doc {doc} outside a corpus of {num_docs}"
            )));
        }
        idf.insert(term.clone(), (n / df as f32).log2());
    }
    Ok(IdfTable { idf })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> RawIndex {
        let mut raw = RawIndex::new();
        raw.insert("cat", 0, 2);
        raw.insert("cat", 1, 1);
        for doc in 0..4 {
            raw.insert("the", doc, 1);
        }
        raw.insert("rare", 3, 5);
        raw
    }

    #[test]
    fn idf_is_log2_of_inverse_df() {
        let idf = compute_idf(&index(), 4).unwrap();
        assert_eq!(idf.get("cat"), Some(1.0));
        assert_eq!(idf.get("rare"), Some(2.0));
    }

    #[test]
    fn term_in_every_document_has_zero_idf() {
        let idf = compute_idf(&index(), 4).unwrap();
        assert_eq!(idf.get("the"), Some(0.0));
    }

    #[test]
    fn idf_is_never_negative() {
        let idf = compute_idf(&index(), 4).unwrap();
        for term in ["cat", "the", "rare"] {
            assert!(idf.weight(term) >= 0.0);
        }
    }

    #[test]
    fn unknown_term_weighs_nothing() {
        let idf = compute_idf(&index(), 4).unwrap();
        assert!(!idf.contains("zebra"));
        assert_eq!(idf.weight("zebra"), 0.0);
    }

    #[test]
    fn zero_corpus_is_rejected() {
        assert!(matches!(compute_idf(&index(), 0), Err(RankError::Configuration(_))));
    }

    #[test]
    fn corpus_smaller_than_index_is_rejected() {
        assert!(matches!(compute_idf(&index(), 3), Err(RankError::Configuration(_))));
    }

    #[test]
    fn posting_outside_corpus_is_rejected() {
        let mut raw = RawIndex::new();
        raw.insert("cat", 7, 1);
        assert!(matches!(compute_idf(&raw, 4), Err(RankError::Configuration(_))));
    }
}
