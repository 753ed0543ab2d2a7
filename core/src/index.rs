use crate::error::{RankError, Result};
use crate::stats::IdfTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;
pub type Term = String;

/// Postings of one term: doc -> value. A missing doc means term frequency zero,
/// which is not the same as an entry holding 0.
pub type Postings<W> = HashMap<DocId, W>;

/// Inverted index holding raw term frequencies, as produced by the index builder.
///
/// The only way to obtain TF-IDF weights is [`RawIndex::into_weighted`], which
/// consumes the raw index, so weights can never be multiplied by IDF twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawIndex {
    postings: HashMap<Term, Postings<u32>>,
}

impl RawIndex {
    pub fn new() -> Self { Self::default() }

    /// Sets the raw frequency of `term` in `doc_id`, replacing any earlier value.
    pub fn insert(&mut self, term: impl Into<Term>, doc_id: DocId, tf: u32) {
        self.postings.entry(term.into()).or_default().insert(doc_id, tf);
    }

    /// Counts every token of a document into the postings.
    pub fn add_document(&mut self, doc_id: DocId, tokens: &[Term]) {
        for token in tokens {
            *self.postings.entry(token.clone()).or_default().entry(doc_id).or_insert(0) += 1;
        }
    }

    pub fn postings(&self, term: &str) -> Option<&Postings<u32>> { self.postings.get(term) }

    pub fn terms(&self) -> impl Iterator<Item = (&Term, &Postings<u32>)> { self.postings.iter() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// Converts raw frequencies to `tf * idf(term)` weights.
    ///
    /// Every indexed term must have an IDF entry; `compute_idf` over this same
    /// index guarantees that.
    pub fn into_weighted(self, idf: &IdfTable) -> Result<WeightedIndex> {
        let mut postings = HashMap::with_capacity(self.postings.len());
        for (term, plist) in self.postings {
            let term_idf = idf
                .get(&term)
                .ok_or_else(|| RankError::Domain(format!("no idf for indexed term {term:?}")))?;
            let weighted: Postings<f32> = plist.into_iter().map(|(doc, tf)| (doc, tf as f32 * term_idf)).collect();
            postings.insert(term, weighted);
        }
        tracing::debug!(num_terms = postings.len(), "converted raw index to tf-idf weights");
        Ok(WeightedIndex { postings })
    }
}

/// Converts a raw index into TF-IDF weights. See [`RawIndex::into_weighted`].
pub fn to_tfidf(raw: RawIndex, idf: &IdfTable) -> Result<WeightedIndex> {
    raw.into_weighted(idf)
}

/// Inverted index holding TF-IDF weights. Read-only once built.
///
/// There is no way back to raw frequencies and no second conversion:
///
/// ```compile_fail
/// use prf_core::{compute_idf, RawIndex};
///
/// let mut raw = RawIndex::new();
/// raw.insert("cat", 0, 2);
/// let idf = compute_idf(&raw, 2).unwrap();
/// let weighted = raw.into_weighted(&idf).unwrap();
/// let _twice = weighted.into_weighted(&idf);
/// ```
#[derive(Debug, Clone)]
pub struct WeightedIndex {
    postings: HashMap<Term, Postings<f32>>,
}

impl WeightedIndex {
    pub fn postings(&self, term: &str) -> Option<&Postings<f32>> { self.postings.get(term) }

    /// TF-IDF weight of `term` in `doc_id`, `None` when the term does not occur there.
    pub fn weight(&self, term: &str, doc_id: DocId) -> Option<f32> {
        self.postings.get(term).and_then(|p| p.get(&doc_id)).copied()
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }
}
