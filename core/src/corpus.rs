//! Per-document inputs supplied by the index builder alongside the raw index.

use crate::error::{RankError, Result};
use crate::index::{DocId, Term};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
}

/// Each document's token list in original order, duplicates included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocTokens {
    tokens: HashMap<DocId, Vec<Term>>,
}

impl DocTokens {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, doc_id: DocId, tokens: Vec<Term>) { self.tokens.insert(doc_id, tokens); }

    pub fn get(&self, doc_id: DocId) -> Option<&[Term]> { self.tokens.get(&doc_id).map(Vec::as_slice) }

    pub fn len(&self) -> usize { self.tokens.len() }

    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
}

/// Precomputed importance (page rank) per document, each in `[0, 1]`.
///
/// Documents without an entry have importance 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportanceScores {
    scores: HashMap<DocId, f32>,
}

impl ImportanceScores {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, doc_id: DocId, score: f32) { self.scores.insert(doc_id, score); }

    pub fn score(&self, doc_id: DocId) -> f32 { self.scores.get(&doc_id).copied().unwrap_or(0.0) }

    pub fn len(&self) -> usize { self.scores.len() }

    pub fn is_empty(&self) -> bool { self.scores.is_empty() }

    /// Checks every score is within `[0, 1]` and every doc id within `[0, num_docs)`.
    pub fn validate(&self, num_docs: u32) -> Result<()> {
        for (&doc, &score) in &self.scores {
            if doc >= num_docs {
                return Err(RankError::Configuration(format!(
                    "importance given for doc {doc} outside a corpus of {num_docs}"
                )));
            }
            if !(0.0..=1.0).contains(&score) {
                return Err(RankError::Configuration(format!("importance {score} of doc {doc} is outside [0, 1]")));
            }
        }
        Ok(())
    }
}

impl FromIterator<(DocId, f32)> for ImportanceScores {
    fn from_iter<I: IntoIterator<Item = (DocId, f32)>>(iter: I) -> Self {
        Self { scores: iter.into_iter().collect() }
    }
}
