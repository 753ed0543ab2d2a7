//! TF-IDF / cosine ranking with optional importance blending.

use crate::config::RankerConfig;
use crate::corpus::{DocTokens, ImportanceScores};
use crate::error::{RankError, Result};
use crate::index::{to_tfidf, DocId, RawIndex, Term, WeightedIndex};
use crate::length::DocumentLengths;
use crate::stats::{compute_idf, IdfTable};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Sparse per-document scores. Documents sharing no term with the query are absent.
pub type Scores = HashMap<DocId, f32>;

/// `(doc, score)` pairs, descending by score, ties by doc id ascending.
pub type RankedList = Vec<(DocId, f32)>;

/// Sorts scores descending; equal scores are ordered by doc id ascending.
pub fn rank(scores: Scores) -> RankedList {
    let mut ranked: RankedList = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Adds `importance * multiplier` to every score of an already ranked list
/// and sorts again.
///
/// This is a post-hoc blend. Applying it to the output of
/// [`TfIdfRanker::retrieve`] with importance blending enabled counts
/// importance twice.
pub fn rerank_with_importance(ranked: RankedList, importance: &ImportanceScores, multiplier: f32) -> RankedList {
    rank(ranked.into_iter().map(|(doc, score)| (doc, score + importance.score(doc) * multiplier)).collect())
}

/// Vector-space ranker over a TF-IDF weighted inverted index.
///
/// Immutable once built; share it across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct TfIdfRanker {
    index: WeightedIndex,
    idf: IdfTable,
    lengths: DocumentLengths,
    importance: ImportanceScores,
    config: RankerConfig,
}

impl TfIdfRanker {
    /// Weights `raw` and computes the document length table from `doc_tokens`.
    pub fn new(raw: RawIndex, doc_tokens: &DocTokens, importance: ImportanceScores, config: RankerConfig) -> Result<Self> {
        let (index, idf) = Self::weigh(raw, &config)?;
        let lengths = DocumentLengths::compute(&index, doc_tokens, config.num_docs);
        Self::assemble(index, idf, lengths, importance, config)
    }

    /// Weights `raw` and uses a length table the index builder already computed.
    pub fn with_lengths(
        raw: RawIndex,
        lengths: DocumentLengths,
        importance: ImportanceScores,
        config: RankerConfig,
    ) -> Result<Self> {
        let (index, idf) = Self::weigh(raw, &config)?;
        lengths.validate(config.num_docs)?;
        Self::assemble(index, idf, lengths, importance, config)
    }

    fn weigh(raw: RawIndex, config: &RankerConfig) -> Result<(WeightedIndex, IdfTable)> {
        config.validate()?;
        let idf = compute_idf(&raw, config.num_docs)?;
        let index = to_tfidf(raw, &idf)?;
        Ok((index, idf))
    }

    fn assemble(
        index: WeightedIndex,
        idf: IdfTable,
        lengths: DocumentLengths,
        importance: ImportanceScores,
        config: RankerConfig,
    ) -> Result<Self> {
        importance.validate(config.num_docs)?;
        tracing::info!(
            num_docs = config.num_docs,
            num_terms = index.num_terms(),
            with_importance = importance.len(),
            "tf-idf ranker ready"
        );
        Ok(Self { index, idf, lengths, importance, config })
    }

    pub fn index(&self) -> &WeightedIndex { &self.index }
    pub fn idf(&self) -> &IdfTable { &self.idf }
    pub fn lengths(&self) -> &DocumentLengths { &self.lengths }
    pub fn importance(&self) -> &ImportanceScores { &self.importance }
    pub fn config(&self) -> &RankerConfig { &self.config }

    /// Inner product of the query with every document sharing a term with it.
    pub fn similarity(&self, query: &[Term]) -> Scores {
        let mut scores = Scores::new();
        self.accumulate(&mut scores, query, 1.0);
        scores
    }

    /// Inner product with expansion terms counted at `damping` strength.
    pub fn similarity_expanded(&self, query: &[Term], expansion_terms: &[Term]) -> Scores {
        let mut scores = Scores::new();
        self.accumulate(&mut scores, query, 1.0);
        self.accumulate(&mut scores, expansion_terms, self.config.damping);
        scores
    }

    fn accumulate(&self, scores: &mut Scores, terms: &[Term], factor: f32) {
        for term in terms {
            let wq = self.idf.weight(term);
            if wq == 0.0 {
                if !self.idf.contains(term) {
                    warn!(term = %term, "query term not in vocabulary, skipped");
                }
                continue;
            }
            let Some(postings) = self.index.postings(term) else { continue };
            for (&doc, &weight) in postings {
                *scores.entry(doc).or_insert(0.0) += weight * factor * wq;
            }
        }
    }

    /// Norm of the query vector, `count(term) * idf(term)` per distinct term.
    pub fn query_length(&self, query: &[Term]) -> f32 {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for term in query {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
        counts
            .iter()
            .map(|(term, &count)| {
                let w = count as f32 * self.idf.weight(term);
                w * w
            })
            .sum::<f32>()
            .sqrt()
    }

    pub fn cosine(&self, query: &[Term]) -> Result<Scores> {
        let similarity = self.similarity(query);
        self.normalize(similarity, query)
    }

    /// Cosine over the expanded query. The query norm covers the original
    /// terms only, while the numerator also includes the expansion terms.
    pub fn cosine_expanded(&self, query: &[Term], expansion_terms: &[Term]) -> Result<Scores> {
        let similarity = self.similarity_expanded(query, expansion_terms);
        self.normalize(similarity, query)
    }

    fn normalize(&self, mut scores: Scores, query: &[Term]) -> Result<Scores> {
        if query.is_empty() {
            return Err(RankError::EmptyQuery);
        }
        let q_len = self.query_length(query);
        if q_len == 0.0 || !q_len.is_finite() {
            return Err(RankError::EmptyQuery);
        }
        // Postings with an explicit tf of 0 leave zero entries; those docs do not match.
        scores.retain(|_, score| *score != 0.0);
        for (&doc, score) in scores.iter_mut() {
            let d_len = self.lengths.get(doc).unwrap_or(0.0);
            if d_len == 0.0 {
                return Err(RankError::ZeroLengthDocument(doc));
            }
            *score = *score / d_len / q_len;
        }
        Ok(scores)
    }

    /// Cosine plus `importance * importance_multiplier`, blended before ranking.
    pub fn cosine_with_importance(&self, query: &[Term]) -> Result<Scores> {
        let mut scores = self.cosine(query)?;
        for (&doc, score) in scores.iter_mut() {
            *score += self.importance.score(doc) * self.config.importance_multiplier;
        }
        Ok(scores)
    }

    pub fn retrieve(&self, query: &[Term], blend_importance: bool) -> Result<RankedList> {
        let scores = if blend_importance { self.cosine_with_importance(query)? } else { self.cosine(query)? };
        debug!(query_terms = query.len(), hits = scores.len(), blend_importance, "retrieved");
        Ok(rank(scores))
    }

    /// Ranks by expanded cosine. Importance is never blended on this path.
    pub fn retrieve_expanded(&self, query: &[Term], expansion_terms: &[Term]) -> Result<RankedList> {
        let scores = self.cosine_expanded(query, expansion_terms)?;
        debug!(query_terms = query.len(), expansion_terms = expansion_terms.len(), hits = scores.len(), "retrieved expanded");
        Ok(rank(scores))
    }

    /// Post-hoc importance blend using this ranker's table and multiplier.
    /// Not to be combined with `retrieve(.., true)`.
    pub fn rerank_with_importance(&self, ranked: RankedList) -> RankedList {
        rerank_with_importance(ranked, &self.importance, self.config.importance_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<Term> { words.iter().map(|w| w.to_string()).collect() }

    /// N = 4: doc0 "cat cat", doc1 "cat fish", doc2 "dog dog dog fish", doc3 "dog".
    fn ranker() -> TfIdfRanker {
        let docs = [
            terms(&["cat", "cat"]),
            terms(&["cat", "fish"]),
            terms(&["dog", "dog", "dog", "fish"]),
            terms(&["dog"]),
        ];
        let mut raw = RawIndex::new();
        let mut tokens = DocTokens::new();
        for (doc, words) in docs.into_iter().enumerate() {
            raw.add_document(doc as DocId, &words);
            tokens.insert(doc as DocId, words);
        }
        TfIdfRanker::new(raw, &tokens, ImportanceScores::new(), RankerConfig::new(4)).unwrap()
    }

    #[test]
    fn similarity_is_sparse() {
        let sim = ranker().similarity(&terms(&["cat"]));
        assert_eq!(sim.len(), 2);
        assert!(!sim.contains_key(&2));
        assert!(!sim.contains_key(&3));
    }

    #[test]
    fn duplicate_query_terms_count_twice() {
        let r = ranker();
        let once = r.similarity(&terms(&["cat"]));
        let twice = r.similarity(&terms(&["cat", "cat"]));
        assert!((twice[&0] - 2.0 * once[&0]).abs() < 1e-6);
        assert!((r.query_length(&terms(&["cat", "cat"])) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_terms_contribute_nothing() {
        let r = ranker();
        assert_eq!(r.similarity(&terms(&["cat", "zebra"])), r.similarity(&terms(&["cat"])));
        assert_eq!(r.query_length(&terms(&["zebra"])), 0.0);
    }

    #[test]
    fn expansion_terms_are_damped() {
        let r = ranker();
        let plain = r.similarity(&terms(&["cat"]));
        let expanded = r.similarity_expanded(&terms(&["cat"]), &terms(&["dog"]));
        assert_eq!(expanded[&0], plain[&0]);
        // dog: idf 1, tf 3 in doc2 => 3 * 1 * 0.1
        assert!((expanded[&2] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn expanded_cosine_normalizes_by_original_query_only() {
        let r = ranker();
        let q = terms(&["cat"]);
        let expanded = r.cosine_expanded(&q, &terms(&["fish"])).unwrap();
        let sim = r.similarity_expanded(&q, &terms(&["fish"]));
        let q_len = r.query_length(&q);
        let d_len = r.lengths().get(1).unwrap();
        assert!((expanded[&1] - sim[&1] / d_len / q_len).abs() < 1e-6);
    }

    #[test]
    fn query_of_only_unknown_terms_is_empty() {
        assert_eq!(ranker().cosine(&terms(&["zebra"])), Err(RankError::EmptyQuery));
        assert_eq!(ranker().retrieve(&[], false), Err(RankError::EmptyQuery));
    }

    #[test]
    fn missing_length_fails_instead_of_dividing() {
        let mut raw = RawIndex::new();
        raw.insert("cat", 0, 1);
        let lengths: DocumentLengths = [(0, 0.0)].into_iter().collect();
        let r = TfIdfRanker::with_lengths(raw, lengths, ImportanceScores::new(), RankerConfig::new(2)).unwrap();
        assert_eq!(r.cosine(&terms(&["cat"])), Err(RankError::ZeroLengthDocument(0)));
    }

    #[test]
    fn zero_tf_posting_on_empty_document_is_not_a_match() {
        let mut raw = RawIndex::new();
        raw.insert("cat", 0, 2);
        raw.insert("cat", 1, 0);
        let mut tokens = DocTokens::new();
        tokens.insert(0, terms(&["cat", "cat"]));
        tokens.insert(1, Vec::new());
        let r = TfIdfRanker::new(raw, &tokens, ImportanceScores::new(), RankerConfig::new(4)).unwrap();
        assert_eq!(r.similarity(&terms(&["cat"])).get(&1), Some(&0.0));

        let cosine = r.cosine(&terms(&["cat"])).unwrap();
        assert!(!cosine.contains_key(&1));
        assert!((cosine[&0] - 1.0).abs() < 1e-6);
        assert_eq!(r.retrieve(&terms(&["cat"]), true).unwrap(), vec![(0, cosine[&0])]);
    }

    #[test]
    fn rank_breaks_ties_by_doc_id() {
        let scores: Scores = [(7, 1.0), (2, 1.0), (5, 3.0)].into_iter().collect();
        assert_eq!(rank(scores), vec![(5, 3.0), (2, 1.0), (7, 1.0)]);
    }

    #[test]
    fn post_hoc_rerank_reorders() {
        let importance: ImportanceScores = [(1, 0.5)].into_iter().collect();
        let reranked = rerank_with_importance(vec![(0, 0.9), (1, 0.2)], &importance, 20.0);
        assert_eq!(reranked[0].0, 1);
        assert!((reranked[0].1 - 10.2).abs() < 1e-5);
    }

    #[test]
    fn invalid_importance_fails_construction() {
        let mut raw = RawIndex::new();
        raw.insert("cat", 0, 1);
        let importance: ImportanceScores = [(0, 3.0)].into_iter().collect();
        let err = TfIdfRanker::new(raw, &DocTokens::new(), importance, RankerConfig::new(1)).unwrap_err();
        assert!(matches!(err, RankError::Configuration(_)));
    }
}
