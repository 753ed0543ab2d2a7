use crate::config::{FeedbackConfig, RankerConfig, MAX_RESULTS_TO_CONSIDER, RESULTS_PER_PAGE};
use crate::corpus::{DocTokens, ImportanceScores};
use crate::error::{RankError, Result};
use crate::feedback::PseudoRelevanceFeedback;
use crate::index::{RawIndex, Term};
use crate::length::DocumentLengths;
use crate::ranker::{RankedList, TfIdfRanker};

/// Per-query switches chosen by a front end.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Number of results returned.
    pub k: usize,
    pub pseudo_relevance: bool,
    /// Blend importance into the initial cosine scores.
    pub blend_importance: bool,
    /// Re-rank the final list by importance instead. Exclusive with `blend_importance`.
    pub post_hoc_importance: bool,
    /// Expansion terms to consider; 0 uses the feedback default.
    pub expansion_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { k: RESULTS_PER_PAGE, pseudo_relevance: false, blend_importance: false, post_hoc_importance: false, expansion_limit: 0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub results: RankedList,
    /// Hits before truncation to `k`, capped at the considered result count.
    pub total_hits: usize,
    /// Empty unless pseudo-relevance feedback ran.
    pub expansion_terms: Vec<Term>,
}

/// A ranker plus the document tokens feedback needs. Read-only after construction.
#[derive(Debug, Clone)]
pub struct SearchSession {
    ranker: TfIdfRanker,
    doc_tokens: DocTokens,
    feedback: FeedbackConfig,
    max_results: usize,
}

impl SearchSession {
    pub fn new(ranker: TfIdfRanker, doc_tokens: DocTokens, feedback: FeedbackConfig) -> Result<Self> {
        feedback.validate()?;
        Ok(Self { ranker, doc_tokens, feedback, max_results: MAX_RESULTS_TO_CONSIDER })
    }

    /// Builds the ranker from builder artifacts. Without a precomputed length
    /// table the lengths are computed from `doc_tokens`.
    pub fn from_parts(
        raw: RawIndex,
        doc_tokens: DocTokens,
        importance: ImportanceScores,
        lengths: Option<DocumentLengths>,
        ranker_config: RankerConfig,
        feedback: FeedbackConfig,
    ) -> Result<Self> {
        let ranker = match lengths {
            Some(lengths) => TfIdfRanker::with_lengths(raw, lengths, importance, ranker_config)?,
            None => TfIdfRanker::new(raw, &doc_tokens, importance, ranker_config)?,
        };
        Self::new(ranker, doc_tokens, feedback)
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn ranker(&self) -> &TfIdfRanker { &self.ranker }
    pub fn doc_tokens(&self) -> &DocTokens { &self.doc_tokens }

    /// Ranks `query`, optionally expanding it from the top of the initial ranking.
    pub fn search(&self, query: &[Term], options: &SearchOptions) -> Result<SearchOutcome> {
        if options.blend_importance && options.post_hoc_importance {
            return Err(RankError::Configuration("importance can be blended early or post hoc, not both".into()));
        }
        let mut initial = self.ranker.retrieve(query, options.blend_importance)?;
        initial.truncate(self.max_results);

        let (mut results, expansion_terms) = if options.pseudo_relevance {
            let prf = PseudoRelevanceFeedback::new(self.ranker.index(), &initial, &self.doc_tokens, self.feedback.clone());
            let context = prf.run().aggregate_context();
            let expansion = context.expansion_tokens(query, options.expansion_limit);
            tracing::debug!(?expansion, "query expanded");
            let mut expanded = self.ranker.retrieve_expanded(query, &expansion)?;
            expanded.truncate(self.max_results);
            (expanded, expansion)
        } else {
            (initial, Vec::new())
        };

        if options.post_hoc_importance {
            results = self.ranker.rerank_with_importance(results);
        }
        let total_hits = results.len();
        results.truncate(options.k);
        Ok(SearchOutcome { results, total_hits, expansion_terms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocId;

    fn terms(words: &[&str]) -> Vec<Term> { words.iter().map(|w| w.to_string()).collect() }

    fn session(importance: ImportanceScores) -> SearchSession {
        let docs = [
            terms(&["rust", "cargo", "crate"]),
            terms(&["rust", "borrow", "crate", "crate"]),
            terms(&["python", "pip"]),
            terms(&["cargo", "ship", "port"]),
            terms(&["garden", "soil"]),
        ];
        let mut raw = RawIndex::new();
        let mut tokens = DocTokens::new();
        for (doc, words) in docs.into_iter().enumerate() {
            raw.add_document(doc as DocId, &words);
            tokens.insert(doc as DocId, words);
        }
        SearchSession::from_parts(raw, tokens, importance, None, RankerConfig::new(5), FeedbackConfig::default()).unwrap()
    }

    #[test]
    fn plain_search_has_no_expansion() {
        let out = session(ImportanceScores::new()).search(&terms(&["rust"]), &SearchOptions::default()).unwrap();
        assert!(out.expansion_terms.is_empty());
        assert_eq!(out.total_hits, 2);
    }

    #[test]
    fn feedback_expands_and_reaches_new_documents() {
        let options = SearchOptions { pseudo_relevance: true, ..SearchOptions::default() };
        let out = session(ImportanceScores::new()).search(&terms(&["rust"]), &options).unwrap();
        assert!(!out.expansion_terms.contains(&"rust".to_string()));
        assert!(out.expansion_terms.contains(&"cargo".to_string()));
        // doc 3 shares only "cargo" with the expanded query
        assert!(out.results.iter().any(|&(doc, _)| doc == 3));
    }

    #[test]
    fn results_are_truncated_to_k() {
        let options = SearchOptions { k: 1, ..SearchOptions::default() };
        let out = session(ImportanceScores::new()).search(&terms(&["crate", "cargo"]), &options).unwrap();
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.total_hits, 3);
    }

    #[test]
    fn both_importance_modes_are_rejected() {
        let options = SearchOptions { blend_importance: true, post_hoc_importance: true, ..SearchOptions::default() };
        let err = session(ImportanceScores::new()).search(&terms(&["rust"]), &options).unwrap_err();
        assert!(matches!(err, RankError::Configuration(_)));
    }

    #[test]
    fn post_hoc_importance_matches_early_blend_without_feedback() {
        let importance: ImportanceScores = [(1, 0.4), (0, 0.1)].into_iter().collect();
        let s = session(importance);
        let early = SearchOptions { blend_importance: true, ..SearchOptions::default() };
        let late = SearchOptions { post_hoc_importance: true, ..SearchOptions::default() };
        let a = s.search(&terms(&["rust"]), &early).unwrap();
        let b = s.search(&terms(&["rust"]), &late).unwrap();
        let order = |o: &SearchOutcome| o.results.iter().map(|&(d, _)| d).collect::<Vec<_>>();
        assert_eq!(order(&a), order(&b));
        assert_eq!(order(&a), vec![1, 0]);
    }
}
