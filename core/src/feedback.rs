//! Pseudo-relevance feedback: query expansion from the top of an initial ranking.
//!
//! The flow is `PseudoRelevanceFeedback::run` -> `ExtractedTerms::aggregate_context`
//! -> `FeedbackContext::expansion_tokens`. Each step returns a new value, so
//! expansion terms cannot be requested before the context exists.

use crate::config::FeedbackConfig;
use crate::corpus::DocTokens;
use crate::index::{DocId, Term, WeightedIndex};
use std::collections::{HashMap, HashSet};

/// Terms with their weights, descending by weight, ties by term ascending.
pub type WeightedTerms = Vec<(Term, f32)>;

fn sort_weighted(terms: &mut WeightedTerms) {
    terms.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// Feedback over the candidate documents of one query. Not shared across queries.
pub struct PseudoRelevanceFeedback<'a> {
    index: &'a WeightedIndex,
    doc_tokens: &'a DocTokens,
    candidates: Vec<DocId>,
    config: FeedbackConfig,
}

impl<'a> PseudoRelevanceFeedback<'a> {
    /// Keeps the first `config.docs_for_expansion` documents of `ranked` as candidates.
    pub fn new(index: &'a WeightedIndex, ranked: &[(DocId, f32)], doc_tokens: &'a DocTokens, config: FeedbackConfig) -> Self {
        let candidates = ranked.iter().take(config.docs_for_expansion).map(|&(doc, _)| doc).collect();
        Self { index, doc_tokens, candidates, config }
    }

    pub fn candidates(&self) -> &[DocId] { &self.candidates }

    /// Highest-weighted distinct terms of `doc_id`, at most `top_terms_per_doc`.
    ///
    /// A document without a token list yields nothing, as does a token with
    /// no posting for the document.
    pub fn extract_top_terms(&self, doc_id: DocId) -> WeightedTerms {
        let Some(tokens) = self.doc_tokens.get(doc_id) else {
            tracing::debug!(doc_id, "feedback candidate has no token list");
            return Vec::new();
        };
        let mut seen: HashSet<&str> = HashSet::with_capacity(tokens.len());
        let mut terms: WeightedTerms = tokens
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .filter_map(|t| self.index.weight(t, doc_id).map(|w| (t.clone(), w)))
            .collect();
        sort_weighted(&mut terms);
        terms.truncate(self.config.top_terms_per_doc);
        terms
    }

    /// Extracts the top terms of every candidate, in ranked order.
    pub fn run(self) -> ExtractedTerms {
        let per_doc = self.candidates.iter().map(|&doc| (doc, self.extract_top_terms(doc))).collect();
        ExtractedTerms { per_doc, config: self.config }
    }
}

/// Top terms of each feedback candidate.
pub struct ExtractedTerms {
    per_doc: Vec<(DocId, WeightedTerms)>,
    config: FeedbackConfig,
}

impl ExtractedTerms {
    pub fn get(&self, doc_id: DocId) -> Option<&WeightedTerms> {
        self.per_doc.iter().find(|(doc, _)| *doc == doc_id).map(|(_, terms)| terms)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &WeightedTerms)> {
        self.per_doc.iter().map(|(doc, terms)| (*doc, terms))
    }

    /// Sums each term's weight over all candidates' top terms.
    pub fn aggregate_context(&self) -> FeedbackContext {
        let mut sums: HashMap<&str, f32> = HashMap::new();
        for (_, terms) in &self.per_doc {
            for (term, weight) in terms {
                *sums.entry(term.as_str()).or_insert(0.0) += weight;
            }
        }
        let mut terms: WeightedTerms = sums.into_iter().map(|(t, w)| (t.to_string(), w)).collect();
        sort_weighted(&mut terms);
        tracing::debug!(candidates = self.per_doc.len(), context_terms = terms.len(), "aggregated feedback context");
        FeedbackContext { terms, default_limit: self.config.expansion_tokens }
    }
}

/// Aggregated context terms of the feedback candidates.
pub struct FeedbackContext {
    terms: WeightedTerms,
    default_limit: usize,
}

impl FeedbackContext {
    pub fn terms(&self) -> &[(Term, f32)] { &self.terms }

    /// The first `limit` context terms with every term of `query` removed.
    /// A `limit` of 0 means the configured default.
    ///
    /// Query terms are removed after the cut, so fewer than `limit` terms may
    /// come back.
    pub fn expansion_tokens(&self, query: &[Term], limit: usize) -> Vec<Term> {
        let limit = if limit == 0 { self.default_limit } else { limit };
        let query: HashSet<&str> = query.iter().map(String::as_str).collect();
        self.terms
            .iter()
            .take(limit)
            .filter(|(term, _)| !query.contains(term.as_str()))
            .map(|(term, _)| term.clone())
            .collect()
    }
}
