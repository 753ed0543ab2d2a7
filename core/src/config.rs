//! Ranking and feedback tuning parameters.
//!
//! The constants are the defaults; `RankerConfig` and `FeedbackConfig` carry
//! the values a session actually runs with. Binaries override them from CLI
//! arguments.

use crate::error::{RankError, Result};

/// Weight applied to expansion terms relative to original query terms.
pub const DAMPING: f32 = 0.1;

/// Multiplier applied to a document's importance score before it is added
/// to its cosine score.
///
/// Importance lives in `[0, 1]` while cosine rarely exceeds 1, so a value of
/// 20 lets importance dominate the final order.
pub const IMPORTANCE_MULTIPLIER: f32 = 20.0;

/// Number of top-ranked documents used as feedback candidates.
pub const DOCS_FOR_EXPANSION: usize = 30;

/// Number of highest-weighted terms kept from each feedback candidate.
pub const TOP_TERMS_PER_DOC: usize = 10;

/// Number of aggregated context terms considered for query expansion.
pub const EXPANSION_TOKENS: usize = 10;

/// Length of the initial ranking kept before feedback and of the final list.
pub const MAX_RESULTS_TO_CONSIDER: usize = 100;

/// Default number of results handed back to a front end.
pub const RESULTS_PER_PAGE: usize = 10;

/// Scoring parameters for a `TfIdfRanker`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankerConfig {
    /// Corpus size `N`; doc ids live in `[0, N)`.
    pub num_docs: u32,
    pub damping: f32,
    pub importance_multiplier: f32,
}

impl RankerConfig {
    pub fn new(num_docs: u32) -> Self {
        Self { num_docs, damping: DAMPING, importance_multiplier: IMPORTANCE_MULTIPLIER }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_docs == 0 {
            return Err(RankError::Configuration("corpus size must be positive".into()));
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(RankError::Configuration(format!("invalid damping {}", self.damping)));
        }
        if !self.importance_multiplier.is_finite() || self.importance_multiplier < 0.0 {
            return Err(RankError::Configuration(format!(
                "invalid importance multiplier {}",
                self.importance_multiplier
            )));
        }
        Ok(())
    }
}

/// Pseudo-relevance feedback parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackConfig {
    pub docs_for_expansion: usize,
    pub top_terms_per_doc: usize,
    /// Used by `FeedbackContext::expansion_tokens` when the caller passes a limit of 0.
    pub expansion_tokens: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            docs_for_expansion: DOCS_FOR_EXPANSION,
            top_terms_per_doc: TOP_TERMS_PER_DOC,
            expansion_tokens: EXPANSION_TOKENS,
        }
    }
}

impl FeedbackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.docs_for_expansion == 0 || self.top_terms_per_doc == 0 || self.expansion_tokens == 0 {
            return Err(RankError::Configuration(format!("feedback sizes must be positive: {self:?}")));
        }
        Ok(())
    }
}
