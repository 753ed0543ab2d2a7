use crate::DocId;

/// Errors raised by the ranking engine.
///
/// All of these are local, synchronous failures returned to the immediate
/// caller. Query terms missing from the vocabulary are not errors; they
/// contribute nothing to a score.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RankError {
    /// Corpus size is zero, or the declared corpus size disagrees with the
    /// index contents (a posting for a doc id outside `[0, N)`, a term in more
    /// documents than the corpus holds, an importance score outside `[0, 1]`).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A structural input cannot produce a finite weight, e.g. an empty posting map.
    #[error("domain error: {0}")]
    Domain(String),
    /// The query has no terms, or its vector has zero length.
    #[error("empty query")]
    EmptyQuery,
    /// A document with nonzero similarity has no (or zero) length.
    #[error("document {0} has zero length")]
    ZeroLengthDocument(DocId),
}

pub type Result<T> = std::result::Result<T, RankError>;
