//! Vector-space ranking engine: TF-IDF weighting, cosine similarity, importance
//! blending and pseudo-relevance feedback over a fixed, prebuilt corpus.

pub mod config;
pub mod corpus;
pub mod error;
pub mod feedback;
pub mod index;
pub mod length;
pub mod persist;
pub mod ranker;
pub mod session;
pub mod stats;
pub mod tokenizer;

pub use config::{FeedbackConfig, RankerConfig};
pub use corpus::{DocMeta, DocTokens, ImportanceScores};
pub use error::{RankError, Result};
pub use feedback::{ExtractedTerms, FeedbackContext, PseudoRelevanceFeedback};
pub use index::{to_tfidf, DocId, RawIndex, Term, WeightedIndex};
pub use length::{doc_length, DocumentLengths};
pub use ranker::{rank, rerank_with_importance, RankedList, Scores, TfIdfRanker};
pub use session::{SearchOptions, SearchOutcome, SearchSession};
pub use stats::{compute_idf, IdfTable};
