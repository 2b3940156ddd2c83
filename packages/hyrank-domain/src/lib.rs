//! Pure ranking core: BM25 lexical scoring, recency buckets, and score fusion.
//!
//! Everything here is value-in/value-out. Callers pass the clock explicitly so results are
//! reproducible.

pub mod candidate;
pub mod fusion;
pub mod lexical;
pub mod recency;

pub use candidate::{Candidate, RankedResult, ScoreBreakdown, ScoredCandidate};
pub use fusion::{FusionConfig, FusionWeights};
pub use lexical::{Bm25Params, LexicalMatch, LexicalNormalization};
pub use recency::TimeBucket;
