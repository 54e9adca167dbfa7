//! Tiered conversational memory
//!
//! Recent turns come from the ledger, digests from the summarizer and
//! episodic facts from extraction plus ranking. The coordinator ties them
//! together per turn.

pub mod context;
pub mod coordinator;
pub mod embedding;
pub mod extraction;
pub mod keys;
pub mod ledger;
pub mod prompts;
pub mod ranker;
pub mod summarizer;
pub mod types;
pub mod views;

pub use coordinator::{DEFAULT_SESSION, MemoryCoordinator, SummaryTriggers, TurnStage};
pub use extraction::{EpisodeExtractor, ExtractionPolicy, score_importance};
pub use keys::{Identifier, IdentifierError, SessionKey};
pub use ledger::MessageLedger;
pub use ranker::{LinearRanker, RelevanceRanker, cosine_similarity};
pub use summarizer::Summarizer;
pub use types::{DailyCount, Digest, DigestKind, DigestScope, Episode, Role, ScoredEpisode, Turn};
pub use views::{AggregateView, MemorySnapshot, MemoryView, TurnReply};
