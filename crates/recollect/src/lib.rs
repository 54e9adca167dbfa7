//! Recollect - tiered conversational memory for LLM chat
//!
//! Every turn is logged to a per-session ledger, salient facts are extracted
//! into an episodic store with embeddings, and rolling digests summarize the
//! session and the user's whole history. The coordinator assembles all of it
//! into the prompt for the next reply.

pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod storage;
pub mod testing;

pub use error::RecollectError;
