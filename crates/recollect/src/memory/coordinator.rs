//! Memory coordinator: one conversational turn end to end
//!
//! A turn moves through [`TurnStage`]s in order. Turns of the same
//! (user, session) are serialized; different sessions run in parallel.
//! Summarization runs after the reply and never affects it. In deferred mode
//! it runs on a spawned task that still holds the session lock, so the next
//! turn of the session sees its digests.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::MemoryConfig;
use crate::error::{RecollectError, Result};
use crate::memory::context::ContextSections;
use crate::memory::embedding::ResilientEmbedder;
use crate::memory::extraction::{EpisodeExtractor, ExtractionPolicy};
use crate::memory::keys::{Identifier, SessionKey};
use crate::memory::ledger::MessageLedger;
use crate::memory::ranker::{LinearRanker, RelevanceRanker};
use crate::memory::summarizer::Summarizer;
use crate::memory::types::{DigestScope, Role};
use crate::memory::views::{
    AggregateView, DigestPreview, EpisodeView, FactView, MemorySnapshot, MemoryView, TurnReply,
    TurnView,
};
use crate::providers::{Embedder, TextGenerator};
use crate::storage::{DigestFilter, MemoryStore};

/// Session used by the memory view when a user has no turns yet
pub const DEFAULT_SESSION: &str = "default";

const VIEW_EPISODES: usize = 20;
const VIEW_DIGESTS: usize = 10;
const VIEW_DAYS: usize = 30;

/// Lifecycle of a turn, logged at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Received,
    Logged,
    Extracted,
    Retrieved,
    Assembled,
    Replied,
    Summarized,
    Done,
}

impl TurnStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStage::Received => "received",
            TurnStage::Logged => "logged",
            TurnStage::Extracted => "extracted",
            TurnStage::Retrieved => "retrieved",
            TurnStage::Assembled => "assembled",
            TurnStage::Replied => "replied",
            TurnStage::Summarized => "summarized",
            TurnStage::Done => "done",
        }
    }
}

impl std::fmt::Display for TurnStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which digests a finished turn should refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryTriggers {
    pub session: bool,
    pub lifetime: bool,
}

impl SummaryTriggers {
    /// The two gates are independent: the session gate counts user turns in
    /// the session, the lifetime gate looks at the short-term window length.
    pub fn evaluate(user_turns: usize, window_len: usize, config: &MemoryConfig) -> Self {
        Self {
            session: is_multiple(user_turns, config.summarize_every_user_msgs),
            lifetime: is_multiple(window_len, config.lifetime_gate_modulo),
        }
    }

    pub fn any(&self) -> bool {
        self.session || self.lifetime
    }
}

fn is_multiple(value: usize, every: usize) -> bool {
    value > 0 && value.checked_rem(every) == Some(0)
}

type SessionLocks = DashMap<SessionKey, Arc<Mutex<()>>>;

/// Drop the map's lock for `key` when nobody else holds a handle to it
fn prune_session_lock(locks: &SessionLocks, key: &SessionKey) {
    locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
}

/// Exclusive access to one session. On drop the guard is released first,
/// then the lock entry is pruned if it went idle.
struct SessionPermit {
    key: SessionKey,
    locks: Arc<SessionLocks>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune_session_lock(&self.locks, &self.key);
    }
}

pub struct MemoryCoordinator {
    store: Arc<dyn MemoryStore>,
    ledger: MessageLedger,
    extractor: EpisodeExtractor,
    ranker: Arc<dyn RelevanceRanker>,
    summarizer: Summarizer,
    embedder: ResilientEmbedder,
    generator: Arc<dyn TextGenerator>,
    config: MemoryConfig,
    session_locks: Arc<SessionLocks>,
}

impl MemoryCoordinator {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        config: MemoryConfig,
    ) -> Self {
        let ranker: Arc<dyn RelevanceRanker> = Arc::new(LinearRanker::new(Arc::clone(&store)));
        Self::with_ranker(store, generator, embedder, ranker, config)
    }

    /// Build with a custom ranking strategy
    pub fn with_ranker(
        store: Arc<dyn MemoryStore>,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        ranker: Arc<dyn RelevanceRanker>,
        config: MemoryConfig,
    ) -> Self {
        let embedder = ResilientEmbedder::new(embedder, &config);
        let extractor = EpisodeExtractor::new(
            Arc::clone(&store),
            embedder.clone(),
            ExtractionPolicy::from(&config),
        );

        Self {
            ledger: MessageLedger::new(Arc::clone(&store)),
            summarizer: Summarizer::new(Arc::clone(&store), Arc::clone(&generator), &config),
            extractor,
            ranker,
            embedder,
            generator,
            store,
            config,
            session_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    async fn acquire_session(&self, key: SessionKey) -> SessionPermit {
        let lock = Arc::clone(self.session_locks.entry(key.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        SessionPermit {
            key,
            locks: Arc::clone(&self.session_locks),
            guard: Some(guard),
        }
    }

    /// Run one turn: persist the user message, gather memory, generate the
    /// reply, persist it and refresh digests when due.
    ///
    /// On generation failure the user turn stays persisted and the error is
    /// returned; no assistant turn is written.
    pub async fn record_turn_and_reply(
        &self,
        user_id: &str,
        session_id: &str,
        user_text: &str,
    ) -> Result<TurnReply> {
        let user = validate_identifier("user_id", user_id)?;
        let session = validate_identifier("session_id", session_id)?;
        if user_text.trim().is_empty() {
            return Err(RecollectError::InvalidInput(
                "message cannot be empty".to_string(),
            ));
        }
        let (user_id, session_id) = (user.as_str(), session.as_str());

        let permit = self
            .acquire_session(SessionKey::new(user_id, session_id))
            .await;
        self.trace_stage(user_id, session_id, TurnStage::Received);

        self.ledger
            .append(user_id, session_id, Role::User, user_text)
            .await?;
        self.trace_stage(user_id, session_id, TurnStage::Logged);

        let recent = self
            .ledger
            .recent(user_id, session_id, self.config.short_term_window)
            .await?;

        let extracted = self.extractor.extract(user_id, session_id, user_text).await?;
        debug!("Extracted {} episodes", extracted.len());
        self.trace_stage(user_id, session_id, TurnStage::Extracted);

        let query = self.embedder.embed(user_text).await;
        let facts = self
            .ranker
            .rank(user_id, &query, self.config.top_k_episodes)
            .await?;
        let session_digest = self
            .summarizer
            .current_digest(user_id, &DigestScope::session(session_id))
            .await?;
        let lifetime_digest = self
            .summarizer
            .current_digest(user_id, &DigestScope::Lifetime)
            .await?;
        self.trace_stage(user_id, session_id, TurnStage::Retrieved);

        let prompt = ContextSections {
            primer: &self.config.system_primer,
            lifetime_digest: lifetime_digest.as_deref(),
            session_digest: session_digest.as_deref(),
            recent: &recent,
            message: user_text,
            facts: &facts,
        }
        .assemble();
        self.trace_stage(user_id, session_id, TurnStage::Assembled);

        let reply = match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                let err = e.into_generation_error();
                error!(
                    user_id,
                    session_id,
                    provider = self.generator.name(),
                    "Reply generation failed: {}",
                    err
                );
                return Err(err);
            }
        };

        self.ledger
            .append(user_id, session_id, Role::Assistant, &reply)
            .await?;
        self.trace_stage(user_id, session_id, TurnStage::Replied);

        let user_turns = self
            .ledger
            .count_by_role(user_id, session_id, Role::User)
            .await?;
        let triggers = SummaryTriggers::evaluate(user_turns, recent.len(), &self.config);

        let snapshot = MemorySnapshot {
            short_term_count: recent.len(),
            session_digest,
            lifetime_digest,
            episodic_facts: facts.iter().map(FactView::from).collect(),
        };

        if !triggers.any() {
            self.trace_stage(user_id, session_id, TurnStage::Done);
            return Ok(TurnReply {
                reply,
                memory: snapshot,
            });
        }

        if self.config.defer_summaries {
            let summarizer = self.summarizer.clone();
            let (user_id, session_id) = (user_id.to_string(), session_id.to_string());
            tokio::spawn(async move {
                run_summaries(&summarizer, &user_id, &session_id, triggers, permit).await;
            });
        } else {
            run_summaries(&self.summarizer, user_id, session_id, triggers, permit).await;
        }

        Ok(TurnReply {
            reply,
            memory: snapshot,
        })
    }

    /// Wait until no session has a turn or summarization in flight
    pub async fn wait_idle(&self) {
        let locks: Vec<(SessionKey, Arc<Mutex<()>>)> = self
            .session_locks
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        for (key, lock) in locks {
            drop(lock.lock().await);
            drop(lock);
            prune_session_lock(&self.session_locks, &key);
        }
    }

    /// Most recent session of a user with its window, digests and episodes
    pub async fn memory_view(&self, user_id: &str) -> Result<MemoryView> {
        let user = validate_identifier("user_id", user_id)?;
        let user_id = user.as_str();

        let session_id = self
            .ledger
            .latest_session(user_id)
            .await?
            .unwrap_or_else(|| DEFAULT_SESSION.to_string());

        let short_term = self
            .ledger
            .recent(user_id, &session_id, self.config.short_term_window)
            .await?;
        let session_digest = self
            .summarizer
            .current_digest(user_id, &DigestScope::session(&session_id))
            .await?;
        let lifetime_digest = self
            .summarizer
            .current_digest(user_id, &DigestScope::Lifetime)
            .await?;
        let episodes = self.store.recent_episodes(user_id, VIEW_EPISODES).await?;

        Ok(MemoryView {
            user_id: user_id.to_string(),
            session_id,
            short_term: short_term.into_iter().map(TurnView::from).collect(),
            session_digest,
            lifetime_digest,
            recent_episodes: episodes.into_iter().map(EpisodeView::from).collect(),
        })
    }

    /// Daily activity, latest digests and latest episodes of a user
    pub async fn aggregate_view(&self, user_id: &str) -> Result<AggregateView> {
        let user = validate_identifier("user_id", user_id)?;
        let user_id = user.as_str();

        let daily_turn_counts = self.store.daily_turn_counts(user_id, VIEW_DAYS).await?;
        let digests = self
            .store
            .recent_digests(&DigestFilter::user(user_id), VIEW_DIGESTS)
            .await?;
        let episodes = self.store.recent_episodes(user_id, VIEW_EPISODES).await?;

        Ok(AggregateView {
            user_id: user_id.to_string(),
            daily_turn_counts,
            recent_digests: digests.into_iter().map(DigestPreview::from).collect(),
            recent_episodes: episodes.into_iter().map(EpisodeView::from).collect(),
        })
    }

    fn trace_stage(&self, user_id: &str, session_id: &str, stage: TurnStage) {
        debug!(user_id, session_id, stage = stage.as_str(), "turn stage");
    }
}

/// Refresh the due digests. Failures are logged and skipped. The session
/// permit is released once both are done.
async fn run_summaries(
    summarizer: &Summarizer,
    user_id: &str,
    session_id: &str,
    triggers: SummaryTriggers,
    _permit: SessionPermit,
) {
    if triggers.session {
        match summarizer.summarize_session(user_id, session_id).await {
            Ok(text) if !text.is_empty() => {
                info!("Session digest refreshed for {}/{}", user_id, session_id)
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Skipping session digest for {}/{}: {}",
                user_id, session_id, e
            ),
        }
    }

    if triggers.lifetime {
        match summarizer.summarize_lifetime(user_id).await {
            Ok(text) if !text.is_empty() => info!("Lifetime digest refreshed for {}", user_id),
            Ok(_) => {}
            Err(e) => warn!("Skipping lifetime digest for {}: {}", user_id, e),
        }
    }

    debug!(
        user_id,
        session_id,
        stage = TurnStage::Summarized.as_str(),
        "turn stage"
    );
}

fn validate_identifier(field: &str, value: &str) -> Result<Identifier> {
    Identifier::try_from(value)
        .map_err(|e| RecollectError::InvalidInput(format!("{field}: {e}")))
}
