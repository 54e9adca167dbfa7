//! Session and lifetime digests
//!
//! Digests are append-only snapshots. The current digest of a scope is simply
//! the newest one written for it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::memory::ledger::MessageLedger;
use crate::memory::prompts::{lifetime_digest_prompt, session_digest_prompt};
use crate::memory::types::{Digest, DigestScope, Turn};
use crate::providers::TextGenerator;
use crate::storage::{DigestFilter, MemoryStore};

#[derive(Clone)]
pub struct Summarizer {
    store: Arc<dyn MemoryStore>,
    ledger: MessageLedger,
    generator: Arc<dyn TextGenerator>,
    session_turns: usize,
    lifetime_sources: usize,
}

impl Summarizer {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        generator: Arc<dyn TextGenerator>,
        config: &MemoryConfig,
    ) -> Self {
        Self {
            ledger: MessageLedger::new(Arc::clone(&store)),
            store,
            generator,
            session_turns: config.session_digest_turns,
            lifetime_sources: config.lifetime_digest_sources,
        }
    }

    /// Text of the newest digest in `scope`, if one exists
    pub async fn current_digest(
        &self,
        user_id: &str,
        scope: &DigestScope,
    ) -> Result<Option<String>> {
        let filter = match scope {
            DigestScope::Session { session_id } => {
                DigestFilter::sessions(user_id, Some(session_id))
            }
            DigestScope::Lifetime => DigestFilter::lifetime(user_id),
        };

        let digests = self.store.recent_digests(&filter, 1).await?;
        Ok(digests.into_iter().next().map(|d| d.text))
    }

    /// Digest the last turns of a session. An empty session yields "" and
    /// writes nothing.
    pub async fn summarize_session(&self, user_id: &str, session_id: &str) -> Result<String> {
        let turns = self
            .ledger
            .recent(user_id, session_id, self.session_turns)
            .await?;

        if turns.is_empty() {
            debug!("No turns in session {}, skipping session digest", session_id);
            return Ok(String::new());
        }

        let conversation = turns.iter().map(Turn::render).collect::<Vec<_>>().join("\n");
        let text = self
            .generator
            .generate(&session_digest_prompt(&conversation))
            .await
            .map_err(|e| e.into_generation_error())?;

        self.store
            .append_digest(&Digest::new(user_id, DigestScope::session(session_id), text.clone()))
            .await?;

        info!(
            "Wrote session digest for {}/{} from {} turns",
            user_id,
            session_id,
            turns.len()
        );
        Ok(text)
    }

    /// Consolidate the newest session digests into a lifetime profile. With
    /// no session digests yields "" and writes nothing.
    pub async fn summarize_lifetime(&self, user_id: &str) -> Result<String> {
        let sources = self
            .store
            .recent_digests(&DigestFilter::sessions(user_id, None), self.lifetime_sources)
            .await?;

        if sources.is_empty() {
            debug!("No session digests for {}, skipping lifetime digest", user_id);
            return Ok(String::new());
        }

        let combined = sources
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = self
            .generator
            .generate(&lifetime_digest_prompt(&combined))
            .await
            .map_err(|e| e.into_generation_error())?;

        self.store
            .append_digest(&Digest::new(user_id, DigestScope::Lifetime, text.clone()))
            .await?;

        info!(
            "Wrote lifetime digest for {} from {} session digests",
            user_id,
            sources.len()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecollectError;
    use crate::memory::types::Role;
    use crate::storage::InMemoryStore;
    use crate::testing::{FailingGenerator, ScriptedGenerator};

    fn setup(generator: Arc<dyn TextGenerator>) -> (Arc<dyn MemoryStore>, Summarizer) {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let summarizer = Summarizer::new(Arc::clone(&store), generator, &MemoryConfig::default());
        (store, summarizer)
    }

    #[tokio::test]
    async fn test_empty_session_writes_nothing() {
        let generator = Arc::new(ScriptedGenerator::new(["never used"]));
        let (store, summarizer) = setup(generator.clone());

        let text = summarizer.summarize_session("u1", "s1").await.unwrap();
        assert_eq!(text, "");
        assert!(generator.prompts().is_empty());
        assert!(
            store
                .recent_digests(&DigestFilter::user("u1"), 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_session_digest_uses_last_turns_in_order() {
        let generator = Arc::new(ScriptedGenerator::new(["- bullet"]));
        let (store, summarizer) = setup(generator.clone());
        let ledger = MessageLedger::new(Arc::clone(&store));

        for i in 0..25 {
            ledger
                .append("u1", "s1", Role::User, &format!("turn {i}"))
                .await
                .unwrap();
        }

        let text = summarizer.summarize_session("u1", "s1").await.unwrap();
        assert_eq!(text, "- bullet");

        let prompt = &generator.prompts()[0];
        assert!(!prompt.contains("user: turn 4\n"));
        assert!(prompt.contains("user: turn 5\nuser: turn 6\n"));
        assert!(prompt.contains("user: turn 24\n\n"));

        assert_eq!(
            summarizer
                .current_digest("u1", &DigestScope::session("s1"))
                .await
                .unwrap(),
            Some("- bullet".to_string())
        );
    }

    #[tokio::test]
    async fn test_lifetime_none_until_written() {
        let generator = Arc::new(ScriptedGenerator::new(["session one", "profile"]));
        let (store, summarizer) = setup(generator.clone());
        let ledger = MessageLedger::new(Arc::clone(&store));

        assert_eq!(
            summarizer
                .current_digest("u1", &DigestScope::Lifetime)
                .await
                .unwrap(),
            None
        );
        assert_eq!(summarizer.summarize_lifetime("u1").await.unwrap(), "");

        ledger.append("u1", "s1", Role::User, "hello").await.unwrap();
        summarizer.summarize_session("u1", "s1").await.unwrap();
        summarizer.summarize_lifetime("u1").await.unwrap();

        assert_eq!(
            summarizer
                .current_digest("u1", &DigestScope::Lifetime)
                .await
                .unwrap(),
            Some("profile".to_string())
        );
        assert!(generator.prompts()[1].contains("session one"));
    }

    #[tokio::test]
    async fn test_current_digest_is_newest_of_several() {
        let generator = Arc::new(ScriptedGenerator::new([
            "session v1",
            "profile v1",
            "session v2",
            "profile v2",
        ]));
        let (store, summarizer) = setup(generator);
        let ledger = MessageLedger::new(Arc::clone(&store));
        ledger.append("u1", "s1", Role::User, "hello").await.unwrap();

        for _ in 0..2 {
            summarizer.summarize_session("u1", "s1").await.unwrap();
            summarizer.summarize_lifetime("u1").await.unwrap();
        }

        let lifetime = store
            .recent_digests(&DigestFilter::lifetime("u1"), 10)
            .await
            .unwrap();
        assert_eq!(lifetime.len(), 2);

        assert_eq!(
            summarizer
                .current_digest("u1", &DigestScope::Lifetime)
                .await
                .unwrap(),
            Some("profile v2".to_string())
        );
        assert_eq!(
            summarizer
                .current_digest("u1", &DigestScope::session("s1"))
                .await
                .unwrap(),
            Some("session v2".to_string())
        );
    }

    #[tokio::test]
    async fn test_lifetime_uses_newest_sources_first() {
        let generator = Arc::new(ScriptedGenerator::new(["profile"]));
        let (store, summarizer) = setup(generator.clone());

        for i in 0..7 {
            store
                .append_digest(&Digest::new(
                    "u1",
                    DigestScope::session(&format!("s{i}")),
                    format!("digest {i}"),
                ))
                .await
                .unwrap();
        }

        summarizer.summarize_lifetime("u1").await.unwrap();
        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("digest 6\n\ndigest 5\n\ndigest 4\n\ndigest 3\n\ndigest 2\n\n"));
        assert!(!prompt.contains("digest 1"));
    }

    #[tokio::test]
    async fn test_generation_failure_writes_nothing() {
        let (store, summarizer) = setup(Arc::new(FailingGenerator::unavailable()));
        MessageLedger::new(Arc::clone(&store))
            .append("u1", "s1", Role::User, "hello")
            .await
            .unwrap();

        let err = summarizer.summarize_session("u1", "s1").await.unwrap_err();
        assert!(matches!(err, RecollectError::GenerationUnavailable(_)));
        assert!(
            store
                .recent_digests(&DigestFilter::user("u1"), 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
