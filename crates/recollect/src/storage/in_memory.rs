//! Process-local store with the same scan semantics as [`LanceStore`](super::LanceStore)

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::memory::types::{DailyCount, Digest, Episode, Turn};
use crate::storage::filter::{DigestFilter, TurnFilter};
use crate::storage::{MemoryStore, newest_first, oldest_first, rollup_daily};

/// Vectors kept in insertion order behind async read/write locks
#[derive(Debug, Default)]
pub struct InMemoryStore {
    turns: RwLock<Vec<Turn>>,
    episodes: RwLock<Vec<Episode>>,
    digests: RwLock<Vec<Digest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn append_turn(&self, turn: &Turn) -> Result<()> {
        self.turns.write().await.push(turn.clone());
        Ok(())
    }

    async fn recent_turns(&self, filter: &TurnFilter, limit: usize) -> Result<Vec<Turn>> {
        let rows: Vec<Turn> = self
            .turns
            .read()
            .await
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        Ok(newest_first(rows, limit))
    }

    async fn count_turns(&self, filter: &TurnFilter) -> Result<usize> {
        Ok(self
            .turns
            .read()
            .await
            .iter()
            .filter(|t| filter.matches(t))
            .count())
    }

    async fn daily_turn_counts(&self, user_id: &str, max_days: usize) -> Result<Vec<DailyCount>> {
        let filter = TurnFilter::user(user_id);
        let turns = self.turns.read().await;
        Ok(rollup_daily(
            turns
                .iter()
                .filter(|t| filter.matches(t))
                .map(|t| t.created_at),
            max_days,
        ))
    }

    async fn append_episode(&self, episode: &Episode) -> Result<()> {
        self.episodes.write().await.push(episode.clone());
        Ok(())
    }

    async fn episodes_for_user(&self, user_id: &str) -> Result<Vec<Episode>> {
        let rows: Vec<Episode> = self
            .episodes
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(oldest_first(rows))
    }

    async fn recent_episodes(&self, user_id: &str, limit: usize) -> Result<Vec<Episode>> {
        let rows: Vec<Episode> = self
            .episodes
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, limit))
    }

    async fn append_digest(&self, digest: &Digest) -> Result<()> {
        self.digests.write().await.push(digest.clone());
        Ok(())
    }

    async fn recent_digests(&self, filter: &DigestFilter, limit: usize) -> Result<Vec<Digest>> {
        let rows: Vec<Digest> = self
            .digests
            .read()
            .await
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        Ok(newest_first(rows, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{DigestScope, Role};

    #[tokio::test]
    async fn test_recent_turns_newest_first_within_partition() {
        let store = InMemoryStore::new();
        store
            .append_turn(&Turn::new("u1", "s1", Role::User, "one"))
            .await
            .unwrap();
        store
            .append_turn(&Turn::new("u1", "s2", Role::User, "other session"))
            .await
            .unwrap();
        store
            .append_turn(&Turn::new("u1", "s1", Role::Assistant, "two"))
            .await
            .unwrap();

        let turns = store
            .recent_turns(&TurnFilter::session("u1", "s1"), 10)
            .await
            .unwrap();
        let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn test_count_turns_by_role() {
        let store = InMemoryStore::new();
        for i in 0..3 {
            store
                .append_turn(&Turn::new("u1", "s1", Role::User, &format!("q{i}")))
                .await
                .unwrap();
            store
                .append_turn(&Turn::new("u1", "s1", Role::Assistant, &format!("a{i}")))
                .await
                .unwrap();
        }

        let filter = TurnFilter::session("u1", "s1").with_role(Role::User);
        assert_eq!(store.count_turns(&filter).await.unwrap(), 3);
        assert_eq!(
            store
                .count_turns(&TurnFilter::session("u1", "s1"))
                .await
                .unwrap(),
            6
        );
    }

    #[tokio::test]
    async fn test_episodes_scoped_to_user() {
        let store = InMemoryStore::new();
        store
            .append_episode(&Episode::new("u1", "s1", "mine".into(), 0.5, vec![1.0]))
            .await
            .unwrap();
        store
            .append_episode(&Episode::new("u2", "s1", "theirs".into(), 0.5, vec![1.0]))
            .await
            .unwrap();

        let episodes = store.episodes_for_user("u1").await.unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].fact, "mine");
    }

    #[tokio::test]
    async fn test_recent_digests_by_scope() {
        let store = InMemoryStore::new();
        store
            .append_digest(&Digest::new("u1", DigestScope::session("s1"), "s".into()))
            .await
            .unwrap();
        store
            .append_digest(&Digest::new("u1", DigestScope::Lifetime, "l".into()))
            .await
            .unwrap();

        let lifetime = store
            .recent_digests(&DigestFilter::lifetime("u1"), 1)
            .await
            .unwrap();
        assert_eq!(lifetime.len(), 1);
        assert_eq!(lifetime[0].text, "l");

        let all = store
            .recent_digests(&DigestFilter::user("u1"), 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
