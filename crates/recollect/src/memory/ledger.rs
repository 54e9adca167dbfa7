//! Message ledger: the append-only log of turns per (user, session)

use std::sync::Arc;

use crate::error::Result;
use crate::memory::types::{Role, Turn, TurnId};
use crate::storage::{MemoryStore, TurnFilter};

#[derive(Clone)]
pub struct MessageLedger {
    store: Arc<dyn MemoryStore>,
}

impl MessageLedger {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Record one utterance
    pub async fn append(
        &self,
        user_id: &str,
        session_id: &str,
        role: Role,
        text: &str,
    ) -> Result<TurnId> {
        let turn = Turn::new(user_id, session_id, role, text);
        self.store.append_turn(&turn).await?;
        Ok(turn.id)
    }

    /// The last `limit` turns of a session, oldest first.
    ///
    /// The store hands back the newest `limit` turns newest-first; reversing
    /// them yields the tail of the log in conversation order.
    pub async fn recent(&self, user_id: &str, session_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let mut turns = self
            .store
            .recent_turns(&TurnFilter::session(user_id, session_id), limit)
            .await?;
        turns.reverse();
        Ok(turns)
    }

    pub async fn count_by_role(
        &self,
        user_id: &str,
        session_id: &str,
        role: Role,
    ) -> Result<usize> {
        self.store
            .count_turns(&TurnFilter::session(user_id, session_id).with_role(role))
            .await
    }

    /// Session of the user's newest turn, if any
    pub async fn latest_session(&self, user_id: &str) -> Result<Option<String>> {
        let turns = self
            .store
            .recent_turns(&TurnFilter::user(user_id), 1)
            .await?;
        Ok(turns.into_iter().next().map(|t| t.session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn ledger() -> MessageLedger {
        MessageLedger::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_recent_returns_tail_in_order() {
        let ledger = ledger();
        for i in 0..20 {
            ledger
                .append("u1", "s1", Role::User, &format!("message {i}"))
                .await
                .unwrap();
        }

        let turns = ledger.recent("u1", "s1", 16).await.unwrap();
        assert_eq!(turns.len(), 16);
        assert_eq!(turns.first().unwrap().text, "message 4");
        assert_eq!(turns.last().unwrap().text, "message 19");
    }

    #[tokio::test]
    async fn test_recent_shorter_than_limit() {
        let ledger = ledger();
        ledger.append("u1", "s1", Role::User, "hi").await.unwrap();
        ledger
            .append("u1", "s1", Role::Assistant, "hello")
            .await
            .unwrap();

        let turns = ledger.recent("u1", "s1", 16).await.unwrap();
        let rendered: Vec<String> = turns.iter().map(Turn::render).collect();
        assert_eq!(rendered, vec!["user: hi", "assistant: hello"]);
    }

    #[tokio::test]
    async fn test_recent_empty_session() {
        let ledger = ledger();
        assert!(ledger.recent("u1", "nobody", 16).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_by_role() {
        let ledger = ledger();
        ledger.append("u1", "s1", Role::User, "a").await.unwrap();
        ledger.append("u1", "s1", Role::Assistant, "b").await.unwrap();
        ledger.append("u1", "s1", Role::User, "c").await.unwrap();
        ledger.append("u1", "s2", Role::User, "d").await.unwrap();

        assert_eq!(ledger.count_by_role("u1", "s1", Role::User).await.unwrap(), 2);
        assert_eq!(
            ledger
                .count_by_role("u1", "s1", Role::Assistant)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_latest_session() {
        let ledger = ledger();
        assert_eq!(ledger.latest_session("u1").await.unwrap(), None);

        ledger.append("u1", "morning", Role::User, "a").await.unwrap();
        ledger.append("u1", "evening", Role::User, "b").await.unwrap();

        assert_eq!(
            ledger.latest_session("u1").await.unwrap(),
            Some("evening".to_string())
        );
    }
}
