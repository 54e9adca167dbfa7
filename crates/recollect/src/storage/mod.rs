//! Document store abstraction
//!
//! The engine needs append, filtered scans sorted by creation time, counts and
//! a per-day rollup. Nothing is ever updated or deleted.

pub mod filter;
pub mod in_memory;
pub mod lance;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{RecollectError, Result};
use crate::memory::types::{DailyCount, Digest, Episode, Turn};

pub use filter::{DigestFilter, TurnFilter};
pub use in_memory::InMemoryStore;
pub use lance::LanceStore;

/// Append-only persistence for turns, episodes and digests.
///
/// Scan methods named `recent_*` return newest-first; `episodes_for_user`
/// returns the full chronological scan the ranker works from.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn append_turn(&self, turn: &Turn) -> Result<()>;

    /// Turns matching `filter`, newest first, at most `limit`
    async fn recent_turns(&self, filter: &TurnFilter, limit: usize) -> Result<Vec<Turn>>;

    async fn count_turns(&self, filter: &TurnFilter) -> Result<usize>;

    /// Turn counts per UTC day for a user, newest day first, at most `max_days`
    async fn daily_turn_counts(&self, user_id: &str, max_days: usize) -> Result<Vec<DailyCount>>;

    async fn append_episode(&self, episode: &Episode) -> Result<()>;

    /// Every episode of a user, oldest first
    async fn episodes_for_user(&self, user_id: &str) -> Result<Vec<Episode>>;

    /// Episodes of a user, newest first, at most `limit`
    async fn recent_episodes(&self, user_id: &str, limit: usize) -> Result<Vec<Episode>>;

    async fn append_digest(&self, digest: &Digest) -> Result<()>;

    /// Digests matching `filter`, newest first, at most `limit`
    async fn recent_digests(&self, filter: &DigestFilter, limit: usize) -> Result<Vec<Digest>>;
}

/// Open the backend selected in configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn MemoryStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-process storage; memory will not survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StorageBackend::Lance => {
            let data_dir = &config.data_dir;
            tracing::info!("Initializing storage at: {}", data_dir.display());
            std::fs::create_dir_all(data_dir).map_err(|e| {
                RecollectError::Storage(format!(
                    "Failed to create data directory {}: {}",
                    data_dir.display(),
                    e
                ))
            })?;
            Ok(Arc::new(LanceStore::open(data_dir).await?))
        }
    }
}

/// Something with a creation timestamp
pub(crate) trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

impl Timestamped for Turn {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for Episode {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for Digest {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Sort rows given in insertion order newest-first. Equal timestamps keep
/// the later insertion in front.
pub(crate) fn newest_first<T: Timestamped>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    rows.reverse();
    rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    rows.truncate(limit);
    rows
}

/// Sort rows given in insertion order oldest-first, insertion order on ties
pub(crate) fn oldest_first<T: Timestamped>(mut rows: Vec<T>) -> Vec<T> {
    rows.sort_by_key(|r| r.created_at());
    rows
}

/// Group timestamps by UTC calendar day
pub(crate) fn rollup_daily(
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
    max_days: usize,
) -> Vec<DailyCount> {
    let mut days: BTreeMap<String, usize> = BTreeMap::new();
    for ts in timestamps {
        *days.entry(ts.format("%Y-%m-%d").to_string()).or_default() += 1;
    }

    days.into_iter()
        .rev()
        .take(max_days)
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}
