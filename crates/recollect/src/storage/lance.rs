use std::path::Path;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, Float32Array, ListArray, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use uuid::Uuid;

use crate::error::{RecollectError, Result};
use crate::memory::types::{DailyCount, Digest, DigestKind, DigestScope, Episode, Role, Turn};
use crate::storage::filter::{DigestFilter, TurnFilter, sql_literal};
use crate::storage::{MemoryStore, newest_first, oldest_first, rollup_daily};

const TURNS_TABLE: &str = "turns";
const EPISODES_TABLE: &str = "episodes";
const DIGESTS_TABLE: &str = "digests";

/// LanceDB-backed store with one table per record kind.
///
/// Tables are append-only, so a scan returns rows in insertion order. Sorting
/// by `created_at` happens after the scan.
pub struct LanceStore {
    connection: Connection,
    turns: Table,
    episodes: Table,
    digests: Table,
}

impl LanceStore {
    /// Connect to the database at `path`, creating any missing tables
    pub async fn open(path: &Path) -> Result<Self> {
        let uri = path
            .to_str()
            .ok_or_else(|| RecollectError::Storage("Invalid path encoding".to_string()))?;

        let connection = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| RecollectError::Storage(format!("Failed to connect to LanceDB: {e}")))?;

        let turns = open_or_create(&connection, TURNS_TABLE, Self::turns_schema()).await?;
        let episodes = open_or_create(&connection, EPISODES_TABLE, Self::episodes_schema()).await?;
        let digests = open_or_create(&connection, DIGESTS_TABLE, Self::digests_schema()).await?;

        Ok(Self {
            connection,
            turns,
            episodes,
            digests,
        })
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RecollectError::Storage(format!("Failed to list tables: {e}")))?;

        Ok(names.contains(&name.to_string()))
    }

    fn timestamp_field(name: &str) -> Field {
        Field::new(
            name,
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        )
    }

    fn turns_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("session_id", DataType::Utf8, false),
            Field::new("role", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Self::timestamp_field("created_at"),
        ]))
    }

    fn episodes_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("session_id", DataType::Utf8, false),
            Field::new("fact", DataType::Utf8, false),
            Field::new("importance", DataType::Float32, false),
            // Variable length: a fallback vector may differ in dimension
            // from provider vectors.
            Field::new(
                "embedding",
                DataType::List(Arc::new(Field::new("item", DataType::Float32, true))),
                false,
            ),
            Self::timestamp_field("created_at"),
        ]))
    }

    fn digests_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("scope", DataType::Utf8, false),
            Field::new("session_id", DataType::Utf8, true),
            Field::new("text", DataType::Utf8, false),
            Self::timestamp_field("created_at"),
        ]))
    }

    fn turns_to_batch(turns: &[Turn]) -> Result<RecordBatch> {
        let ids: Vec<String> = turns.iter().map(|t| t.id.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let user_ids: Vec<&str> = turns.iter().map(|t| t.user_id.as_str()).collect();
        let session_ids: Vec<&str> = turns.iter().map(|t| t.session_id.as_str()).collect();
        let roles: Vec<&str> = turns.iter().map(|t| t.role.as_str()).collect();
        let texts: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
        let created_at: Vec<i64> = turns
            .iter()
            .map(|t| t.created_at.timestamp_micros())
            .collect();

        RecordBatch::try_new(
            Self::turns_schema(),
            vec![
                Arc::new(StringArray::from(id_refs)),
                Arc::new(StringArray::from(user_ids)),
                Arc::new(StringArray::from(session_ids)),
                Arc::new(StringArray::from(roles)),
                Arc::new(StringArray::from(texts)),
                Arc::new(TimestampMicrosecondArray::from(created_at).with_timezone("UTC")),
            ],
        )
        .map_err(|e| RecollectError::Storage(format!("Failed to create turn RecordBatch: {e}")))
    }

    fn batch_to_turn(batch: &RecordBatch, row: usize) -> Result<Turn> {
        let ids = column::<StringArray>(batch, "id")?;
        let user_ids = column::<StringArray>(batch, "user_id")?;
        let session_ids = column::<StringArray>(batch, "session_id")?;
        let roles = column::<StringArray>(batch, "role")?;
        let texts = column::<StringArray>(batch, "text")?;
        let created_at = column::<TimestampMicrosecondArray>(batch, "created_at")?;

        let role = Role::parse(roles.value(row)).ok_or_else(|| {
            RecollectError::Storage(format!("Unknown role: {}", roles.value(row)))
        })?;

        Ok(Turn {
            id: parse_uuid(ids.value(row))?,
            user_id: user_ids.value(row).to_string(),
            session_id: session_ids.value(row).to_string(),
            role,
            text: texts.value(row).to_string(),
            created_at: parse_timestamp(created_at.value(row))?,
        })
    }

    fn episodes_to_batch(episodes: &[Episode]) -> Result<RecordBatch> {
        let ids: Vec<String> = episodes.iter().map(|e| e.id.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let user_ids: Vec<&str> = episodes.iter().map(|e| e.user_id.as_str()).collect();
        let session_ids: Vec<&str> = episodes.iter().map(|e| e.session_id.as_str()).collect();
        let facts: Vec<&str> = episodes.iter().map(|e| e.fact.as_str()).collect();
        let importances: Vec<f32> = episodes.iter().map(|e| e.importance).collect();
        let embeddings: Vec<Option<Vec<Option<f32>>>> = episodes
            .iter()
            .map(|e| Some(e.embedding.iter().map(|&v| Some(v)).collect()))
            .collect();
        let created_at: Vec<i64> = episodes
            .iter()
            .map(|e| e.created_at.timestamp_micros())
            .collect();

        RecordBatch::try_new(
            Self::episodes_schema(),
            vec![
                Arc::new(StringArray::from(id_refs)),
                Arc::new(StringArray::from(user_ids)),
                Arc::new(StringArray::from(session_ids)),
                Arc::new(StringArray::from(facts)),
                Arc::new(Float32Array::from(importances)),
                Arc::new(ListArray::from_iter_primitive::<Float32Type, _, _>(
                    embeddings,
                )),
                Arc::new(TimestampMicrosecondArray::from(created_at).with_timezone("UTC")),
            ],
        )
        .map_err(|e| RecollectError::Storage(format!("Failed to create episode RecordBatch: {e}")))
    }

    fn batch_to_episode(batch: &RecordBatch, row: usize) -> Result<Episode> {
        let ids = column::<StringArray>(batch, "id")?;
        let user_ids = column::<StringArray>(batch, "user_id")?;
        let session_ids = column::<StringArray>(batch, "session_id")?;
        let facts = column::<StringArray>(batch, "fact")?;
        let importances = column::<Float32Array>(batch, "importance")?;
        let embeddings = column::<ListArray>(batch, "embedding")?;
        let created_at = column::<TimestampMicrosecondArray>(batch, "created_at")?;

        let embedding_list = embeddings.value(row);
        let embedding_values = embedding_list
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| RecollectError::Storage("Failed to get embedding values".to_string()))?;
        let embedding: Vec<f32> = embedding_values.values().to_vec();

        Ok(Episode {
            id: parse_uuid(ids.value(row))?,
            user_id: user_ids.value(row).to_string(),
            session_id: session_ids.value(row).to_string(),
            fact: facts.value(row).to_string(),
            importance: importances.value(row),
            embedding,
            created_at: parse_timestamp(created_at.value(row))?,
        })
    }

    fn digests_to_batch(digests: &[Digest]) -> Result<RecordBatch> {
        let ids: Vec<String> = digests.iter().map(|d| d.id.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let user_ids: Vec<&str> = digests.iter().map(|d| d.user_id.as_str()).collect();
        let scopes: Vec<&str> = digests.iter().map(|d| d.scope.kind().as_str()).collect();
        let session_ids: Vec<Option<&str>> =
            digests.iter().map(|d| d.scope.session_id()).collect();
        let texts: Vec<&str> = digests.iter().map(|d| d.text.as_str()).collect();
        let created_at: Vec<i64> = digests
            .iter()
            .map(|d| d.created_at.timestamp_micros())
            .collect();

        RecordBatch::try_new(
            Self::digests_schema(),
            vec![
                Arc::new(StringArray::from(id_refs)),
                Arc::new(StringArray::from(user_ids)),
                Arc::new(StringArray::from(scopes)),
                Arc::new(StringArray::from(session_ids)),
                Arc::new(StringArray::from(texts)),
                Arc::new(TimestampMicrosecondArray::from(created_at).with_timezone("UTC")),
            ],
        )
        .map_err(|e| RecollectError::Storage(format!("Failed to create digest RecordBatch: {e}")))
    }

    fn batch_to_digest(batch: &RecordBatch, row: usize) -> Result<Digest> {
        let ids = column::<StringArray>(batch, "id")?;
        let user_ids = column::<StringArray>(batch, "user_id")?;
        let scopes = column::<StringArray>(batch, "scope")?;
        let session_ids = column::<StringArray>(batch, "session_id")?;
        let texts = column::<StringArray>(batch, "text")?;
        let created_at = column::<TimestampMicrosecondArray>(batch, "created_at")?;

        let scope = match DigestKind::parse(scopes.value(row)) {
            Some(DigestKind::Lifetime) => DigestScope::Lifetime,
            Some(DigestKind::Session) => {
                if session_ids.is_null(row) {
                    return Err(RecollectError::Storage(
                        "Session digest without session_id".to_string(),
                    ));
                }
                DigestScope::session(session_ids.value(row))
            }
            None => {
                return Err(RecollectError::Storage(format!(
                    "Unknown digest scope: {}",
                    scopes.value(row)
                )));
            }
        };

        Ok(Digest {
            id: parse_uuid(ids.value(row))?,
            user_id: user_ids.value(row).to_string(),
            scope,
            text: texts.value(row).to_string(),
            created_at: parse_timestamp(created_at.value(row))?,
        })
    }

    async fn append(table: &Table, batch: RecordBatch, what: &str) -> Result<()> {
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| RecollectError::Storage(format!("Failed to insert {what}: {e}")))?;

        Ok(())
    }

    /// Run a filtered scan and convert every row
    async fn scan<T>(
        table: &Table,
        predicate: String,
        convert: fn(&RecordBatch, usize) -> Result<T>,
    ) -> Result<Vec<T>> {
        let stream = table
            .query()
            .only_if(predicate)
            .execute()
            .await
            .map_err(|e| {
                RecollectError::Storage(format!("Failed to query {}: {e}", table.name()))
            })?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| RecollectError::Storage(format!("Failed to collect query results: {e}")))?;

        let mut rows = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                rows.push(convert(batch, row)?);
            }
        }

        Ok(rows)
    }
}

#[async_trait]
impl MemoryStore for LanceStore {
    async fn append_turn(&self, turn: &Turn) -> Result<()> {
        let batch = Self::turns_to_batch(std::slice::from_ref(turn))?;
        Self::append(&self.turns, batch, "turn").await
    }

    async fn recent_turns(&self, filter: &TurnFilter, limit: usize) -> Result<Vec<Turn>> {
        let rows = Self::scan(&self.turns, filter.to_sql_clause(), Self::batch_to_turn).await?;
        Ok(newest_first(rows, limit))
    }

    async fn count_turns(&self, filter: &TurnFilter) -> Result<usize> {
        self.turns
            .count_rows(Some(filter.to_sql_clause()))
            .await
            .map_err(|e| RecollectError::Storage(format!("Failed to count turns: {e}")))
    }

    async fn daily_turn_counts(&self, user_id: &str, max_days: usize) -> Result<Vec<DailyCount>> {
        let rows = Self::scan(
            &self.turns,
            TurnFilter::user(user_id).to_sql_clause(),
            Self::batch_to_turn,
        )
        .await?;
        Ok(rollup_daily(rows.iter().map(|t| t.created_at), max_days))
    }

    async fn append_episode(&self, episode: &Episode) -> Result<()> {
        let batch = Self::episodes_to_batch(std::slice::from_ref(episode))?;
        Self::append(&self.episodes, batch, "episode").await
    }

    async fn episodes_for_user(&self, user_id: &str) -> Result<Vec<Episode>> {
        let rows = Self::scan(
            &self.episodes,
            format!("user_id = {}", sql_literal(user_id)),
            Self::batch_to_episode,
        )
        .await?;
        Ok(oldest_first(rows))
    }

    async fn recent_episodes(&self, user_id: &str, limit: usize) -> Result<Vec<Episode>> {
        let rows = Self::scan(
            &self.episodes,
            format!("user_id = {}", sql_literal(user_id)),
            Self::batch_to_episode,
        )
        .await?;
        Ok(newest_first(rows, limit))
    }

    async fn append_digest(&self, digest: &Digest) -> Result<()> {
        let batch = Self::digests_to_batch(std::slice::from_ref(digest))?;
        Self::append(&self.digests, batch, "digest").await
    }

    async fn recent_digests(&self, filter: &DigestFilter, limit: usize) -> Result<Vec<Digest>> {
        let rows =
            Self::scan(&self.digests, filter.to_sql_clause(), Self::batch_to_digest).await?;
        Ok(newest_first(rows, limit))
    }
}

async fn open_or_create(connection: &Connection, name: &str, schema: Arc<Schema>) -> Result<Table> {
    let names = connection
        .table_names()
        .execute()
        .await
        .map_err(|e| RecollectError::Storage(format!("Failed to list tables: {e}")))?;

    if names.iter().any(|n| n == name) {
        return connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RecollectError::Storage(format!("Failed to open {name} table: {e}")));
    }

    tracing::info!("Creating {} table", name);
    let batch = RecordBatch::new_empty(schema.clone());
    let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

    connection
        .create_table(name, Box::new(batches))
        .execute()
        .await
        .map_err(|e| RecollectError::Storage(format!("Failed to create {name} table: {e}")))
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| RecollectError::Storage(format!("Failed to get {name} column")))
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| RecollectError::Storage(format!("Failed to parse UUID: {e}")))
}

fn parse_timestamp(micros: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_micros(micros)
        .single()
        .ok_or_else(|| RecollectError::Storage("Failed to parse created_at timestamp".to_string()))
}
