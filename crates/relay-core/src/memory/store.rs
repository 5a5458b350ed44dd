//! ============================================================================
//! Memory Store - Vector store interface and the local redb-backed store
//! ============================================================================
//! The local store keeps every turn pair in an embedded redb database inside
//! the persist directory and ranks them by cosine similarity on read.
//! Keys follow `collection:uuid` so several collections can share one file;
//! collection names therefore may not contain `:`.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::{MemoryRecord, ScoredRecord};

/// File name of the local store inside the persist directory
pub const LOCAL_STORE_FILE: &str = "memory.redb";

// Table definitions
const COLLECTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");
const POINTS: TableDefinition<&str, &[u8]> = TableDefinition::new("points");

/// Similarity-searchable store of conversation turns
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this handle reads and writes
    fn collection_name(&self) -> &str;

    async fn collection_exists(&self) -> Result<bool>;

    async fn create_collection(&self, dimension: usize) -> Result<()>;

    /// Create the collection if missing. Returns true when it was created.
    async fn ensure_collection(&self, dimension: usize) -> Result<bool> {
        if self.collection_exists().await? {
            debug!("Collection {} already exists", self.collection_name());
            return Ok(false);
        }

        info!("Creating collection: {}", self.collection_name());
        self.create_collection(dimension).await?;
        info!("Collection {} created successfully", self.collection_name());
        Ok(true)
    }

    /// Append a record; it must carry an embedding
    async fn add(&self, record: &MemoryRecord) -> Result<()>;

    /// Top `limit` records by similarity to `query`, best first
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredRecord>>;

    /// Number of records in the collection
    async fn count(&self) -> Result<u64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionInfo {
    dimension: usize,
    created_at: i64,
}

/// On-disk vector store backed by redb
pub struct LocalVectorStore {
    db: Database,
    path: PathBuf,
    collection: String,
}

impl LocalVectorStore {
    /// Open (or create) the store inside `persist_dir`, creating the
    /// directory if it does not exist
    pub fn open(persist_dir: &Path, collection: &str) -> Result<Self> {
        // ':' separates the collection from the record id in keys
        if collection.is_empty() || collection.contains(':') {
            return Err(anyhow!(
                "Invalid collection name '{}': must be non-empty and contain no ':'",
                collection
            ));
        }

        std::fs::create_dir_all(persist_dir).map_err(|e| {
            anyhow!(
                "Failed to create persist directory {}: {}",
                persist_dir.display(),
                e
            )
        })?;

        let path = persist_dir.join(LOCAL_STORE_FILE);
        info!("Opening vector store at: {}", path.display());

        let db = Database::create(&path)
            .map_err(|e| anyhow!("Failed to open vector store: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(COLLECTIONS)
                .map_err(|e| anyhow!("Failed to create collections table: {}", e))?;
            let _ = write_txn
                .open_table(POINTS)
                .map_err(|e| anyhow!("Failed to create points table: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self {
            db,
            path,
            collection: collection.to_string(),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_prefix(&self) -> String {
        format!("{}:", self.collection)
    }

    fn collection_info(&self) -> Result<Option<CollectionInfo>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(COLLECTIONS)
            .map_err(|e| anyhow!("Failed to open collections table: {}", e))?;

        match table
            .get(self.collection.as_str())
            .map_err(|e| anyhow!("Failed to get collection: {}", e))?
        {
            Some(value) => {
                let info: CollectionInfo = bincode::deserialize(value.value())
                    .map_err(|e| anyhow!("Failed to deserialize collection info: {}", e))?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    /// Every record in this collection, in key order
    fn load_records(&self) -> Result<Vec<MemoryRecord>> {
        let prefix = self.key_prefix();

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(POINTS)
            .map_err(|e| anyhow!("Failed to open points table: {}", e))?;

        let mut records = Vec::new();
        let iter = table
            .range::<&str>(prefix.as_str()..)
            .map_err(|e| anyhow!("Failed to iterate points: {}", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let record: MemoryRecord = bincode::deserialize(value.value())
                .map_err(|e| anyhow!("Failed to deserialize record: {}", e))?;
            records.push(record);
        }

        Ok(records)
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.collection_info()?.is_some())
    }

    async fn create_collection(&self, dimension: usize) -> Result<()> {
        let info = CollectionInfo {
            dimension,
            created_at: chrono::Utc::now().timestamp(),
        };
        let value = bincode::serialize(&info)
            .map_err(|e| anyhow!("Failed to serialize collection info: {}", e))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(COLLECTIONS)
                .map_err(|e| anyhow!("Failed to open collections table: {}", e))?;
            table
                .insert(self.collection.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert collection: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit: {}", e))?;

        Ok(())
    }

    async fn add(&self, record: &MemoryRecord) -> Result<()> {
        if record.embedding.is_empty() {
            return Err(anyhow!("Cannot store memory without embedding"));
        }

        let info = self
            .collection_info()?
            .ok_or_else(|| anyhow!("Collection {} does not exist", self.collection))?;
        if record.embedding.len() != info.dimension {
            return Err(anyhow!(
                "Embedding dimension {} does not match collection dimension {}",
                record.embedding.len(),
                info.dimension
            ));
        }

        let key = format!("{}{}", self.key_prefix(), record.id);
        let value = bincode::serialize(record)
            .map_err(|e| anyhow!("Failed to serialize record: {}", e))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(POINTS)
                .map_err(|e| anyhow!("Failed to open points table: {}", e))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert record: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored memory {} in {}", record.id, self.collection);
        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        debug!("Searching {} (limit: {})", self.collection, limit);

        let mut scored: Vec<ScoredRecord> = self
            .load_records()?
            .into_iter()
            .map(|mut record| {
                let score = cosine_similarity(query, &record.embedding);
                record.embedding = Vec::new();
                ScoredRecord { record, score }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);

        debug!("Found {} matching memories", scored.len());
        Ok(scored)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.load_records()?.len() as u64)
    }
}

/// Cosine similarity; zero when either vector is empty, zero-length, or
/// the dimensions differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(input: &str, embedding: Vec<f32>) -> MemoryRecord {
        MemoryRecord::new(input.to_string(), "ok".to_string()).with_embedding(embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_open_creates_persist_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("chroma_db");

        let store = LocalVectorStore::open(&nested, "chat_history").unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.path(), nested.join(LOCAL_STORE_FILE));
    }

    #[tokio::test]
    async fn test_ensure_collection() {
        let dir = TempDir::new().unwrap();
        let store = LocalVectorStore::open(dir.path(), "chat_history").unwrap();

        assert!(!store.collection_exists().await.unwrap());
        assert!(store.ensure_collection(3).await.unwrap());
        assert!(store.collection_exists().await.unwrap());
        assert!(!store.ensure_collection(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_requires_collection_and_embedding() {
        let dir = TempDir::new().unwrap();
        let store = LocalVectorStore::open(dir.path(), "chat_history").unwrap();

        assert!(store.add(&record("a", vec![1.0, 0.0, 0.0])).await.is_err());

        store.ensure_collection(3).await.unwrap();
        assert!(store.add(&record("a", vec![])).await.is_err());
        assert!(store.add(&record("a", vec![1.0, 0.0])).await.is_err());
        assert!(store.add(&record("a", vec![1.0, 0.0, 0.0])).await.is_ok());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let dir = TempDir::new().unwrap();
        let store = LocalVectorStore::open(dir.path(), "chat_history").unwrap();
        store.ensure_collection(3).await.unwrap();

        store.add(&record("x", vec![1.0, 0.0, 0.0])).await.unwrap();
        store.add(&record("y", vec![0.0, 1.0, 0.0])).await.unwrap();
        store.add(&record("xy", vec![0.7, 0.7, 0.0])).await.unwrap();

        let hits = store.search(&[1.0, 0.1, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.input, "x");
        assert_eq!(hits[1].record.input, "xy");
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].record.embedding.is_empty());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = TempDir::new().unwrap();
        let history = LocalVectorStore::open(dir.path(), "chat_history").unwrap();
        history.ensure_collection(2).await.unwrap();
        history.add(&record("kept", vec![1.0, 0.0])).await.unwrap();
        drop(history);

        let other = LocalVectorStore::open(dir.path(), "chat").unwrap();
        other.ensure_collection(2).await.unwrap();
        assert_eq!(other.count().await.unwrap(), 0);
        assert!(other.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_collection_name_cannot_contain_separator() {
        let dir = TempDir::new().unwrap();
        assert!(LocalVectorStore::open(dir.path(), "chat:x").is_err());
        assert!(LocalVectorStore::open(dir.path(), "").is_err());
        assert!(LocalVectorStore::open(dir.path(), "chat").is_ok());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = LocalVectorStore::open(dir.path(), "chat_history").unwrap();
            store.ensure_collection(2).await.unwrap();
            store.add(&record("persisted", vec![0.0, 1.0])).await.unwrap();
        }

        let store = LocalVectorStore::open(dir.path(), "chat_history").unwrap();
        assert!(store.collection_exists().await.unwrap());
        let hits = store.search(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.input, "persisted");
    }
}
