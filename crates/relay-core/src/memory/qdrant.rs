//! ============================================================================
//! Qdrant Store - Remote vector database backend
//! ============================================================================
//! Used instead of the local store when `QDRANT_URL` is configured.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::store::VectorStore;
use super::types::{MemoryRecord, ScoredRecord};

/// Memory store backed by Qdrant
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    /// Create a new store handle. The collection is not touched until
    /// `ensure_collection` runs.
    pub fn new(url: &str, collection: &str) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| anyhow!("Failed to create Qdrant client: {}", e))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| anyhow!("Failed to check collection existence: {}", e))
    }

    async fn create_collection(&self, dimension: usize) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.as_str())
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| anyhow!("Failed to create collection: {}", e))?;
        Ok(())
    }

    async fn add(&self, record: &MemoryRecord) -> Result<()> {
        if record.embedding.is_empty() {
            return Err(anyhow!("Cannot store memory without embedding"));
        }

        debug!("Storing memory {} in {}", record.id, self.collection);

        let payload: HashMap<String, Value> = [
            ("input".to_string(), Value::from(record.input.clone())),
            ("response".to_string(), Value::from(record.response.clone())),
            ("created_at".to_string(), Value::from(record.created_at)),
        ]
        .into_iter()
        .collect();

        let point = PointStruct::new(record.id.to_string(), record.embedding.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), vec![point]).wait(true))
            .await
            .map_err(|e| anyhow!("Failed to upsert memory: {}", e))?;

        Ok(())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        debug!("Searching {} (limit: {})", self.collection, limit);

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.as_str(), query.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| anyhow!("Failed to search memories: {}", e))?;

        let records: Vec<ScoredRecord> = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let id = extract_uuid_from_point_id(point.id?)?;
                let payload = point.payload;

                Some(ScoredRecord {
                    record: MemoryRecord {
                        id,
                        input: get_string(&payload, "input")?,
                        response: get_string(&payload, "response")?,
                        created_at: get_i64(&payload, "created_at").unwrap_or(0),
                        embedding: vec![],
                    },
                    score: point.score,
                })
            })
            .collect();

        debug!("Found {} matching memories", records.len());
        Ok(records)
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.as_str()).exact(true))
            .await
            .map_err(|e| anyhow!("Failed to count memories: {}", e))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

// Helper to extract UUID from PointId
fn extract_uuid_from_point_id(point_id: qdrant_client::qdrant::PointId) -> Option<Uuid> {
    match point_id.point_id_options? {
        PointIdOptions::Uuid(uuid_str) => Uuid::parse_str(&uuid_str).ok(),
        PointIdOptions::Num(_) => None,
    }
}

fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn get_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| v.as_integer())
}
