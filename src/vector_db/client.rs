//! Qdrant client implementation

use super::models::{ScoredSegment, SearchParams, SegmentPoint};
use super::VectorStore;
use crate::config::{Distance, VectorDbConfig};
use crate::document::TextSegment;
use crate::error::{Result, VectorDbError};
use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Filter, PointId, PointStruct, SearchPoints,
    UpsertPointsBuilder, Value, VectorParamsBuilder, WithPayloadSelector,
};
use qdrant_client::Qdrant;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SOURCE_FILE_KEY: &str = "sourcefile";
const KNOWN_FIELDS: [&str; 8] = [
    "id",
    "content",
    "category",
    "sourcepage",
    "sourcefile",
    "page",
    "section",
    "ingested_at",
];

/// Segment store backed by a Qdrant collection
pub struct QdrantStore {
    config: VectorDbConfig,
    client: Qdrant,
    dimension: usize,
}

impl QdrantStore {
    /// Create a client for vectors of `dimension` components
    pub fn new(config: VectorDbConfig, dimension: usize) -> Result<Self> {
        info!("Connecting to Qdrant at {}", config.url);

        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.as_ref().map(|k| k.expose_secret().to_string()))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorDbError::ConnectionError(e.to_string()))?;

        Ok(Self {
            config,
            client,
            dimension,
        })
    }

    /// Configured collection name
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    fn to_qdrant_distance(&self) -> qdrant_client::qdrant::Distance {
        match self.config.distance {
            Distance::Cosine => qdrant_client::qdrant::Distance::Cosine,
            Distance::Euclidean => qdrant_client::qdrant::Distance::Euclid,
            Distance::Dot => qdrant_client::qdrant::Distance::Dot,
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.is_empty() || vector.len() != self.dimension {
            return Err(VectorDbError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            }
            .into());
        }
        Ok(())
    }
}

/// Convert a segment into a Qdrant payload
fn to_qdrant_payload(segment: &TextSegment) -> HashMap<String, Value> {
    let mut map = HashMap::new();

    map.insert("id".to_string(), Value::from(segment.id.clone()));
    map.insert("content".to_string(), Value::from(segment.content.clone()));
    map.insert("sourcepage".to_string(), Value::from(segment.source_page.clone()));
    map.insert(SOURCE_FILE_KEY.to_string(), Value::from(segment.source_file.clone()));
    map.insert("page".to_string(), Value::from(segment.page as i64));
    map.insert("section".to_string(), Value::from(segment.section as i64));
    map.insert("ingested_at".to_string(), Value::from(segment.ingested_at));

    if let Some(category) = &segment.category {
        map.insert("category".to_string(), Value::from(category.clone()));
    }

    for (key, value) in &segment.metadata {
        if let Ok(v) = serde_json::to_string(value) {
            map.insert(key.clone(), Value::from(v));
        }
    }

    map
}

fn string_field(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn integer_field(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => Some(*i),
        _ => None,
    }
}

/// Convert a Qdrant payload back into a segment
fn parse_qdrant_payload(payload: HashMap<String, Value>) -> Result<TextSegment> {
    let required = |key: &str| {
        string_field(&payload, key).ok_or_else(|| VectorDbError::MalformedPayload(format!("missing {} field", key)))
    };

    let id = required("id")?;
    let content = required("content")?;
    let source_page = required("sourcepage")?;
    let source_file = required(SOURCE_FILE_KEY)?;
    let category = string_field(&payload, "category");
    let page = integer_field(&payload, "page").unwrap_or_default() as u32;
    let section = integer_field(&payload, "section").unwrap_or_default() as u32;
    let ingested_at = integer_field(&payload, "ingested_at").unwrap_or_default();

    let mut metadata = HashMap::new();
    for (key, value) in payload {
        if KNOWN_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match value.kind {
            Some(Kind::StringValue(s)) => {
                let json = serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s));
                metadata.insert(key, json);
            }
            Some(Kind::IntegerValue(i)) => {
                metadata.insert(key, serde_json::Value::from(i));
            }
            Some(Kind::BoolValue(b)) => {
                metadata.insert(key, serde_json::Value::Bool(b));
            }
            _ => {}
        }
    }

    Ok(TextSegment {
        id,
        content,
        category,
        source_page,
        source_file,
        page,
        section,
        ingested_at,
        metadata,
    })
}

fn parse_point_id(id: Option<PointId>) -> Result<Uuid> {
    let id = id
        .and_then(|id| id.point_id_options)
        .ok_or_else(|| VectorDbError::MalformedPayload("point without id".to_string()))?;

    match id {
        PointIdOptions::Uuid(uuid) => {
            Uuid::parse_str(&uuid).map_err(|e| VectorDbError::MalformedPayload(format!("Invalid UUID: {}", e)).into())
        }
        PointIdOptions::Num(num) => {
            Err(VectorDbError::MalformedPayload(format!("unexpected numeric point id {}", num)).into())
        }
    }
}

fn source_filter(source_file: &str) -> Filter {
    Filter::must([Condition::matches(SOURCE_FILE_KEY, source_file.to_string())])
}

#[async_trait]
impl VectorStore for QdrantStore {
    #[instrument(skip(self))]
    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<bool> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| VectorDbError::ConnectionError(e.to_string()))?;

        if exists {
            debug!("Collection already exists: {}", name);
            return Ok(false);
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, self.to_qdrant_distance())),
            )
            .await
            .map_err(|e| VectorDbError::CollectionError(e.to_string()))?;

        info!("Collection created: {} ({} dimensions)", name, dimension);
        Ok(true)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client
            .delete_collection(name)
            .await
            .map_err(|e| VectorDbError::CollectionError(e.to_string()))?;

        info!("Collection deleted: {}", name);
        Ok(())
    }

    async fn upsert_segments(&self, collection: &str, points: Vec<SegmentPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        debug!("Upserting {} segments into collection: {}", points.len(), collection);

        let mut qdrant_points = Vec::with_capacity(points.len());
        for point in points {
            self.check_dimension(&point.vector)?;
            qdrant_points.push(PointStruct::new(
                point.id.to_string(),
                point.vector,
                to_qdrant_payload(&point.segment),
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, qdrant_points).wait(true))
            .await
            .map_err(|e| VectorDbError::InsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(&self, collection: &str, params: SearchParams) -> Result<Vec<ScoredSegment>> {
        self.check_dimension(&params.vector)?;
        debug!("Searching in collection: {} with limit: {}", collection, params.limit);

        let search_points = SearchPoints {
            collection_name: collection.to_string(),
            vector: params.vector,
            limit: params.limit as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            score_threshold: params.score_threshold,
            ..Default::default()
        };

        let response = self
            .client
            .search_points(search_points)
            .await
            .map_err(|e| VectorDbError::SearchError(e.to_string()))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScoredSegment {
                    id: parse_point_id(point.id)?,
                    score: point.score,
                    segment: parse_qdrant_payload(point.payload)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Found {} results", results.len());
        Ok(results)
    }

    async fn delete_by_source(&self, collection: &str, source_file: &str) -> Result<()> {
        debug!("Deleting segments of {} from collection: {}", source_file, collection);

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(source_filter(source_file))
                    .wait(true),
            )
            .await
            .map_err(|e| VectorDbError::DeleteError(e.to_string()))?;

        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionError(e.to_string()))?;
        Ok(())
    }
}
