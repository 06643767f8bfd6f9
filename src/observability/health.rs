//! Health checks for the service collaborators

use crate::embedding::{EmbeddingCache, EmbeddingProvider};
use crate::vector_db::VectorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,

    /// Response time in milliseconds
    pub response_time_ms: Option<u64>,
}

impl ComponentHealth {
    fn new(name: &str, status: HealthStatus, message: impl Into<String>, started: Option<Instant>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: Some(message.into()),
            response_time_ms: started.map(|s| s.elapsed().as_millis() as u64),
        }
    }
}

/// Overall service health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub service: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
struct CachedHealth {
    result: SystemHealth,
    cached_at: Instant,
}

/// Health checker with caching; only configured components are reported
pub struct HealthChecker {
    service: String,
    start_time: Instant,
    vector_db: Option<Arc<dyn VectorStore>>,
    embedding_client: Option<Arc<dyn EmbeddingProvider>>,
    cache: Option<Arc<EmbeddingCache>>,
    llm_model: Option<String>,
    cached_result: RwLock<Option<CachedHealth>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    /// Create a health checker with a 30-second cache TTL
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_cache_ttl(service, Duration::from_secs(30))
    }

    pub fn with_cache_ttl(service: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            service: service.into(),
            start_time: Instant::now(),
            vector_db: None,
            embedding_client: None,
            cache: None,
            llm_model: None,
            cached_result: RwLock::new(None),
            cache_ttl,
        }
    }

    pub fn with_vector_db(mut self, vector_db: Arc<dyn VectorStore>) -> Self {
        self.vector_db = Some(vector_db);
        self
    }

    pub fn with_embedding_client(mut self, embedding_client: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_client = Some(embedding_client);
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<EmbeddingCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Report the configured chat model; no request is made to it
    pub fn with_llm(mut self, model: impl Into<String>) -> Self {
        self.llm_model = Some(model.into());
        self
    }

    /// Overall health, served from cache while fresh
    pub async fn check_health(&self) -> SystemHealth {
        {
            let cached = self.cached_result.read().await;
            if let Some(cached_health) = &*cached {
                if cached_health.cached_at.elapsed() < self.cache_ttl {
                    debug!("Returning cached health check result");
                    return cached_health.result.clone();
                }
            }
        }

        debug!("Performing fresh health check");
        let health = self.perform_health_check().await;

        *self.cached_result.write().await = Some(CachedHealth {
            result: health.clone(),
            cached_at: Instant::now(),
        });

        health
    }

    async fn perform_health_check(&self) -> SystemHealth {
        let mut components = Vec::new();

        if let Some(db) = &self.vector_db {
            components.push(check_vector_db(db.as_ref()).await);
        }
        if let Some(client) = &self.embedding_client {
            components.push(check_embedding(client.as_ref()));
        }
        if let Some(cache) = &self.cache {
            let stats = cache.stats().await;
            components.push(ComponentHealth::new(
                "embedding_cache",
                HealthStatus::Healthy,
                format!("{} cached embeddings", stats.size),
                None,
            ));
        }
        if let Some(model) = &self.llm_model {
            components.push(ComponentHealth::new(
                "llm",
                HealthStatus::Healthy,
                format!("Configured model: {}", model),
                None,
            ));
        }

        let status = if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if components.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        SystemHealth {
            status,
            service: self.service.clone(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Simple liveness check
    pub fn liveness(&self) -> bool {
        true
    }

    /// Ready unless a component is unhealthy
    pub async fn readiness(&self) -> bool {
        self.check_health().await.status != HealthStatus::Unhealthy
    }
}

async fn check_vector_db(db: &dyn VectorStore) -> ComponentHealth {
    let start = Instant::now();
    match tokio::time::timeout(CHECK_TIMEOUT, db.health_check()).await {
        Ok(Ok(())) => ComponentHealth::new("vector_database", HealthStatus::Healthy, "Database operational", Some(start)),
        Ok(Err(e)) => ComponentHealth::new(
            "vector_database",
            HealthStatus::Unhealthy,
            format!("Database error: {}", e),
            Some(start),
        ),
        Err(_) => ComponentHealth {
            name: "vector_database".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some("Health check timeout".to_string()),
            response_time_ms: Some(CHECK_TIMEOUT.as_millis() as u64),
        },
    }
}

fn check_embedding(client: &dyn EmbeddingProvider) -> ComponentHealth {
    match client.embedding_dimension() {
        0 => ComponentHealth::new("embedding_service", HealthStatus::Unhealthy, "Invalid embedding dimension", None),
        dim => ComponentHealth::new(
            "embedding_service",
            HealthStatus::Healthy,
            format!("Service configured (dim: {})", dim),
            None,
        ),
    }
}
