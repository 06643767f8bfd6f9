//! API route configuration

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{self, ChatState, IngestionState};
use crate::middleware::cors_layer;

/// Router of the chat service
pub fn chat_router(state: ChatState, max_body_bytes: usize) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::root))
        .route("/chat", get(handlers::chat_greeting).post(handlers::chat))
        .route("/health", get(handlers::health))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .with_state(state);

    with_layers(routes, max_body_bytes)
}

/// Router of the ingestion service
pub fn ingestion_router(state: IngestionState, max_body_bytes: usize) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::root))
        .route("/ingest", post(handlers::ingest))
        .route("/documents", post(handlers::ingest))
        .route("/documents/*path", delete(handlers::delete_document))
        .route("/health", get(handlers::health))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        .with_state(state);

    with_layers(routes, max_body_bytes)
}

/// The body limit sits in its own `Router::layer` so its response body is
/// mapped back to an axum body before CORS wraps it
fn with_layers(router: Router, max_body_bytes: usize) -> Router {
    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}
