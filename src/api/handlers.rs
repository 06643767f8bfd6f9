//! API request handlers

use axum::{
    body::Body,
    extract::{multipart::MultipartError, rejection::JsonRejection, FromRef, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{RagError, ValidationError};
use crate::ingestion::DocumentIngestor;
use crate::middleware::InputValidator;
use crate::observability::{HealthChecker, HealthStatus};
use crate::rag::{ChatRequest, ChatResponseChunk, ChatService};

/// Fixed reply of `GET /chat`
pub const CHAT_GREETING: &str = "Hello from ChatResource!";

/// Content type of streamed chat answers
pub const NDJSON: &str = "application/x-ndjson";

/// State of the chat service
#[derive(Clone)]
pub struct ChatState {
    pub chat: Arc<ChatService>,
    pub health_checker: Arc<HealthChecker>,
}

/// State of the ingestion service
#[derive(Clone)]
pub struct IngestionState {
    pub ingestor: Arc<DocumentIngestor>,
    pub health_checker: Arc<HealthChecker>,
}

impl FromRef<ChatState> for Arc<HealthChecker> {
    fn from_ref(state: &ChatState) -> Self {
        state.health_checker.clone()
    }
}

impl FromRef<IngestionState> for Arc<HealthChecker> {
    fn from_ref(state: &IngestionState) -> Self {
        state.health_checker.clone()
    }
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by handlers: oversized uploads map to 413, other caller
/// mistakes to 400, everything else to 500
#[derive(Debug)]
pub struct ApiError(RagError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RagError::Validation(ValidationError::UploadTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!(error = %self.0, "Rejected request");
        } else {
            error!(error = %self.0, "Request failed");
        }

        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<RagError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "server up" }))
}

/// `GET /chat`
pub async fn chat_greeting() -> &'static str {
    CHAT_GREETING
}

/// `POST /chat`: a JSON answer, or NDJSON chunks when `stream` is set
pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ValidationError::InvalidRequest(e.body_text()))?;

    if !request.stream {
        let response = state.chat.run(request).await?;
        return Ok(Json(response).into_response());
    }

    let lines = state
        .chat
        .run_stream(request)
        .await?
        .and_then(|chunk| async move { ndjson_line(&chunk) })
        .inspect_err(|e| error!(error = %e, "Chat stream aborted"));

    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines.boxed())).into_response())
}

fn ndjson_line(chunk: &ChatResponseChunk) -> crate::error::Result<Bytes> {
    let mut line = serde_json::to_vec(chunk)
        .map_err(|e| RagError::Internal(format!("failed to encode chat chunk: {}", e)))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

fn upload_error(err: MultipartError) -> ValidationError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::UploadTooLarge(err.body_text())
    } else {
        ValidationError::MalformedUpload(err.body_text())
    }
}

/// `POST /ingest`: every file field of the form is ingested in order
pub async fn ingest(State(state): State<IngestionState>, mut multipart: Multipart) -> Result<StatusCode, ApiError> {
    state.ingestor.initialize().await?;
    let mut files = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        InputValidator::validate_filename(&filename)?;

        let content_type = field.content_type().map(str::to_string);
        let data: Bytes = field
            .bytes()
            .await
            .map_err(upload_error)?;

        let report = state
            .ingestor
            .ingest_file(&filename, data.to_vec(), content_type.as_deref())
            .await?;
        info!(filename = %report.filename, segments = report.segments, "Uploaded file ingested");
        files += 1;
    }

    if files == 0 {
        return Err(ValidationError::NoFiles.into());
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /documents/*path`: `path` is the stored source file, a file name
/// or a path relative to an ingested directory
pub async fn delete_document(
    State(state): State<IngestionState>,
    Path(path): Path<String>,
) -> Result<StatusCode, ApiError> {
    InputValidator::validate_source_path(&path)?;
    state.ingestor.delete_file(&path).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Health check handler
pub async fn health(State(health_checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let status = health_checker.check_health().await;
    let status_code = match status.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(status))
}

/// Liveness check, always 200
pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "alive"})))
}

/// Readiness check
pub async fn readiness(State(health_checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let status = health_checker.check_health().await;
    let (status_code, readiness) = match status.status {
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
        _ => (StatusCode::OK, "ready"),
    };

    (status_code, Json(serde_json::json!({"status": readiness, "details": status})))
}
