//! Router-level tests for the chat and ingestion services
//!
//! The collaborators are in-memory stand-ins, so these run without Qdrant or
//! an LLM. The test at the bottom needs a live Qdrant and is ignored:
//!
//! 1. Start Qdrant: `docker run -p 6334:6334 -p 6333:6333 qdrant/qdrant`
//! 2. Run: `cargo test --test integration_test -- --ignored`

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rag_workshop::{
    api::{chat_router, ingestion_router, ChatState, IngestionState, CHAT_GREETING, NDJSON},
    config::Config,
    embedding::{Embedding, EmbeddingProvider},
    ingestion::DocumentIngestor,
    llm::{ChatModel, PromptMessage, SamplingOptions},
    observability::HealthChecker,
    rag::ChatService,
    vector_db::{ScoredSegment, SearchParams, SegmentPoint, VectorStore},
    Result,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "X-RAG-WORKSHOP-BOUNDARY";
const MAX_BODY: usize = 10 * 1024 * 1024;

struct FixedEmbeddings;

#[async_trait]
impl EmbeddingProvider for FixedEmbeddings {
    async fn embed_single(&self, _text: &str) -> Result<Embedding> {
        Ok(Embedding::new(vec![0.5; 4]))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|_| Embedding::new(vec![0.5; 4])).collect())
    }

    fn embedding_dimension(&self) -> usize {
        4
    }
}

#[derive(Default)]
struct InMemoryStore {
    points: Mutex<Vec<SegmentPoint>>,
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, _name: &str, _dimension: usize) -> Result<bool> {
        Ok(false)
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn upsert_segments(&self, _collection: &str, points: Vec<SegmentPoint>) -> Result<()> {
        self.points.lock().unwrap().extend(points);
        Ok(())
    }

    async fn search(&self, _collection: &str, params: SearchParams) -> Result<Vec<ScoredSegment>> {
        Ok(self
            .points
            .lock()
            .unwrap()
            .iter()
            .take(params.limit)
            .map(|p| ScoredSegment {
                id: p.id,
                score: 0.9,
                segment: p.segment.clone(),
            })
            .collect())
    }

    async fn delete_by_source(&self, _collection: &str, source_file: &str) -> Result<()> {
        self.points
            .lock()
            .unwrap()
            .retain(|p| p.segment.source_file != source_file);
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, messages: &[PromptMessage], _options: &SamplingOptions) -> Result<String> {
        Ok(format!("answered from {} messages", messages.len()))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

fn chat_app(store: Arc<InMemoryStore>) -> Router {
    let config = Config::default_config();
    let chat = ChatService::new(
        Arc::new(FixedEmbeddings),
        store.clone(),
        Arc::new(EchoModel),
        "test",
        config.chat,
    );
    let health_checker = HealthChecker::new("rag-backend")
        .with_vector_db(store)
        .with_llm("echo");

    chat_router(
        ChatState {
            chat: Arc::new(chat),
            health_checker: Arc::new(health_checker),
        },
        MAX_BODY,
    )
}

fn ingestion_app(store: Arc<InMemoryStore>) -> Router {
    ingestion_app_with_limit(store, MAX_BODY)
}

fn ingestion_app_with_limit(store: Arc<InMemoryStore>, max_body_bytes: usize) -> Router {
    let health_checker = HealthChecker::new("rag-ingestion").with_vector_db(store.clone());

    ingestion_router(
        IngestionState {
            ingestor: Arc::new(ingestor(store)),
            health_checker: Arc::new(health_checker),
        },
        max_body_bytes,
    )
}

fn ingestor(store: Arc<InMemoryStore>) -> DocumentIngestor {
    let config = Config::default_config();
    DocumentIngestor::new(&config.ingestion, Arc::new(FixedEmbeddings), store, "test")
}

/// A PDF with one Helvetica text line per page
fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref = pdf.len();
    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        table.push_str(&format!("{:010} 00000 n \n", offset));
    }
    table.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    ));
    pdf.extend_from_slice(table.as_bytes());
    pdf
}

fn multipart_file(filename: &str, content_type: &str, content: &str) -> Request<Body> {
    multipart_bytes(filename, content_type, content.as_bytes())
}

fn multipart_bytes(filename: &str, content_type: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {ct}\r\n\r\n",
        b = BOUNDARY,
        f = filename,
        ct = content_type,
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    multipart_request(body)
}

fn multipart_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/ingest")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body.into())
        .unwrap()
}

fn chat_post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_reports_server_up() {
    let response = chat_app(Arc::default())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "server up");
}

#[tokio::test]
async fn test_chat_greeting() {
    let response = chat_app(Arc::default())
        .oneshot(Request::get("/chat").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], CHAT_GREETING.as_bytes());
}

#[tokio::test]
async fn test_ingest_then_chat_cites_uploaded_file() {
    let store = Arc::new(InMemoryStore::default());

    let response = ingestion_app(store.clone())
        .oneshot(multipart_file(
            "terms.txt",
            "text/plain",
            "Rent is due on the first day of every month.",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.points.lock().unwrap().len(), 1);

    let response = chat_app(store)
        .oneshot(chat_post(
            r#"{"messages":[{"role":"user","content":"When is rent due?"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["object"], "chat.completion");
    let choices = json["choices"].as_array().unwrap();
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0]["message"]["role"], "assistant");
    assert_eq!(choices[0]["message"]["content"], "answered from 2 messages");
}

#[tokio::test]
async fn test_streamed_chat_is_ndjson_with_context_first() {
    let store = Arc::new(InMemoryStore::default());
    let response = ingestion_app(store.clone())
        .oneshot(multipart_file("terms.txt", "text/plain", "Rent is due on the first day."))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = chat_app(store)
        .oneshot(chat_post(
            r#"{"messages":[{"role":"user","content":"When is rent due?"}],"stream":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], NDJSON);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let chunks: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|c| c["object"] == "chat.completion.chunk"));
    let first = &chunks[0]["choices"][0]["delta"];
    assert_eq!(first["role"], "assistant");
    let source = first["context"]["data_points"][0].as_str().unwrap();
    assert!(source.starts_with("terms.txt: Rent is due"));
    assert!(chunks[1..].iter().all(|c| c["choices"][0]["delta"].get("context").is_none()));

    let answer: String = chunks
        .iter()
        .map(|c| c["choices"][0]["delta"]["content"].as_str().unwrap())
        .collect();
    assert_eq!(answer, "answered from 2 messages");
}

#[tokio::test]
async fn test_streamed_chat_without_question_is_bad_request() {
    let response = chat_app(Arc::default())
        .oneshot(chat_post(
            r#"{"messages":[{"role":"assistant","content":"Hi"}],"stream":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_chat_without_user_message_is_bad_request() {
    let response = chat_app(Arc::default())
        .oneshot(chat_post(
            r#"{"messages":[{"role":"assistant","content":"How can I help?"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_chat_malformed_json_is_bad_request() {
    let response = chat_app(Arc::default())
        .oneshot(chat_post("{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_ingest_without_files_is_bad_request() {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nno file here\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let response = ingestion_app(Arc::default())
        .oneshot(multipart_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingest_unsupported_type_is_bad_request() {
    let store = Arc::new(InMemoryStore::default());
    let response = ingestion_app(store.clone())
        .oneshot(multipart_file("photo.png", "image/png", "not really an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.points.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_document_removes_segments() {
    let store = Arc::new(InMemoryStore::default());
    let app = ingestion_app(store.clone());

    let response = app
        .clone()
        .oneshot(multipart_file("faq.txt", "text/plain", "Support answers within one day."))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!store.points.lock().unwrap().is_empty());

    let response = app
        .oneshot(
            Request::delete("/documents/faq.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.points.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_document_by_relative_path() {
    let store = Arc::new(InMemoryStore::default());
    ingestor(store.clone())
        .ingest_file("sub/a.txt", b"Nested policy text.".to_vec(), Some("text/plain"))
        .await
        .unwrap();
    assert!(!store.points.lock().unwrap().is_empty());

    let app = ingestion_app(store.clone());
    let response = app
        .clone()
        .oneshot(Request::delete("/documents/sub/a.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.points.lock().unwrap().is_empty());

    let response = app
        .oneshot(Request::delete("/documents/sub/../a.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingest_pdf_upload() {
    let store = Arc::new(InMemoryStore::default());
    let pdf = minimal_pdf(&["Rent is due monthly", "Deposits are refundable"]);

    let response = ingestion_app(store.clone())
        .oneshot(multipart_bytes("lease.pdf", "application/pdf", &pdf))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let points = store.points.lock().unwrap();
    assert!(!points.is_empty());
    assert!(points.iter().all(|p| p.segment.source_file == "lease.pdf"));
    let text: String = points.iter().map(|p| p.segment.content.as_str()).collect();
    assert!(text.contains("Rent"));
    assert!(text.contains("Deposits"));
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let store = Arc::new(InMemoryStore::default());
    let content = "a".repeat(4096);

    // Declared length over the limit
    let mut request = multipart_file("big.txt", "text/plain", &content);
    request
        .headers_mut()
        .insert(header::CONTENT_LENGTH, header::HeaderValue::from(content.len() + 200));
    let response = ingestion_app_with_limit(store.clone(), 1024)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // No declared length, the limit trips while the form is read
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.txt\"\r\nContent-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        c = content,
    )
    .into_bytes();
    let tail = body.split_off(body.len() / 2);
    let chunks = futures::stream::iter(vec![
        Ok::<_, std::io::Error>(bytes::Bytes::from(body)),
        Ok(bytes::Bytes::from(tail)),
    ]);
    let response = ingestion_app_with_limit(store.clone(), 1024)
        .oneshot(multipart_request(Body::from_stream(chunks)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert!(store.points.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = chat_app(Arc::default());

    let response = app
        .clone()
        .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["service"], "rag-backend");
}

#[tokio::test]
#[ignore] // Requires Qdrant running
async fn test_qdrant_ingest_and_search() {
    use rag_workshop::vector_db::QdrantStore;

    let mut config = Config::default_config();
    config.vector_db.collection = "rag_workshop_it".to_string();
    let store = QdrantStore::new(config.vector_db.clone(), 4).unwrap();
    let _ = store.delete_collection("rag_workshop_it").await;

    let ingestor = DocumentIngestor::new(
        &config.ingestion,
        Arc::new(FixedEmbeddings),
        Arc::new(store),
        "rag_workshop_it",
    );
    tokio_test::assert_ok!(ingestor.initialize().await);

    let report = tokio_test::assert_ok!(
        ingestor
            .ingest_file("notes.txt", b"Qdrant keeps the vectors.".to_vec(), Some("text/plain"))
            .await
    );
    assert_eq!(report.segments, 1);

    tokio_test::assert_ok!(ingestor.delete_file("notes.txt").await);
}
