//! HTTP API server.
//!
//! Thin JSON wrappers over the [`Engine`]: upload, listing, deletion,
//! search, health, and a streaming chat endpoint that augments the system
//! prompt with retrieved document context before proxying the completion
//! provider's SSE stream.
//!
//! # Endpoints
//!
//! | Method   | Path                   | Description |
//! |----------|------------------------|-------------|
//! | `POST`   | `/api/upload`          | Multipart document upload + indexing |
//! | `GET`    | `/api/documents`       | List indexed documents |
//! | `DELETE` | `/api/documents/{id}`  | Delete a document and its chunks |
//! | `POST`   | `/api/search`          | Top-k semantic search |
//! | `POST`   | `/api/chat`            | Context-augmented streaming chat |
//! | `GET`    | `/api/health`          | Document/embedding counts |
//!
//! Error responses follow `{"error": {"code", "message"}}`. Validation and
//! not-found failures map to 4xx; extraction and index-write failures map
//! to 5xx with the catalog and index left untouched.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chat::{ChatMessage, CompletionClient};
use crate::config::{Config, UploadConfig};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::extract::{extract_text, file_extension};
use crate::models::{DocumentRecord, RetrievalResult};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
    completion: Arc<CompletionClient>,
    upload: UploadConfig,
}

/// Start the HTTP server. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(Engine::from_config(config).await?);
    let completion = Arc::new(CompletionClient::new(&config.completion)?);

    let state = AppState {
        engine,
        completion,
        upload: config.upload.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/documents", get(handle_list_documents))
        .route("/api/documents/{id}", delete(handle_delete_document))
        .route("/api/search", post(handle_search))
        .route("/api/chat", post(handle_chat))
        .route("/api/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.upload.max_bytes + 64 * 1024))
        .layer(cors)
        .with_state(state);

    info!("listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        let (status, code) = match err {
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            EngineError::EmptyContent => (StatusCode::BAD_REQUEST, "empty_content"),
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            EngineError::Extraction(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "extraction_failed")
            }
            EngineError::IndexWrite(_) => (StatusCode::INTERNAL_SERVER_ERROR, "index_error"),
        };
        AppError {
            status,
            code: code.to_string(),
            message,
        }
    }
}

// ============ POST /api/upload ============

/// Multipart upload: validates the declared filename and size, extracts
/// text, and indexes the document. Validation happens before any side
/// effect; an extraction or indexing failure leaves no partial state.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentRecord>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| bad_request("file field is missing a filename"))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = upload.ok_or_else(|| bad_request("no file field in upload"))?;

    let ext = file_extension(&filename);
    if !state.upload.allowed_extensions.contains(&ext) {
        return Err(AppError::from(EngineError::Validation(format!(
            "file type '{}' is not allowed (allowed: {})",
            ext,
            state.upload.allowed_extensions.join(", ")
        ))));
    }
    if data.len() > state.upload.max_bytes {
        return Err(AppError::from(EngineError::Validation(format!(
            "file exceeds the {} byte upload limit",
            state.upload.max_bytes
        ))));
    }

    let text = extract_text(&data, &ext)
        .map_err(|e| AppError::from(EngineError::Extraction(e.to_string())))?;

    let record = state.engine.index_document(&text, &filename, &ext).await?;
    Ok(Json(record))
}

// ============ GET /api/documents ============

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentRecord>,
}

async fn handle_list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    Json(DocumentListResponse {
        documents: state.engine.catalog().list(),
    })
}

// ============ DELETE /api/documents/{id} ============

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.engine.delete_document(id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ============ POST /api/search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<RetrievalResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = state.engine.search(&req.query, req.top_k).await?;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
}

/// Retrieve context for the latest user turn, compose the system prompt,
/// and proxy the provider's SSE stream unchanged.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    if req.messages.is_empty() {
        return Err(bad_request("no messages provided"));
    }

    let query = req
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .ok_or_else(|| bad_request("no user message in conversation"))?;

    let system_prompt = state.engine.system_prompt_for(&query).await?;

    let upstream = state
        .completion
        .stream(&system_prompt, &req.messages)
        .await
        .map_err(|e| AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "completion_failed".to_string(),
            message: e.to_string(),
        })?;

    let body = Body::from_stream(upstream.bytes_stream());
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: e.to_string(),
        })?)
}

// ============ GET /api/health ============

async fn handle_health(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = state.engine.health().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "document_count": report.document_count,
        "embedding_count": report.embedding_count,
    })))
}
