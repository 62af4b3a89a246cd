//! Test utilities for ledgerlens-core
//!
//! This module provides testing infrastructure including a mock
//! OpenAI-compatible server that can be used for development and
//! integration tests. Requests are dispatched on the system prompt
//! content, and the behavior of a request is steered by markers in the
//! uploaded image bytes or the chat text:
//!
//! - image bytes containing `not-financial` produce a rejection verdict
//! - `garbage` produces a reply that is not JSON at all
//! - `server-error` produces an HTTP 500
//! - anything else produces a valid two-item receipt

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Mock OpenAI-compatible server for testing and development
pub struct MockExtractionServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: Arc<ServerState>,
}

#[derive(Default)]
struct ServerState {
    request_count: AtomicUsize,
    last_request: Mutex<Option<Value>>,
}

impl MockExtractionServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_completions))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            state,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of completion requests served so far
    pub fn request_count(&self) -> usize {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// The body of the most recent completion request
    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockExtractionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Models endpoint (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "gpt-4o-mini", "object": "model"}]
    }))
}

/// Chat completions endpoint
async fn handle_completions(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<Value>,
) -> Response {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    *state.last_request.lock().unwrap() = Some(request.clone());

    let system = message_text(&request, "system");
    let user = message_text(&request, "user");
    let image_bytes = decode_image(&request);
    let image_text = String::from_utf8_lossy(&image_bytes).to_string();

    if image_text.contains("server-error") || user.contains("server-error") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "mock server error").into_response();
    }
    if image_text.contains("garbage") || user.contains("garbage") {
        return completion_reply("I am sorry, I cannot help with that.");
    }

    // Dispatch on the system prompt: each task's prompt file carries a
    // distinctive phrase.
    let content = if system.contains("is_valid_document") {
        handle_extraction_mock(&image_text)
    } else if system.contains("financial advisor") {
        handle_insights_mock()
    } else {
        handle_chat_mock(&user)
    };

    completion_reply(&content)
}

fn completion_reply(content: &str) -> Response {
    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Concatenated text content of all messages with the given role
fn message_text(request: &Value, role: &str) -> String {
    let mut out = String::new();
    let Some(messages) = request["messages"].as_array() else {
        return out;
    };
    for message in messages {
        if message["role"].as_str() != Some(role) {
            continue;
        }
        match &message["content"] {
            Value::String(text) => out.push_str(text),
            Value::Array(parts) => {
                for part in parts {
                    if let Some(text) = part["text"].as_str() {
                        out.push_str(text);
                    }
                }
            }
            _ => {}
        }
        out.push('\n');
    }
    out
}

/// Decode the first image_url data URI in the request, if any
fn decode_image(request: &Value) -> Vec<u8> {
    let Some(messages) = request["messages"].as_array() else {
        return Vec::new();
    };
    for message in messages {
        let Some(parts) = message["content"].as_array() else {
            continue;
        };
        for part in parts {
            let Some(url) = part["image_url"]["url"].as_str() else {
                continue;
            };
            if let Some((_, payload)) = url.split_once(";base64,") {
                return base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .unwrap_or_default();
            }
        }
    }
    Vec::new()
}

fn handle_extraction_mock(image_text: &str) -> String {
    if image_text.contains("not-financial") {
        return json!({
            "is_valid_document": false,
            "document_type": "other",
            "rejection_reason": "This looks like a photo, not a financial document.",
            "transactions": [],
            "analysis": "",
            "confidence": 0.97
        })
        .to_string();
    }

    json!({
        "is_valid_document": true,
        "document_type": "receipt",
        "transactions": [
            {"date": "2025-03-14", "amount": 12.50, "category": "food",
             "description": "Sandwich", "kind": "expense"},
            {"date": "2025-03-14", "amount": 3.00, "category": "food",
             "description": "Coffee", "kind": "expense"}
        ],
        "analysis": "A lunch receipt with two items totaling $15.50.",
        "confidence": 0.95
    })
    .to_string()
}

fn handle_insights_mock() -> String {
    json!([
        "Most of your recent spending is on food.",
        "No unusually large amounts appear in this window."
    ])
    .to_string()
}

fn handle_chat_mock(user: &str) -> String {
    let last_line = user.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
    json!({
        "message": format!("Looking at your data: {}", last_line.trim()),
        "suggestions": ["Would you like a category breakdown?"]
    })
    .to_string()
}
