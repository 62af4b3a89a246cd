//! Pluggable extraction service abstraction
//!
//! This module provides a backend-agnostic interface for the external
//! vision-capable completion service.
//!
//! # Architecture
//!
//! - `ExtractionBackend` trait: defines the interface for all service operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, mock). Default: openai_compatible
//! - `LEDGERLENS_AI_HOST`: Service URL (required for openai_compatible backend)
//! - `LEDGERLENS_AI_MODEL`: Model name (default: gpt-4o-mini)
//! - `LEDGERLENS_AI_API_KEY`: API key if the service requires one (optional)
//!
//! `AIClient::from_env` returning `None` is the "no credential configured"
//! state: callers check it up front and surface `ServiceUnavailable` rather
//! than failing per-call.

mod mock;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DocumentKind;

/// Trait defining the interface for all extraction service backends
///
/// Backends must be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Classify a document image and extract its transactions
    async fn extract_document(
        &self,
        image_data: &[u8],
        kind: DocumentKind,
    ) -> Result<ExtractionResult>;

    /// Run one chat exchange (stateless; the request carries all context)
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// Generate short financial observations from a serialized transaction window
    async fn generate_insights(&self, transactions_json: &str) -> Result<Vec<String>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete extraction client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Any server implementing the OpenAI chat completions API
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing and offline development
    Mock(MockBackend),
}

impl AIClient {
    /// Create a client from environment variables
    ///
    /// Returns None when the required credential is not configured, which
    /// disables all AI-dependent features up front.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str) -> Self {
        AIClient::OpenAICompatible(OpenAICompatibleBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl ExtractionBackend for AIClient {
    async fn extract_document(
        &self,
        image_data: &[u8],
        kind: DocumentKind,
    ) -> Result<ExtractionResult> {
        match self {
            AIClient::OpenAICompatible(b) => b.extract_document(image_data, kind).await,
            AIClient::Mock(b) => b.extract_document(image_data, kind).await,
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        match self {
            AIClient::OpenAICompatible(b) => b.chat(request).await,
            AIClient::Mock(b) => b.chat(request).await,
        }
    }

    async fn generate_insights(&self, transactions_json: &str) -> Result<Vec<String>> {
        match self {
            AIClient::OpenAICompatible(b) => b.generate_insights(transactions_json).await,
            AIClient::Mock(b) => b.generate_insights(transactions_json).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
