//! Mock backend for testing
//!
//! Returns predictable responses for all service operations without a
//! running model server. Behavior is keyed on markers in the request
//! content so tests can drive every pipeline path deterministically:
//!
//! - document bytes containing `not-financial` produce a clean rejection
//! - `transport-error` produces a transport failure
//! - `malformed` produces an undecodable-payload failure
//! - `config-error` produces a local failure outside the service-failure set
//! - anything else produces a valid two-item receipt

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{ChatRole, DocumentKind, TransactionKind};

use super::types::{
    ChatReply, ChatRequest, DocumentType, ExtractionResult, RawTransaction,
};
use super::ExtractionBackend;

/// Mock extraction backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }
}

fn marker(data: &[u8], needle: &str) -> bool {
    String::from_utf8_lossy(data).contains(needle)
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn extract_document(
        &self,
        image_data: &[u8],
        _kind: DocumentKind,
    ) -> Result<ExtractionResult> {
        if marker(image_data, "transport-error") {
            return Err(Error::Transport("mock transport failure".into()));
        }
        if marker(image_data, "malformed") {
            return Err(Error::MalformedResponse("mock undecodable payload".into()));
        }
        if marker(image_data, "config-error") {
            return Err(Error::InvalidData("mock prompt configuration failure".into()));
        }
        if marker(image_data, "not-financial") {
            return Ok(ExtractionResult {
                is_valid_document: false,
                document_type: DocumentType::Other,
                rejection_reason: Some("not a financial document".to_string()),
                transactions: vec![],
                analysis: String::new(),
                confidence: 0.97,
            });
        }

        let today = Utc::now().date_naive().to_string();
        Ok(ExtractionResult {
            is_valid_document: true,
            document_type: DocumentType::Receipt,
            rejection_reason: None,
            transactions: vec![
                RawTransaction {
                    date: Some(today.clone()),
                    amount: 12.50,
                    category: Some("food".to_string()),
                    description: "Sandwich".to_string(),
                    kind: Some(TransactionKind::Expense),
                },
                RawTransaction {
                    date: Some(today),
                    amount: 3.00,
                    category: Some("food".to_string()),
                    description: "Coffee".to_string(),
                    kind: Some(TransactionKind::Expense),
                },
            ],
            analysis: "A lunch receipt with two items totaling $15.50.".to_string(),
            confidence: 0.95,
        })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let last_user = request
            .turns
            .iter()
            .rev()
            .find(|t| t.role == ChatRole::User)
            .map(|t| t.text.as_str())
            .unwrap_or("");

        if last_user.contains("transport-error") {
            return Err(Error::Transport("mock transport failure".into()));
        }
        if last_user.contains("malformed") {
            return Err(Error::MalformedResponse("mock undecodable payload".into()));
        }

        Ok(ChatReply {
            message: format!("You asked: {}", last_user),
            suggestions: vec![],
        })
    }

    async fn generate_insights(&self, transactions_json: &str) -> Result<Vec<String>> {
        if transactions_json.contains("transport-error") {
            return Err(Error::Transport("mock transport failure".into()));
        }

        Ok(vec![
            "Most of your recent spending is concentrated in one category.".to_string(),
            "No unusual amounts stand out in this window.".to_string(),
        ])
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ChatTurn;

    #[tokio::test]
    async fn test_mock_valid_receipt() {
        let mock = MockBackend::new();
        let result = mock
            .extract_document(b"receipt image bytes", DocumentKind::Image)
            .await
            .unwrap();
        assert!(result.is_valid_document);
        assert_eq!(result.transactions.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_rejection() {
        let mock = MockBackend::new();
        let result = mock
            .extract_document(b"not-financial photo", DocumentKind::Image)
            .await
            .unwrap();
        assert!(!result.is_valid_document);
        assert!(result.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_mock_transport_failure() {
        let mock = MockBackend::new();
        let err = mock
            .extract_document(b"transport-error", DocumentKind::Image)
            .await
            .unwrap_err();
        assert!(err.is_service_failure());
    }

    #[tokio::test]
    async fn test_mock_local_failure() {
        let mock = MockBackend::new();
        let err = mock
            .extract_document(b"config-error", DocumentKind::Image)
            .await
            .unwrap_err();
        assert!(!err.is_service_failure());
    }

    #[tokio::test]
    async fn test_mock_chat_echoes() {
        let mock = MockBackend::new();
        let request = ChatRequest {
            context: vec![],
            turns: vec![ChatTurn::user("what is this charge?")],
        };
        let reply = mock.chat(&request).await.unwrap();
        assert!(reply.message.contains("what is this charge?"));
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
