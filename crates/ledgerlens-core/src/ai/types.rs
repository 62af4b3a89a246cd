//! Extraction service wire types
//!
//! These types are backend-agnostic and used across all backend
//! implementations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{ChatRole, Transaction, TransactionKind};

/// Document classification returned by the extraction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Receipt,
    Bill,
    Invoice,
    Statement,
    #[serde(other)]
    Other,
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::Other
    }
}

/// A transaction as extracted by the service, before identity assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    /// YYYY-MM-DD; absent or unparseable dates fall back to today
    #[serde(default)]
    pub date: Option<String>,
    pub amount: f64,
    /// Expected to come from the canonical set, but accepted as-is
    #[serde(default)]
    pub category: Option<String>,
    pub description: String,
    #[serde(default)]
    pub kind: Option<TransactionKind>,
}

impl RawTransaction {
    /// Promote into a ledger transaction, assigning identity and filling
    /// defaults for fields the service omitted
    pub fn into_transaction(self, today: NaiveDate) -> Transaction {
        let date = self
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(today);

        Transaction::new(
            date,
            self.amount,
            self.category.unwrap_or_else(|| "other".to_string()),
            self.description,
            self.kind.unwrap_or(TransactionKind::Expense),
        )
    }
}

/// Result of a document extraction request
///
/// Transient: produced per request, consumed into a `Document`, never
/// persisted independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub is_valid_document: bool,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
    #[serde(default)]
    pub analysis: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.0
}

/// Image payload attached to a chat turn
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

/// A single turn in a chat request
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    /// Raw document image attached to the user turn, when a document with
    /// image content is selected
    pub image: Option<ImageAttachment>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            image: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, data: Vec<u8>, mime_type: &'static str) -> Self {
        self.image = Some(ImageAttachment { data, mime_type });
        self
    }
}

/// Assembled chat request
///
/// Each request is self-contained: there is no server-side session, so
/// continuity comes entirely from the caller resending the turn list.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// System context blocks appended after the fixed assistant instruction
    /// (ledger summary, active document analysis)
    pub context: Vec<String>,
    /// Conversation turns, the user's message last
    pub turns: Vec<ChatTurn>,
}

/// Reply to a chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    /// Follow-up suggestions; currently always empty in practice
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_transaction_date_fallback() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let raw = RawTransaction {
            date: Some("not-a-date".into()),
            amount: 9.99,
            category: Some("food".into()),
            description: "Lunch".into(),
            kind: Some(TransactionKind::Expense),
        };
        assert_eq!(raw.into_transaction(today).date, today);

        let raw = RawTransaction {
            date: Some("2025-03-14".into()),
            amount: 9.99,
            category: None,
            description: "Lunch".into(),
            kind: None,
        };
        let tx = raw.into_transaction(today);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(tx.category, "other");
        assert_eq!(tx.kind, TransactionKind::Expense);
    }

    #[test]
    fn test_document_type_unknown_string() {
        let t: DocumentType = serde_json::from_str("\"parking-ticket\"").unwrap();
        assert_eq!(t, DocumentType::Other);
    }

    #[test]
    fn test_raw_transaction_opaque_category_kept() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let raw = RawTransaction {
            date: None,
            amount: 4.0,
            category: Some("crypto".into()),
            description: "Exchange fee".into(),
            kind: Some(TransactionKind::Expense),
        };
        assert_eq!(raw.into_transaction(today).category, "crypto");
    }
}
