//! Core data types for documents, transactions, and chat messages

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical category set extraction results are expected to map into.
///
/// Values outside this set are accepted as opaque strings rather than
/// rejected or coerced, so `Transaction::category` stays a `String`.
pub const CATEGORIES: &[&str] = &[
    "food",
    "transportation",
    "education",
    "entertainment",
    "shopping",
    "health",
    "utilities",
    "rent",
    "income",
    "other",
];

/// Whether a category string belongs to the canonical set
pub fn is_canonical_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// A single ledger transaction
///
/// Identity is assigned at creation time and never reused. A transaction is
/// owned by its document until merged; merging copies it into the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    /// Never negative; direction comes from `kind`. Extracted amounts are
    /// stored as their absolute value, and a zero amount (a free line item)
    /// is kept as-is rather than rejected.
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        amount: f64,
        category: impl Into<String>,
        description: impl Into<String>,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount: amount.abs(),
            category: category.into(),
            description: description.into(),
            kind,
        }
    }

    /// Amount with sign applied (expenses negative)
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

/// Uploaded document content kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
        }
    }

    /// MIME type used for the data URI sent to the extraction service
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Image => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Document lifecycle state
///
/// ```text
/// queued --(submit)--> processing --> completed | rejected
/// ```
///
/// `completed` and `rejected` are terminal; a document never returns to
/// `processing`. Only explicit deletion removes a document, from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Queued,
    Processing,
    Completed,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

/// An uploaded document and its extraction state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Raw image/PDF bytes as uploaded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub raw_content: Vec<u8>,
    pub kind: DocumentKind,
    pub uploaded_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub extracted_transactions: Vec<Transaction>,
    /// Extraction summary for completed documents; the rejection reason for
    /// rejected ones. Surfaced to the user verbatim.
    pub analysis: Option<String>,
}

impl Document {
    pub fn new(raw_content: Vec<u8>, kind: DocumentKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_content,
            kind,
            uploaded_at: Utc::now(),
            status: DocumentStatus::Queued,
            extracted_transactions: Vec::new(),
            analysis: None,
        }
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message in the session transcript
///
/// Messages are append-only and never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub related_document_id: Option<Uuid>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, related_document_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            related_document_id,
        }
    }

    pub fn assistant(text: impl Into<String>, related_document_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            related_document_id,
        }
    }
}
