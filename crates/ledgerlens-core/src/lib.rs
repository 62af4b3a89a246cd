//! LedgerLens Core Library
//!
//! Shared functionality for the LedgerLens document ingestion tool:
//! - Extraction client for vision-capable completion services
//! - Document lifecycle tracker (queued, processing, completed, rejected)
//! - Degraded-mode fallback when extraction fails
//! - Conversational context builder over the transcript and ledger
//! - Insight synthesis over the recent ledger window
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod chat;
pub mod error;
pub mod fallback;
pub mod insights;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod tracker;

/// Test utilities including the mock extraction server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIClient, ChatReply, ChatRequest, ChatTurn, DocumentType, ExtractionBackend,
    ExtractionResult, ImageAttachment, MockBackend, OpenAICompatibleBackend, RawTransaction,
};
pub use chat::{build_chat_request, ChatSession, CHAT_HISTORY_WINDOW};
pub use error::{Error, Result};
pub use insights::{fetch_insights, INSIGHT_WINDOW};
pub use ledger::Ledger;
pub use models::{
    ChatMessage, ChatRole, Document, DocumentKind, DocumentStatus, Transaction, TransactionKind,
};
pub use pipeline::{Pipeline, PipelineConfig};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use tracker::{DocumentEvent, DocumentTracker};
