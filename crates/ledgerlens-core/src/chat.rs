//! Conversational context assembly
//!
//! Builds the request for a chat exchange: the fixed assistant instruction,
//! a serialized window of recent ledger history, the active document's
//! analysis (and image, when present), and the user's message last.
//!
//! Each call is independent: there is no server-side session, so continuity
//! across turns comes purely from resending the growing transcript. The
//! builder itself is stateless and idempotent per call; the append-only
//! transcript lives in `ChatSession`.

use uuid::Uuid;

use crate::ai::types::{ChatRequest, ChatTurn};
use crate::ledger::Ledger;
use crate::models::{ChatMessage, ChatRole, Document, Transaction};

/// At most this many recent ledger transactions are serialized into chat context
pub const CHAT_HISTORY_WINDOW: usize = 50;

/// Generic replies substituted when the service fails mid-conversation.
/// Chat is never allowed to dead-end silently.
pub const FALLBACK_REPLIES: &[&str] = &[
    "I couldn't reach the analysis service just now. Please try again in a moment.",
    "Something went wrong while looking at your data. Ask me again shortly.",
    "The assistant is temporarily unavailable, but your documents and ledger are safe.",
    "I wasn't able to process that request. Try rephrasing or asking again later.",
];

/// Pick a fallback reply, rotating so consecutive failures read differently
pub fn fallback_reply(seed: usize) -> &'static str {
    FALLBACK_REPLIES[seed % FALLBACK_REPLIES.len()]
}

/// Session-scoped chat transcript
///
/// Messages are append-only and never mutated. The active document selection
/// is cleared when that document is deleted.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    active_document: Option<Uuid>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn active_document(&self) -> Option<Uuid> {
        self.active_document
    }

    pub fn select_document(&mut self, id: Uuid) {
        self.active_document = Some(id);
    }

    /// Clear the selection if it references the given document
    pub fn clear_selection_of(&mut self, id: Uuid) {
        if self.active_document == Some(id) {
            self.active_document = None;
        }
    }
}

/// Assemble a chat request from the session state
///
/// Layering, in order: ledger summary as system context, the active
/// document's analysis as system context, prior transcript turns, then the
/// user's message (with the document image attached when present).
pub fn build_chat_request(
    message: &str,
    transcript: &[ChatMessage],
    active_document: Option<&Document>,
    ledger: Option<&Ledger>,
) -> ChatRequest {
    let mut context = Vec::new();

    if let Some(ledger) = ledger {
        if !ledger.is_empty() {
            context.push(format!(
                "Recent transactions from the user's ledger:\n{}",
                serialize_window(ledger.recent(CHAT_HISTORY_WINDOW))
            ));
        }
    }

    if let Some(doc) = active_document {
        if let Some(ref analysis) = doc.analysis {
            context.push(format!(
                "Analysis of the document the user is currently looking at:\n{}",
                analysis
            ));
        }
    }

    let mut turns: Vec<ChatTurn> = transcript
        .iter()
        .map(|m| match m.role {
            ChatRole::User => ChatTurn::user(m.text.clone()),
            ChatRole::Assistant => ChatTurn::assistant(m.text.clone()),
        })
        .collect();

    let mut user_turn = ChatTurn::user(message);
    if let Some(doc) = active_document {
        if !doc.raw_content.is_empty() {
            user_turn = user_turn.with_image(doc.raw_content.clone(), doc.kind.mime_type());
        }
    }
    turns.push(user_turn);

    ChatRequest { context, turns }
}

/// Serialize a transaction window as one line per transaction:
/// date, signed amount, description, category
pub fn serialize_window(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|tx| {
            format!(
                "{}  {:+.2}  {}  ({})",
                tx.date,
                tx.signed_amount(),
                tx.description,
                tx.category
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
