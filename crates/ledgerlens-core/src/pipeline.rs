//! Ingestion pipeline facade
//!
//! Ties the extraction client, document tracker, chat session, and ledger
//! window logic together behind one handle. Uploads run as spawned tasks
//! gated by a semaphore, so concurrent documents progress independently and
//! the external service sees a bounded number of in-flight extractions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::types::ExtractionResult;
use crate::ai::{AIClient, ExtractionBackend};
use crate::chat::{self, ChatSession};
use crate::error::{Error, Result};
use crate::fallback;
use crate::insights;
use crate::ledger::Ledger;
use crate::models::{ChatMessage, Document, DocumentKind, Transaction};
use crate::tracker::{DocumentEvent, DocumentTracker};

const DEFAULT_REJECTION_REASON: &str = "The image does not appear to be a financial document.";

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum extractions in flight at once
    pub max_in_flight: usize,
    /// Per-extraction deadline; expiry is handled like a transport failure
    pub extraction_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            extraction_timeout: Duration::from_secs(30),
        }
    }
}

/// Document ingestion and assistant pipeline
///
/// Cheap to clone the handles out of: the tracker is shared, the client is
/// Clone, and each upload spawns its own task.
pub struct Pipeline {
    client: Option<AIClient>,
    tracker: Arc<DocumentTracker>,
    extraction_permits: Arc<Semaphore>,
    extraction_timeout: Duration,
    session: Mutex<ChatSession>,
    fallback_reply_seq: AtomicUsize,
}

impl Pipeline {
    /// Create a pipeline with an explicit client (or none, for degraded mode)
    pub fn new(client: Option<AIClient>) -> Self {
        Self::with_config(client, PipelineConfig::default())
    }

    pub fn with_config(client: Option<AIClient>, config: PipelineConfig) -> Self {
        if let Some(ref client) = client {
            info!(model = client.model(), host = client.host(), "Extraction client configured");
        } else {
            warn!("No extraction client configured; uploads will be refused");
        }
        Self {
            client,
            tracker: Arc::new(DocumentTracker::new()),
            extraction_permits: Arc::new(Semaphore::new(config.max_in_flight)),
            extraction_timeout: config.extraction_timeout,
            session: Mutex::new(ChatSession::new()),
            fallback_reply_seq: AtomicUsize::new(0),
        }
    }

    /// Create a pipeline from environment variables
    pub fn from_env() -> Self {
        Self::new(AIClient::from_env())
    }

    /// Whether an extraction client is configured
    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Option<&AIClient> {
        self.client.as_ref()
    }

    /// Subscribe to document state-transition events
    pub fn subscribe_events(&self) -> broadcast::Receiver<DocumentEvent> {
        self.tracker.subscribe()
    }

    /// Accept a document and start its extraction in the background
    ///
    /// Fails up front with `ServiceUnavailable` when no client is configured;
    /// nothing enters the tracker in that case. Otherwise the returned id
    /// refers to a document already in `processing`, and the caller observes
    /// the terminal state via events or polling.
    pub fn upload_document(&self, raw_content: Vec<u8>, kind: DocumentKind) -> Result<Uuid> {
        let Some(client) = self.client.clone() else {
            return Err(Error::ServiceUnavailable);
        };

        let document = Document::new(raw_content, kind);
        let id = self.tracker.insert(document)?;
        self.tracker.mark_processing(id)?;

        let tracker = self.tracker.clone();
        let permits = self.extraction_permits.clone();
        let timeout = self.extraction_timeout;
        tokio::spawn(async move {
            if let Err(e) = process_document(client, tracker, permits, timeout, id, kind).await {
                warn!(document_id = %id, "Extraction task failed: {}", e);
            }
        });

        Ok(id)
    }

    pub fn get_document(&self, id: Uuid) -> Result<Document> {
        self.tracker.get(id)
    }

    pub fn list_documents(&self) -> Result<Vec<Document>> {
        self.tracker.list()
    }

    /// Delete a document and drop any chat selection pointing at it
    ///
    /// An extraction still in flight for this document will find it gone and
    /// discard its result.
    pub fn delete_document(&self, id: Uuid) -> Result<()> {
        self.tracker.delete(id)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::InvalidData("Failed to acquire chat session lock".into()))?;
        session.clear_selection_of(id);
        Ok(())
    }

    /// Copy a document's extracted transactions into the ledger
    pub fn merge_into_ledger(&self, id: Uuid, ledger: &mut Ledger) -> Result<Vec<Transaction>> {
        self.tracker.merge_into_ledger(id, ledger)
    }

    /// Focus the chat on a specific document
    pub fn select_document(&self, id: Uuid) -> Result<()> {
        self.tracker.get(id)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::InvalidData("Failed to acquire chat session lock".into()))?;
        session.select_document(id);
        Ok(())
    }

    /// Run one chat exchange and return the assistant's message
    ///
    /// Passing a document id focuses the conversation on that document for
    /// this and subsequent turns. Service failures never surface to the
    /// caller: the assistant answers with a generic fallback reply instead,
    /// and the transcript keeps growing either way.
    pub async fn send_chat_message(
        &self,
        text: &str,
        document_id: Option<Uuid>,
        ledger: Option<&Ledger>,
    ) -> Result<ChatMessage> {
        if let Some(id) = document_id {
            self.select_document(id)?;
        }

        // Snapshot under the lock; never hold it across an await
        let (transcript, active_id) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| Error::InvalidData("Failed to acquire chat session lock".into()))?;
            let active_id = session.active_document();
            session.push(ChatMessage::user(text, active_id));
            (session.transcript().to_vec(), active_id)
        };

        let active_document = match active_id {
            Some(id) => self.tracker.get(id).ok(),
            None => None,
        };

        // The user message is already in the snapshot, so drop it from the
        // prior-turns slice and pass it as the new message.
        let prior = &transcript[..transcript.len() - 1];
        let request = chat::build_chat_request(text, prior, active_document.as_ref(), ledger);

        let reply_text = match &self.client {
            Some(client) => match client.chat(&request).await {
                Ok(reply) => reply.message,
                Err(e) => {
                    warn!("Chat exchange failed, substituting fallback reply: {}", e);
                    self.next_fallback_reply()
                }
            },
            None => self.next_fallback_reply(),
        };

        let reply = ChatMessage::assistant(reply_text, active_id);
        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::InvalidData("Failed to acquire chat session lock".into()))?;
        session.push(reply.clone());
        Ok(reply)
    }

    fn next_fallback_reply(&self) -> String {
        let seq = self.fallback_reply_seq.fetch_add(1, Ordering::Relaxed);
        chat::fallback_reply(seq).to_string()
    }

    /// The full session transcript
    pub fn transcript(&self) -> Result<Vec<ChatMessage>> {
        let session = self
            .session
            .lock()
            .map_err(|_| Error::InvalidData("Failed to acquire chat session lock".into()))?;
        Ok(session.transcript().to_vec())
    }

    /// Generate insights over the recent ledger window (best-effort)
    pub async fn fetch_insights(&self, ledger: &Ledger) -> Vec<String> {
        insights::fetch_insights(self.client.as_ref(), ledger).await
    }

    /// Check whether the extraction service is reachable
    pub async fn health_check(&self) -> bool {
        match &self.client {
            Some(client) => client.health_check().await,
            None => false,
        }
    }
}

/// Drive one document through extraction to a terminal state
///
/// Every exit path lands the document in `completed` or `rejected`: a clean
/// invalid-document verdict rejects, and any failure (transport, undecodable
/// payload, timeout, local configuration) completes with a synthetic
/// fallback result.
async fn process_document(
    client: AIClient,
    tracker: Arc<DocumentTracker>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    id: Uuid,
    kind: DocumentKind,
) -> Result<()> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| Error::InvalidData("Extraction semaphore closed".into()))?;

    let raw_content = tracker.get(id)?.raw_content;

    let outcome = tokio::time::timeout(timeout, client.extract_document(&raw_content, kind)).await;
    let outcome: Result<ExtractionResult> = match outcome {
        Ok(inner) => inner,
        Err(_) => Err(Error::Transport(format!(
            "extraction timed out after {:?}",
            timeout
        ))),
    };

    let applied = match outcome {
        Ok(result) if result.is_valid_document => {
            let today = Utc::now().date_naive();
            let transactions: Vec<Transaction> = result
                .transactions
                .into_iter()
                .map(|raw| raw.into_transaction(today))
                .collect();
            info!(
                document_id = %id,
                count = transactions.len(),
                confidence = result.confidence,
                "Extraction completed"
            );
            tracker.complete(id, transactions, result.analysis)?
        }
        Ok(result) => {
            let reason = result
                .rejection_reason
                .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
            info!(document_id = %id, reason = %reason, "Document rejected");
            tracker.reject(id, reason)?
        }
        // Any failure, not just the transport/malformed set, must still land
        // the document in a terminal state; a stuck `processing` document is
        // never an acceptable outcome.
        Err(e) => {
            warn!(document_id = %id, "Extraction failed, applying fallback: {}", e);
            let today = Utc::now().date_naive();
            let result = fallback::synthetic_result(kind, today);
            let transactions: Vec<Transaction> = result
                .transactions
                .into_iter()
                .map(|raw| raw.into_transaction(today))
                .collect();
            tracker.complete(id, transactions, result.analysis)?
        }
    };

    if !applied {
        debug!(document_id = %id, "Extraction result discarded");
    }
    Ok(())
}
