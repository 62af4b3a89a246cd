//! Document lifecycle tracker
//!
//! Owns the state of every uploaded document and the transactions/analysis
//! attached to each. Transitions are keyed by document id and independent
//! across documents, so concurrent uploads never serialize on each other.
//! State changes are published on a broadcast channel for observers.
//!
//! Per-document state machine:
//!
//! ```text
//! queued --(submit)--> processing --(valid)----> completed
//!                      processing --(invalid)--> rejected
//!                      processing --(failure)--> completed  [fallback]
//! ```
//!
//! `completed` and `rejected` are terminal. A late extraction result for a
//! document that was deleted (or already terminal) is discarded, never
//! applied.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::models::{Document, DocumentStatus, Transaction};

/// State-transition event published to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    Queued(Uuid),
    Processing(Uuid),
    Completed(Uuid),
    Rejected(Uuid),
    Deleted(Uuid),
}

impl DocumentEvent {
    pub fn document_id(&self) -> Uuid {
        match self {
            Self::Queued(id)
            | Self::Processing(id)
            | Self::Completed(id)
            | Self::Rejected(id)
            | Self::Deleted(id) => *id,
        }
    }
}

/// Tracks every uploaded document and its extraction state
pub struct DocumentTracker {
    documents: RwLock<HashMap<Uuid, Document>>,
    events: broadcast::Sender<DocumentEvent>,
}

impl Default for DocumentTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            documents: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to state-transition events
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DocumentEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Register a new document in `queued` state
    pub fn insert(&self, document: Document) -> Result<Uuid> {
        let id = document.id;
        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;
        documents.insert(id, document);
        drop(documents);

        self.emit(DocumentEvent::Queued(id));
        Ok(id)
    }

    /// Submit a queued document for extraction (`queued` -> `processing`)
    pub fn mark_processing(&self, id: Uuid) -> Result<()> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("document {}", id)))?;

        if document.status != DocumentStatus::Queued {
            return Err(Error::InvalidData(format!(
                "document {} is {}, not queued",
                id,
                document.status.as_str()
            )));
        }
        document.status = DocumentStatus::Processing;
        drop(documents);

        self.emit(DocumentEvent::Processing(id));
        Ok(())
    }

    /// Apply a successful extraction (`processing` -> `completed`)
    ///
    /// Returns false when the result was discarded because the document was
    /// deleted while extraction was in flight, or had already reached a
    /// terminal state.
    pub fn complete(
        &self,
        id: Uuid,
        transactions: Vec<Transaction>,
        analysis: String,
    ) -> Result<bool> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;

        let Some(document) = documents.get_mut(&id) else {
            debug!(document_id = %id, "Discarding extraction result for deleted document");
            return Ok(false);
        };
        if document.status.is_terminal() {
            debug!(document_id = %id, "Discarding extraction result for terminal document");
            return Ok(false);
        }

        document.status = DocumentStatus::Completed;
        document.extracted_transactions = transactions;
        document.analysis = Some(analysis);
        drop(documents);

        self.emit(DocumentEvent::Completed(id));
        Ok(true)
    }

    /// Apply a clean rejection (`processing` -> `rejected`)
    ///
    /// The transaction set is always empty for rejected documents, even when
    /// the raw result carried transactions; the analysis field holds the
    /// rejection reason.
    pub fn reject(&self, id: Uuid, reason: String) -> Result<bool> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;

        let Some(document) = documents.get_mut(&id) else {
            debug!(document_id = %id, "Discarding rejection for deleted document");
            return Ok(false);
        };
        if document.status.is_terminal() {
            debug!(document_id = %id, "Discarding rejection for terminal document");
            return Ok(false);
        }

        document.status = DocumentStatus::Rejected;
        document.extracted_transactions = Vec::new();
        document.analysis = Some(reason);
        drop(documents);

        self.emit(DocumentEvent::Rejected(id));
        Ok(true)
    }

    /// Get a document by id
    pub fn get(&self, id: Uuid) -> Result<Document> {
        let documents = self
            .documents
            .read()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;
        documents
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document {}", id)))
    }

    /// All documents, most recent upload first
    pub fn list(&self) -> Result<Vec<Document>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;
        let mut all: Vec<Document> = documents.values().cloned().collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(all)
    }

    /// Delete a document, from any state
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire document store lock".into()))?;
        documents
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("document {}", id)))?;
        drop(documents);

        self.emit(DocumentEvent::Deleted(id));
        Ok(())
    }

    /// Copy a document's extracted transactions into the ledger
    ///
    /// The copy is unconditional: there is no status guard, so merging a
    /// still-processing or rejected document yields an empty copy, and
    /// repeated calls on a completed document append its transactions again.
    pub fn merge_into_ledger(&self, id: Uuid, ledger: &mut Ledger) -> Result<Vec<Transaction>> {
        let document = self.get(id)?;
        let copied = document.extracted_transactions.clone();
        ledger.extend(copied.clone());
        Ok(copied)
    }
}
