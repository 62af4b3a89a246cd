//! Integration tests for ledgerlens-core
//!
//! These tests exercise the full upload -> extract -> merge workflow
//! through the pipeline's public API, with the mock backend standing in
//! for the extraction service.

use std::time::Duration;

use ledgerlens_core::{
    AIClient, DocumentKind, DocumentStatus, Error, Ledger, Pipeline, TransactionKind,
};

async fn wait_terminal(pipeline: &Pipeline, id: uuid::Uuid) -> DocumentStatus {
    let mut events = pipeline.subscribe_events();
    loop {
        if let Ok(doc) = pipeline.get_document(id) {
            if doc.status.is_terminal() {
                return doc.status;
            }
        }
        match tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
            Ok(Ok(_)) => continue,
            _ => panic!("document {} never reached a terminal state", id),
        }
    }
}

#[tokio::test]
async fn test_full_ingestion_workflow() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let id = pipeline
        .upload_document(b"photographed lunch receipt".to_vec(), DocumentKind::Image)
        .expect("upload failed");

    // The document is already past queued when upload returns
    let doc = pipeline.get_document(id).unwrap();
    assert!(matches!(
        doc.status,
        DocumentStatus::Processing | DocumentStatus::Completed
    ));

    assert_eq!(wait_terminal(&pipeline, id).await, DocumentStatus::Completed);

    let doc = pipeline.get_document(id).unwrap();
    assert_eq!(doc.extracted_transactions.len(), 2);
    let total: f64 = doc
        .extracted_transactions
        .iter()
        .map(|tx| tx.amount)
        .sum();
    assert!((total - 15.50).abs() < f64::EPSILON);
    for tx in &doc.extracted_transactions {
        assert_eq!(tx.category, "food");
        assert_eq!(tx.kind, TransactionKind::Expense);
    }

    // Merge copies the transactions into the ledger
    let mut ledger = Ledger::new();
    let merged = pipeline.merge_into_ledger(id, &mut ledger).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(ledger.len(), 2);

    // Merging again appends the same transactions a second time
    pipeline.merge_into_ledger(id, &mut ledger).unwrap();
    assert_eq!(ledger.len(), 4);
}

#[tokio::test]
async fn test_non_financial_image_rejected_with_reason() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let id = pipeline
        .upload_document(b"not-financial vacation photo".to_vec(), DocumentKind::Image)
        .unwrap();

    assert_eq!(wait_terminal(&pipeline, id).await, DocumentStatus::Rejected);

    let doc = pipeline.get_document(id).unwrap();
    assert!(doc.extracted_transactions.is_empty());
    assert_eq!(doc.analysis.as_deref(), Some("not a financial document"));

    // A rejected document merges nothing
    let mut ledger = Ledger::new();
    let merged = pipeline.merge_into_ledger(id, &mut ledger).unwrap();
    assert!(merged.is_empty());
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn test_service_failure_degrades_to_placeholder_result() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let id = pipeline
        .upload_document(b"transport-error".to_vec(), DocumentKind::Image)
        .unwrap();

    // The failure completes the document rather than rejecting it
    assert_eq!(wait_terminal(&pipeline, id).await, DocumentStatus::Completed);

    let doc = pipeline.get_document(id).unwrap();
    assert!(!doc.extracted_transactions.is_empty());
    let analysis = doc.analysis.unwrap();
    assert!(analysis.contains("Automatic extraction was unavailable"));
    for tx in &doc.extracted_transactions {
        assert_eq!(tx.category, "other");
        assert!(tx.description.contains("image"));
    }
}

#[tokio::test]
async fn test_undecodable_response_degrades_to_placeholder_result() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let id = pipeline
        .upload_document(b"malformed payload".to_vec(), DocumentKind::Pdf)
        .unwrap();

    assert_eq!(wait_terminal(&pipeline, id).await, DocumentStatus::Completed);
    let doc = pipeline.get_document(id).unwrap();
    assert!(doc.analysis.unwrap().contains("pdf"));
}

#[tokio::test]
async fn test_upload_refused_without_credentials() {
    let pipeline = Pipeline::new(None);

    let err = pipeline
        .upload_document(b"receipt".to_vec(), DocumentKind::Image)
        .unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable));

    // Nothing was tracked
    assert!(pipeline.list_documents().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_uploads_progress_independently() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let ok = pipeline
        .upload_document(b"receipt one".to_vec(), DocumentKind::Image)
        .unwrap();
    let rejected = pipeline
        .upload_document(b"not-financial doodle".to_vec(), DocumentKind::Image)
        .unwrap();
    let degraded = pipeline
        .upload_document(b"transport-error".to_vec(), DocumentKind::Pdf)
        .unwrap();

    assert_eq!(wait_terminal(&pipeline, ok).await, DocumentStatus::Completed);
    assert_eq!(
        wait_terminal(&pipeline, rejected).await,
        DocumentStatus::Rejected
    );
    assert_eq!(
        wait_terminal(&pipeline, degraded).await,
        DocumentStatus::Completed
    );

    assert_eq!(pipeline.list_documents().unwrap().len(), 3);
}

#[tokio::test]
async fn test_deleted_document_discards_late_result() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let id = pipeline
        .upload_document(b"receipt".to_vec(), DocumentKind::Image)
        .unwrap();
    // Delete before the background extraction necessarily lands
    let _ = pipeline.delete_document(id);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pipeline.get_document(id).is_err());
}

#[tokio::test]
async fn test_chat_continues_through_service_failure() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let first = pipeline
        .send_chat_message("how much did I spend on food?", None, None)
        .await
        .unwrap();
    assert!(first.text.contains("how much did I spend on food?"));

    let degraded = pipeline
        .send_chat_message("transport-error in here", None, None)
        .await
        .unwrap();
    assert!(!degraded.text.is_empty());
    assert!(!degraded.text.contains("transport-error"));

    // Both exchanges are in the transcript, in order
    let transcript = pipeline.transcript().unwrap();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[0].text, "how much did I spend on food?");
    assert_eq!(transcript[1].id, first.id);
}

#[tokio::test]
async fn test_insights_over_merged_ledger() {
    let pipeline = Pipeline::new(Some(AIClient::mock()));

    let id = pipeline
        .upload_document(b"receipt".to_vec(), DocumentKind::Image)
        .unwrap();
    wait_terminal(&pipeline, id).await;

    let mut ledger = Ledger::new();
    pipeline.merge_into_ledger(id, &mut ledger).unwrap();

    let insights = pipeline.fetch_insights(&ledger).await;
    assert_eq!(insights.len(), 2);

    // Empty ledger yields no insights at all
    assert!(pipeline.fetch_insights(&Ledger::new()).await.is_empty());
}
