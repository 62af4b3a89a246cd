//! Insight synthesis over the recent ledger window
//!
//! Insights are advisory and strictly best-effort: any failure, and the
//! absence of a configured client, yield an empty list rather than an error.
//! An empty ledger short-circuits without a network call.

use serde::Serialize;
use tracing::warn;

use crate::ai::{AIClient, ExtractionBackend};
use crate::ledger::Ledger;
use crate::models::Transaction;

/// At most this many recent transactions are sent for insight synthesis
pub const INSIGHT_WINDOW: usize = 20;

#[derive(Serialize)]
struct InsightTransaction<'a> {
    date: String,
    amount: f64,
    description: &'a str,
    category: &'a str,
}

impl<'a> From<&'a Transaction> for InsightTransaction<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            date: tx.date.to_string(),
            amount: tx.signed_amount(),
            description: &tx.description,
            category: &tx.category,
        }
    }
}

/// Serialize the insight window as compact JSON
pub fn serialize_window(transactions: &[Transaction]) -> serde_json::Result<String> {
    let window: Vec<InsightTransaction> = transactions.iter().map(Into::into).collect();
    serde_json::to_string(&window)
}

/// Generate observations about the most recent ledger transactions
///
/// Returns an empty list when no client is configured, the ledger is empty,
/// or the service call fails in any way.
pub async fn fetch_insights(client: Option<&AIClient>, ledger: &Ledger) -> Vec<String> {
    let Some(client) = client else {
        return Vec::new();
    };
    if ledger.is_empty() {
        return Vec::new();
    }

    let window = ledger.recent(INSIGHT_WINDOW);
    let payload = match serialize_window(window) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize insight window: {}", e);
            return Vec::new();
        }
    };

    match client.generate_insights(&payload).await {
        Ok(insights) => insights,
        Err(e) => {
            warn!("Insight generation failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use chrono::NaiveDate;

    fn tx(description: &str, kind: TransactionKind) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            20.0,
            "shopping",
            description,
            kind,
        )
    }

    #[test]
    fn test_window_serialization_signed() {
        let transactions = vec![
            tx("Paycheck", TransactionKind::Income),
            tx("Groceries", TransactionKind::Expense),
        ];
        let json = serialize_window(&transactions).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded[0]["amount"], 20.0);
        assert_eq!(decoded[1]["amount"], -20.0);
        assert_eq!(decoded[1]["category"], "shopping");
    }

    #[tokio::test]
    async fn test_no_client_yields_empty() {
        let mut ledger = Ledger::new();
        ledger.append(tx("Groceries", TransactionKind::Expense));
        assert!(fetch_insights(None, &ledger).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_ledger_yields_empty() {
        let client = AIClient::mock();
        assert!(fetch_insights(Some(&client), &Ledger::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_window_capped_at_20() {
        let mut ledger = Ledger::new();
        for i in 0..25 {
            ledger.append(tx(&format!("item-{}", i), TransactionKind::Expense));
        }
        let json = serialize_window(ledger.recent(INSIGHT_WINDOW)).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.as_array().unwrap().len(), 20);
        assert_eq!(decoded[0]["description"], "item-5");
        assert_eq!(decoded[19]["description"], "item-24");
    }

    #[tokio::test]
    async fn test_service_failure_yields_empty() {
        let client = AIClient::mock();
        let mut ledger = Ledger::new();
        ledger.append(tx("transport-error", TransactionKind::Expense));
        assert!(fetch_insights(Some(&client), &ledger).await.is_empty());
    }
}
