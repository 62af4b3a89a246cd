//! Append-only ledger of accepted transactions
//!
//! The ledger is the one piece of genuinely shared state: manual entries and
//! merged document transactions both append to it. All writes are appends,
//! so last-write-wins ordering across sources is acceptable.

use crate::models::Transaction;

/// Ordered collection of accepted transactions
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single transaction
    pub fn append(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Append a batch of transactions, preserving order
    pub fn extend(&mut self, txs: impl IntoIterator<Item = Transaction>) {
        self.transactions.extend(txs);
    }

    /// All transactions in insertion order
    pub fn all(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The most recent `n` transactions by position
    ///
    /// This is the ledger window handed to collaborator calls: 50 for chat
    /// context, 20 for insight generation.
    pub fn recent(&self, n: usize) -> &[Transaction] {
        let start = self.transactions.len().saturating_sub(n);
        &self.transactions[start..]
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use chrono::NaiveDate;

    fn tx(description: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            5.0,
            "food",
            description,
            TransactionKind::Expense,
        )
    }

    #[test]
    fn test_recent_window_smaller_than_ledger() {
        let mut ledger = Ledger::new();
        for i in 0..60 {
            ledger.append(tx(&format!("tx-{}", i)));
        }

        let window = ledger.recent(50);
        assert_eq!(window.len(), 50);
        assert_eq!(window[0].description, "tx-10");
        assert_eq!(window[49].description, "tx-59");
    }

    #[test]
    fn test_recent_window_larger_than_ledger() {
        let mut ledger = Ledger::new();
        ledger.append(tx("only"));

        assert_eq!(ledger.recent(20).len(), 1);
    }

    #[test]
    fn test_recent_on_empty_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.recent(50).is_empty());
    }
}
