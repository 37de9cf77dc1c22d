use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::decimal::Money;
use crate::errors::{FeesError, Result};
use crate::types::{PaymentId, UserId};

/// immutable proof of payment; balances are a snapshot at issuance time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub payment: PaymentId,
    pub receipt_number: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: UserId,
    pub amount_paid: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
}

/// per-year receipt counters.
///
/// numbers are assigned under the lock with a single increment, never by
/// reading the last issued number back, so concurrent assignment cannot
/// produce a duplicate.
#[derive(Debug, Default)]
pub struct ReceiptSequencer {
    counters: Mutex<HashMap<i32, u32>>,
}

impl ReceiptSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// next number for the year: RCP-<year>-<6-digit sequence>, starting at 1
    pub fn next_number(&self, year: i32) -> String {
        let mut counters = self.counters.lock().expect("receipt counter poisoned");
        let seq = counters.entry(year).or_insert(0);
        *seq += 1;
        format!("RCP-{}-{:06}", year, seq)
    }

    /// highest sequence issued for the year so far
    pub fn last_issued(&self, year: i32) -> u32 {
        let counters = self.counters.lock().expect("receipt counter poisoned");
        counters.get(&year).copied().unwrap_or(0)
    }

    /// counter snapshot, used when exporting office state
    pub fn snapshot(&self) -> HashMap<i32, u32> {
        self.counters.lock().expect("receipt counter poisoned").clone()
    }

    /// restore counters from an exported snapshot
    pub fn restore(snapshot: HashMap<i32, u32>) -> Self {
        Self {
            counters: Mutex::new(snapshot),
        }
    }
}

/// issued receipts with their sequencer; numbers are unique per year
#[derive(Debug, Default)]
pub struct ReceiptBook {
    sequencer: ReceiptSequencer,
    receipts: Vec<Receipt>,
    by_number: HashMap<String, usize>,
}

impl ReceiptBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// issue a receipt for a verified payment, numbered in the given year
    pub fn issue(
        &mut self,
        payment: PaymentId,
        amount_paid: Money,
        previous_balance: Money,
        new_balance: Money,
        generated_by: UserId,
        generated_at: DateTime<Utc>,
    ) -> Result<&Receipt> {
        let number = self.sequencer.next_number(generated_at.year());
        if self.by_number.contains_key(&number) {
            return Err(FeesError::DuplicateReceiptNumber { number });
        }
        let idx = self.receipts.len();
        self.receipts.push(Receipt {
            payment,
            receipt_number: number.clone(),
            generated_at,
            generated_by,
            amount_paid,
            previous_balance,
            new_balance,
        });
        self.by_number.insert(number, idx);
        Ok(&self.receipts[idx])
    }

    pub fn by_number(&self, number: &str) -> Result<&Receipt> {
        self.by_number
            .get(number)
            .map(|&i| &self.receipts[i])
            .ok_or_else(|| FeesError::ReceiptNotFound {
                number: number.to_string(),
            })
    }

    pub fn for_payment(&self, payment: PaymentId) -> Option<&Receipt> {
        self.receipts.iter().find(|r| r.payment == payment)
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn sequencer(&self) -> &ReceiptSequencer {
        &self.sequencer
    }

    pub(crate) fn restore_sequencer(&mut self, snapshot: HashMap<i32, u32>) {
        self.sequencer = ReceiptSequencer::restore(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use uuid::Uuid;

    #[test]
    fn test_numbers_start_at_one_per_year() {
        let sequencer = ReceiptSequencer::new();
        assert_eq!(sequencer.next_number(2025), "RCP-2025-000001");
        assert_eq!(sequencer.next_number(2025), "RCP-2025-000002");
        // a new year restarts regardless of the old year's sequence
        assert_eq!(sequencer.next_number(2026), "RCP-2026-000001");
        assert_eq!(sequencer.last_issued(2025), 2);
    }

    #[test]
    fn test_sequential_numbers_have_no_gaps() {
        let sequencer = ReceiptSequencer::new();
        for expected in 1..=250u32 {
            let number = sequencer.next_number(2025);
            assert_eq!(number, format!("RCP-2025-{:06}", expected));
        }
    }

    #[test]
    fn test_concurrent_assignment_has_no_duplicates() {
        let sequencer = Arc::new(ReceiptSequencer::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let sequencer = Arc::clone(&sequencer);
            handles.push(thread::spawn(move || {
                (0..100).map(|_| sequencer.next_number(2025)).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap() {
                assert!(seen.insert(number), "duplicate receipt number issued");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(sequencer.last_issued(2025), 800);
    }

    #[test]
    fn test_issue_snapshots_balances() {
        let mut book = ReceiptBook::new();
        let payment = Uuid::new_v4();

        let receipt = book
            .issue(
                payment,
                Money::from_major(100),
                Money::from_major(315),
                Money::from_major(215),
                Uuid::new_v4(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(receipt.previous_balance, Money::from_major(315));
        assert_eq!(receipt.new_balance, Money::from_major(215));

        let number = receipt.receipt_number.clone();
        assert_eq!(book.by_number(&number).unwrap().payment, payment);
        assert!(book.for_payment(payment).is_some());
        assert!(matches!(
            book.by_number("RCP-1999-000001"),
            Err(FeesError::ReceiptNotFound { .. })
        ));
    }
}
