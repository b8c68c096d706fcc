//! Ledger rules: receiving stock, applying movements and replaying history
//!
//! A receipt or movement is computed here as one domain event (the batch
//! state after the event plus the ledger entry that explains it). Callers
//! persist both halves inside a single transactional boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Batch, Product, ReceiveBatchInput, RecordMovementInput, Transaction, TransactionType,
};
use crate::validation::{
    validate_movement_quantity, validate_receipt_quantity, validate_timestamp, validate_unit_cost,
};

/// A new batch together with its opening IN entry
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub batch: Batch,
    pub transaction: Transaction,
}

/// Build the batch and IN transaction for a stock receipt
pub fn receive_batch(
    product: &Product,
    input: &ReceiveBatchInput,
    now: DateTime<Utc>,
) -> LedgerResult<Receipt> {
    if product.id != input.product_id {
        return Err(LedgerError::ProductNotFound(input.product_id));
    }
    if product.is_archived {
        return Err(LedgerError::ProductArchived(product.id));
    }

    let created_at = input.received_at.unwrap_or(now);
    validate_timestamp(created_at, None, now)?;

    let production_date = match (product.is_ingredient(), input.production_date) {
        (true, None) => return Err(LedgerError::MissingProductionDate),
        (_, Some(date)) => date,
        (false, None) => created_at.date_naive(),
    };
    validate_receipt_quantity(input.initial_quantity)?;
    validate_unit_cost(input.unit_cost)?;

    let batch = Batch {
        id: Uuid::new_v4(),
        product_id: product.id,
        product_name: product.name.clone(),
        production_date: Some(production_date),
        expiry_date: product.expiry_for(production_date),
        initial_quantity: input.initial_quantity,
        current_quantity: input.initial_quantity,
        unit_cost: input.unit_cost,
        created_at,
    };

    let transaction = Transaction {
        id: Uuid::new_v4(),
        product_id: product.id,
        product_name: product.name.clone(),
        batch_id: Some(batch.id),
        transaction_type: TransactionType::In,
        quantity: batch.initial_quantity,
        timestamp: batch.created_at,
        reason: None,
        notes: None,
        unit_cost_at_transaction: batch.unit_cost,
        is_correction_increase: false,
    };

    Ok(Receipt { batch, transaction })
}

/// Apply a signed movement to `batch` and return the OUT entry recording it.
///
/// `history` holds the batch's existing ledger entries. A movement dated
/// before the latest of them is checked against the balance it would leave at
/// every later entry, not only against the current quantity. The batch is only
/// modified once every check has passed.
pub fn apply_movement(
    batch: &mut Batch,
    history: &[Transaction],
    input: &RecordMovementInput,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    if batch.id != input.batch_id {
        return Err(LedgerError::BatchNotFound(input.batch_id));
    }
    if batch.product_id != input.product_id {
        return Err(LedgerError::BatchProductMismatch {
            batch_id: batch.id,
            product_id: input.product_id,
        });
    }
    validate_movement_quantity(input.quantity)?;

    let timestamp = input.timestamp.unwrap_or(now);
    validate_timestamp(timestamp, Some(batch.created_at), now)?;

    let resulting = batch.current_quantity + input.quantity;
    if resulting < Decimal::ZERO {
        return Err(LedgerError::InsufficientStock {
            available: batch.current_quantity,
            requested: input.quantity.abs(),
        });
    }
    if resulting > batch.initial_quantity {
        return Err(LedgerError::ExceedsInitialQuantity {
            initial: batch.initial_quantity,
            resulting,
        });
    }

    let ledger = BatchLedger::new(batch, history);
    if let Some((low, high)) = ledger.balance_range_after(timestamp) {
        if low + input.quantity < Decimal::ZERO {
            return Err(LedgerError::InsufficientStock {
                available: low,
                requested: input.quantity.abs(),
            });
        }
        if high + input.quantity > batch.initial_quantity {
            return Err(LedgerError::ExceedsInitialQuantity {
                initial: batch.initial_quantity,
                resulting: high + input.quantity,
            });
        }
    }

    batch.current_quantity = resulting;

    Ok(Transaction {
        id: Uuid::new_v4(),
        product_id: batch.product_id,
        product_name: batch.product_name.clone(),
        batch_id: Some(batch.id),
        transaction_type: TransactionType::Out,
        quantity: input.quantity.abs(),
        timestamp,
        reason: Some(input.reason),
        notes: input.notes.clone(),
        unit_cost_at_transaction: batch.unit_cost,
        is_correction_increase: input.quantity > Decimal::ZERO,
    })
}

// ============================================================================
// Replay
// ============================================================================

/// A batch with its own ledger entries in chronological order
#[derive(Debug, Clone)]
pub struct BatchLedger<'a> {
    pub batch: &'a Batch,
    entries: Vec<&'a Transaction>,
}

impl<'a> BatchLedger<'a> {
    pub fn new(batch: &'a Batch, transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut entries: Vec<&Transaction> = transactions
            .into_iter()
            .filter(|t| t.batch_id == Some(batch.id))
            .collect();
        // Stable: entries sharing an instant keep their recorded order, after the receipt
        entries.sort_by_key(|t| replay_order(t));
        Self { batch, entries }
    }

    pub fn entries(&self) -> &[&'a Transaction] {
        &self.entries
    }

    /// Receipts are recorded as IN entries; batches without one open at their
    /// initial quantity instead.
    fn opening_quantity(&self) -> Decimal {
        let has_receipt = self
            .entries
            .iter()
            .any(|t| t.transaction_type == TransactionType::In);
        if has_receipt {
            Decimal::ZERO
        } else {
            self.batch.initial_quantity
        }
    }

    /// Quantity on hand at `as_of`, replaying entries up to and including it.
    /// The running total never drops below zero.
    pub fn quantity_at(&self, as_of: DateTime<Utc>) -> Decimal {
        if self.batch.created_at > as_of {
            return Decimal::ZERO;
        }
        self.entries
            .iter()
            .take_while(|t| t.timestamp <= as_of)
            .fold(self.opening_quantity(), |qty, t| {
                (qty + t.signed_quantity()).max(Decimal::ZERO)
            })
    }

    /// Unclamped balance over the whole ledger, for auditing
    pub fn balance(&self) -> Decimal {
        self.entries
            .iter()
            .fold(self.opening_quantity(), |qty, t| qty + t.signed_quantity())
    }

    /// Lowest and highest unclamped balance from `at` onwards, or `None` when
    /// no entry is dated after `at`. An entry recorded at `at` replays after
    /// the existing entries of that instant.
    fn balance_range_after(&self, at: DateTime<Utc>) -> Option<(Decimal, Decimal)> {
        let split = self.entries.partition_point(|t| t.timestamp <= at);
        if split == self.entries.len() {
            return None;
        }

        let mut balance = self.entries[..split]
            .iter()
            .fold(self.opening_quantity(), |qty, t| qty + t.signed_quantity());
        let (mut low, mut high) = (balance, balance);
        for entry in &self.entries[split..] {
            balance += entry.signed_quantity();
            low = low.min(balance);
            high = high.max(balance);
        }
        Some((low, high))
    }
}

/// Replay key: time first, and a receipt before any movement of the same instant
pub fn replay_order(transaction: &Transaction) -> (DateTime<Utc>, bool) {
    (
        transaction.timestamp,
        transaction.transaction_type != TransactionType::In,
    )
}

/// Pair every batch with its entries, grouping the transactions once
pub fn group_by_batch<'a>(
    batches: &'a [Batch],
    transactions: &'a [Transaction],
) -> Vec<BatchLedger<'a>> {
    let mut by_batch: HashMap<Uuid, Vec<&'a Transaction>> = HashMap::new();
    for transaction in transactions {
        if let Some(batch_id) = transaction.batch_id {
            by_batch.entry(batch_id).or_default().push(transaction);
        }
    }

    batches
        .iter()
        .map(|batch| {
            let entries = by_batch.remove(&batch.id).unwrap_or_default();
            BatchLedger::new(batch, entries)
        })
        .collect()
}

/// Outcome of reconciling a batch against its ledger
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchAudit {
    pub batch_id: Uuid,
    pub stored_quantity: Decimal,
    pub replayed_quantity: Decimal,
    pub entry_count: usize,
    pub is_consistent: bool,
}

impl BatchAudit {
    pub fn into_result(self) -> LedgerResult<Self> {
        if self.is_consistent {
            Ok(self)
        } else {
            Err(LedgerError::LedgerInconsistent {
                expected: self.replayed_quantity,
                actual: self.stored_quantity,
            })
        }
    }
}

/// Replay the ledger of `batch` and compare it to the stored quantity
pub fn audit_batch(batch: &Batch, transactions: &[Transaction]) -> BatchAudit {
    let ledger = BatchLedger::new(batch, transactions);
    let replayed_quantity = ledger.balance();
    BatchAudit {
        batch_id: batch.id,
        stored_quantity: batch.current_quantity,
        replayed_quantity,
        entry_count: ledger.entries().len(),
        is_consistent: replayed_quantity == batch.current_quantity,
    }
}
