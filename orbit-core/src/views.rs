//! Derived-view engine.
//!
//! Pure functions over the in-memory lists. Everything here is deterministic
//! and side-effect-free (apart from a defensive log line) and is recomputed
//! on demand; there is no incremental or cached aggregation.

use log::warn;
use shared::{JournalEntry, Mood, Transaction, TransactionType};

/// Net balance: income adds, expense subtracts.
///
/// A non-finite amount contributes nothing and logs a warning. New writes
/// are validated, but imported documents from before that validation (or
/// hand-edited ones) can still carry garbage.
pub fn net_balance(transactions: &[Transaction]) -> f64 {
    transactions.iter().fold(0.0, |acc, tx| {
        let amount = sane_amount(tx);
        match tx.kind {
            TransactionType::Income => acc + amount,
            TransactionType::Expense => acc - amount,
        }
    })
}

/// Sum of amounts over transactions of the given type.
pub fn totals(transactions: &[Transaction], kind: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|tx| tx.kind == kind)
        .map(sane_amount)
        .sum()
}

/// Mood of the most-recently-created entry (position 0 of the
/// descending-ordered sequence); `neutral` when there are no entries.
pub fn recent_mood(entries: &[JournalEntry]) -> Mood {
    entries.first().map(|e| e.mood).unwrap_or_default()
}

/// Most-recent slice for activity views: the first `n` items of an already
/// descending-ordered sequence.
pub fn recent<T>(items: &[T], n: usize) -> &[T] {
    &items[..items.len().min(n)]
}

fn sane_amount(tx: &Transaction) -> f64 {
    if tx.amount.is_finite() {
        tx.amount
    } else {
        warn!(
            "Transaction {} has a non-finite amount; treating as 0 in aggregates",
            tx.id
        );
        0.0
    }
}
