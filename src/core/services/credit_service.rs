//! Business logic for recording approved credits.

use chrono::{DateTime, Utc};

use crate::approval::ApprovedCredit;
use crate::errors::LedgerResult;
use crate::ledger::{LedgerBook, Transaction, TransactionId};

/// Appends approved credits to buyer profiles.
pub struct CreditService;

impl CreditService {
    /// Records an approved credit and returns the new transaction's identifier.
    ///
    /// The buyer's profile is created on first use. The book is left untouched if the
    /// transaction cannot be built.
    pub fn record(
        book: &mut LedgerBook,
        approved: ApprovedCredit,
        now: DateTime<Utc>,
    ) -> LedgerResult<TransactionId> {
        let credit = approved.into_credit();
        let id = match book.profile(&credit.buyer) {
            Some(profile) => profile.next_transaction_id(now),
            None => TransactionId::from_millis(now.timestamp_millis()),
        };
        let transaction = Transaction::new(id, &credit.seller, credit.amount, now)?;
        let profile = book.profile_or_insert(&credit.buyer);
        let id = profile.push_transaction(transaction);
        tracing::info!(
            buyer = %credit.buyer,
            transaction = %id,
            amount = credit.amount,
            score = profile.score,
            "credit recorded"
        );
        Ok(id)
    }
}
