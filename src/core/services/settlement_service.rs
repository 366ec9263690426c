//! Settlement of outstanding credits and the reward rule that goes with it.

use chrono::{DateTime, Utc};

use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{BuyerId, BuyerProfile, FinancialYear, LedgerBook, TransactionId};

pub const DEFAULT_REWARD_POINTS: u32 = 10;

/// Outcome of a successful settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub profile: BuyerProfile,
    pub points_awarded: u32,
}

/// Marks transactions paid, awarding points when repayment lands in the same financial year.
pub struct SettlementService;

impl SettlementService {
    pub fn settle(
        book: &mut LedgerBook,
        buyer: &BuyerId,
        transaction: &TransactionId,
        reward_points: u32,
        now: DateTime<Utc>,
    ) -> LedgerResult<Settlement> {
        let profile = book.require_profile_mut(buyer)?;
        let txn = profile.transaction_mut(transaction).ok_or_else(|| {
            LedgerError::NotFound(format!("transaction {transaction} for buyer {buyer}"))
        })?;
        if txn.paid {
            return Err(LedgerError::AlreadySettled(transaction.clone()));
        }
        txn.paid = true;

        let created_in = FinancialYear::of_instant(txn.date);
        let settled_in = FinancialYear::of_instant(now);
        let points_awarded = if created_in == settled_in {
            reward_points
        } else {
            0
        };
        profile.reward_points = profile.reward_points.saturating_add(points_awarded);
        profile.rescore();

        tracing::info!(
            buyer = %buyer,
            transaction = %transaction,
            financial_year = %created_in,
            points_awarded,
            score = profile.score,
            "transaction settled"
        );
        Ok(Settlement {
            profile: profile.clone(),
            points_awarded,
        })
    }
}
