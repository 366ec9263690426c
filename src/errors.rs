use std::fmt;

use thiserror::Error;

use crate::ledger::TransactionId;

/// Why an approval challenge refused to authorize a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Mismatch,
    Expired,
    AttemptsExhausted,
    Declined,
    Consumed,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectionReason::Mismatch => "code does not match",
            RejectionReason::Expired => "code expired",
            RejectionReason::AttemptsExhausted => "too many attempts",
            RejectionReason::Declined => "buyer declined",
            RejectionReason::Consumed => "challenge already used",
        };
        f.write_str(label)
    }
}

/// Error type that captures ledger, approval, and persistence failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Approval rejected: {0}")]
    ApprovalRejected(RejectionReason),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Transaction {0} is already settled")]
    AlreadySettled(TransactionId),
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
    #[error("Notification failed: {0}")]
    NotificationFailed(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::PersistenceUnavailable(err.to_string())
    }
}
