//! One-time-code approval for credits proposed by a seller.
//!
//! A credit is only committed once the buyer echoes back the code issued for it.
//! [`ApprovalHandshake::initiate`] produces a [`Challenge`]; [`ApprovalHandshake::verify`]
//! turns a matching response into an [`ApprovedCredit`], which is the only input the
//! recorder accepts.

pub mod notifier;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::errors::{LedgerError, LedgerResult, RejectionReason};
use crate::ledger::transaction::{validate_amount, validate_seller};
use crate::ledger::BuyerId;

pub use notifier::{LocalNotifier, Notifier};

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;
pub const DEFAULT_TTL_SECS: i64 = 300;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Validated parameters of a credit awaiting the buyer's approval.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCredit {
    pub buyer: BuyerId,
    pub seller: String,
    pub amount: f64,
}

impl PendingCredit {
    pub fn new(buyer: &str, seller: &str, amount: f64) -> LedgerResult<Self> {
        let buyer = BuyerId::parse(buyer)?;
        let seller = validate_seller(seller)?;
        validate_amount(amount)?;
        Ok(Self {
            buyer,
            seller,
            amount,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Open,
    Approved,
    Closed(RejectionReason),
}

/// A one-time code bound to the credit it authorizes.
///
/// Attempts and approval are tracked on the challenge itself, so it cannot be duplicated:
///
/// ```compile_fail
/// use chrono::Utc;
/// use credit_core::approval::{ApprovalHandshake, PendingCredit};
///
/// let pending = PendingCredit::new("ABCDE1234F", "Ravi", 500.0).unwrap();
/// let challenge = ApprovalHandshake::default().initiate(pending, Utc::now());
/// let _copy = challenge.clone();
/// ```
#[derive(Debug)]
pub struct Challenge {
    id: Uuid,
    pending: PendingCredit,
    code: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    attempts: u32,
    max_attempts: u32,
    state: ChallengeState,
}

impl Challenge {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pending(&self) -> &PendingCredit {
        &self.pending
    }

    /// The issued code, exposed for local display in place of an external delivery channel.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ChallengeState::Open
    }

    /// Exact comparison of a response against the issued code.
    pub fn matches(&self, response: &str) -> bool {
        response == self.code
    }

    fn close(&mut self, reason: RejectionReason) -> LedgerError {
        self.state = ChallengeState::Closed(reason);
        LedgerError::ApprovalRejected(reason)
    }
}

/// Proof that the buyer approved a pending credit. Recording consumes it.
#[derive(Debug, PartialEq)]
pub struct ApprovedCredit {
    challenge_id: Uuid,
    credit: PendingCredit,
}

impl ApprovedCredit {
    pub fn challenge_id(&self) -> Uuid {
        self.challenge_id
    }

    pub fn credit(&self) -> &PendingCredit {
        &self.credit
    }

    pub fn into_credit(self) -> PendingCredit {
        self.credit
    }
}

/// What the buyer answered when asked to approve a credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalResponse {
    Code(String),
    Declined,
}

/// Issues and checks approval codes. Holds only policy; challenges carry their own state.
#[derive(Debug, Clone)]
pub struct ApprovalHandshake {
    ttl: Duration,
    max_attempts: u32,
}

impl Default for ApprovalHandshake {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS), DEFAULT_MAX_ATTEMPTS)
    }
}

impl ApprovalHandshake {
    pub fn new(ttl: Duration, max_attempts: u32) -> Self {
        Self {
            ttl,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn initiate(&self, pending: PendingCredit, now: DateTime<Utc>) -> Challenge {
        let code = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string();
        let challenge = Challenge {
            id: Uuid::new_v4(),
            pending,
            code,
            issued_at: now,
            expires_at: now + self.ttl,
            attempts: 0,
            max_attempts: self.max_attempts,
            state: ChallengeState::Open,
        };
        tracing::debug!(
            challenge = %challenge.id,
            buyer = %challenge.pending.buyer,
            "approval challenge issued"
        );
        challenge
    }

    /// Checks `response` against the challenge, consuming it on success.
    pub fn verify(
        &self,
        challenge: &mut Challenge,
        response: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<ApprovedCredit> {
        match challenge.state {
            ChallengeState::Open => {}
            ChallengeState::Approved => {
                return Err(LedgerError::ApprovalRejected(RejectionReason::Consumed))
            }
            ChallengeState::Closed(reason) => return Err(LedgerError::ApprovalRejected(reason)),
        }
        if now > challenge.expires_at {
            return Err(challenge.close(RejectionReason::Expired));
        }

        challenge.attempts += 1;
        if challenge.matches(response) {
            challenge.state = ChallengeState::Approved;
            tracing::debug!(challenge = %challenge.id, "approval challenge accepted");
            return Ok(ApprovedCredit {
                challenge_id: challenge.id,
                credit: challenge.pending.clone(),
            });
        }

        tracing::debug!(
            challenge = %challenge.id,
            attempts = challenge.attempts,
            "approval code mismatch"
        );
        if challenge.attempts >= challenge.max_attempts {
            return Err(challenge.close(RejectionReason::AttemptsExhausted));
        }
        Err(LedgerError::ApprovalRejected(RejectionReason::Mismatch))
    }

    pub fn respond(
        &self,
        challenge: &mut Challenge,
        response: ApprovalResponse,
        now: DateTime<Utc>,
    ) -> LedgerResult<ApprovedCredit> {
        match response {
            ApprovalResponse::Code(code) => self.verify(challenge, &code, now),
            ApprovalResponse::Declined => Err(self.decline(challenge)),
        }
    }

    pub fn decline(&self, challenge: &mut Challenge) -> LedgerError {
        tracing::debug!(challenge = %challenge.id, "approval declined");
        challenge.close(RejectionReason::Declined)
    }
}
