use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::services::ScoringPolicy;
use crate::errors::{LedgerError, LedgerResult};

use super::transaction::{Transaction, TransactionId};

/// Buyer identifier: a tax ID, trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BuyerId(String);

impl BuyerId {
    pub fn parse(raw: &str) -> LedgerResult<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(LedgerError::InvalidInput(
                "buyer id must not be empty".into(),
            ));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for BuyerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        BuyerId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for BuyerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the ledger knows about one buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfile {
    pub id: BuyerId,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub reward_points: u32,
    #[serde(default = "BuyerProfile::score_default")]
    pub score: u8,
}

impl BuyerProfile {
    pub fn new(id: BuyerId) -> Self {
        Self {
            id,
            transactions: Vec::new(),
            reward_points: 0,
            score: ScoringPolicy::BASE_SCORE,
        }
    }

    pub fn score_default() -> u8 {
        ScoringPolicy::BASE_SCORE
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| &txn.id == id)
    }

    pub fn transaction_mut(&mut self, id: &TransactionId) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|txn| &txn.id == id)
    }

    pub fn outstanding(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|txn| txn.is_outstanding())
            .map(|txn| txn.amount)
            .sum()
    }

    /// Returns an id derived from `now` that no transaction in this profile uses yet.
    pub fn next_transaction_id(&self, now: DateTime<Utc>) -> TransactionId {
        let mut millis = now.timestamp_millis();
        let mut candidate = TransactionId::from_millis(millis);
        while self.transaction(&candidate).is_some() {
            millis += 1;
            candidate = TransactionId::from_millis(millis);
        }
        candidate
    }

    pub fn push_transaction(&mut self, transaction: Transaction) -> TransactionId {
        let id = transaction.id.clone();
        self.transactions.push(transaction);
        self.rescore();
        id
    }

    pub fn rescore(&mut self) {
        self.score = ScoringPolicy::score(self);
    }
}
