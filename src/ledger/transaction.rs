use std::fmt;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, LedgerResult};

/// Identifier of a credit event: the creation instant in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    /// Parses user input; only non-empty ids are accepted.
    pub fn parse(raw: &str) -> LedgerResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidInput(
                "transaction id must not be empty".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn millis(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single credit extended by a seller to a buyer.
///
/// Stored records pass the same checks as [`Transaction::new`]; a document holding an
/// empty seller or a non-positive amount fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredTransaction")]
pub struct Transaction {
    pub id: TransactionId,
    pub seller: String,
    pub amount: f64,
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,
    pub paid: bool,
}

impl Transaction {
    /// Builds an unpaid transaction, rejecting empty sellers and non-positive amounts.
    pub fn new(
        id: TransactionId,
        seller: &str,
        amount: f64,
        date: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let seller = validate_seller(seller)?;
        validate_amount(amount)?;
        Ok(Self {
            id,
            seller,
            amount,
            date: truncate_millis(date),
            paid: false,
        })
    }

    pub fn is_outstanding(&self) -> bool {
        !self.paid
    }
}

#[derive(Deserialize)]
struct StoredTransaction {
    id: TransactionId,
    seller: String,
    amount: f64,
    #[serde(with = "iso_millis")]
    date: DateTime<Utc>,
    paid: bool,
}

impl TryFrom<StoredTransaction> for Transaction {
    type Error = LedgerError;

    fn try_from(stored: StoredTransaction) -> LedgerResult<Self> {
        if stored.id.as_str().trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "transaction id must not be empty".into(),
            ));
        }
        validate_seller(&stored.seller)?;
        validate_amount(stored.amount)?;
        Ok(Self {
            id: stored.id,
            seller: stored.seller,
            amount: stored.amount,
            date: stored.date,
            paid: stored.paid,
        })
    }
}

pub(crate) fn validate_seller(seller: &str) -> LedgerResult<String> {
    let trimmed = seller.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidInput("seller must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_amount(amount: f64) -> LedgerResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidInput(format!(
            "amount must be a positive number, got {amount}"
        )));
    }
    Ok(())
}

/// Drops sub-millisecond precision so stored dates survive a save/load cycle unchanged.
pub(crate) fn truncate_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    date.duration_trunc(Duration::milliseconds(1))
        .unwrap_or(date)
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
