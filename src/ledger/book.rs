use std::collections::{BTreeMap, HashSet};

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::core::services::ScoringPolicy;
use crate::errors::{LedgerError, LedgerResult};

use super::buyer::{BuyerId, BuyerProfile};

/// All buyer profiles, keyed by buyer identifier.
///
/// Serializes as a single JSON object whose keys are buyer ids; the map is ordered so the
/// encoded document is stable across save/load cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LedgerBook {
    profiles: BTreeMap<BuyerId, BuyerProfile>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profile(&self, id: &BuyerId) -> Option<&BuyerProfile> {
        self.profiles.get(id)
    }

    pub fn profile_mut(&mut self, id: &BuyerId) -> Option<&mut BuyerProfile> {
        self.profiles.get_mut(id)
    }

    pub fn require_profile_mut(&mut self, id: &BuyerId) -> LedgerResult<&mut BuyerProfile> {
        self.profiles
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("buyer {id}")))
    }

    /// Returns the profile for `id`, creating an empty one on first use.
    pub fn profile_or_insert(&mut self, id: &BuyerId) -> &mut BuyerProfile {
        self.profiles
            .entry(id.clone())
            .or_insert_with(|| BuyerProfile::new(id.clone()))
    }

    pub fn remove(&mut self, id: &BuyerId) -> Option<BuyerProfile> {
        self.profiles.remove(id)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &BuyerProfile> {
        self.profiles.values()
    }

    pub fn transaction_count(&self) -> usize {
        self.profiles
            .values()
            .map(|profile| profile.transactions.len())
            .sum()
    }
}

// Keys are decoded raw and normalized afterwards so that two spellings of one buyer
// are reported instead of one silently replacing the other.
impl<'de> Deserialize<'de> for LedgerBook {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, BuyerProfile>::deserialize(deserializer)?;
        let mut profiles = BTreeMap::new();
        for (key, profile) in raw {
            let id = BuyerId::parse(&key).map_err(de::Error::custom)?;
            if profiles.contains_key(&id) {
                return Err(de::Error::custom(format!(
                    "buyer {id} is stored under more than one key"
                )));
            }
            profiles.insert(id, profile);
        }
        Ok(Self { profiles })
    }
}

/// Detects inconsistencies in a loaded book without repairing them.
pub fn book_warnings(book: &LedgerBook) -> Vec<String> {
    let mut warnings = Vec::new();
    for (key, profile) in &book.profiles {
        if key != &profile.id {
            warnings.push(format!(
                "profile stored under {} carries id {}",
                key, profile.id
            ));
        }
        let expected = ScoringPolicy::score(profile);
        if profile.score != expected {
            warnings.push(format!(
                "buyer {} has score {} but outstanding balance implies {}",
                profile.id, profile.score, expected
            ));
        }
        let mut seen = HashSet::new();
        for txn in &profile.transactions {
            if !seen.insert(&txn.id) {
                warnings.push(format!(
                    "buyer {} has duplicate transaction id {}",
                    profile.id, txn.id
                ));
            }
        }
    }
    warnings
}
