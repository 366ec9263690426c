//! Creditworthiness scoring.

use crate::ledger::BuyerProfile;

/// Maps a profile's outstanding balance to a score in `[MIN_SCORE, BASE_SCORE]`.
///
/// One point is lost per 1000 outstanding, capped at `MAX_PENALTY`. The result is
/// rounded half-up, so an outstanding balance of 1500 scores 99.
pub struct ScoringPolicy;

impl ScoringPolicy {
    pub const BASE_SCORE: u8 = 100;
    pub const MIN_SCORE: u8 = 20;
    pub const MAX_PENALTY: f64 = 80.0;
    pub const PENALTY_DIVISOR: f64 = 1000.0;

    pub fn score(profile: &BuyerProfile) -> u8 {
        Self::score_for_outstanding(profile.outstanding())
    }

    pub fn score_for_outstanding(outstanding: f64) -> u8 {
        if outstanding.is_nan() || outstanding <= 0.0 {
            return Self::BASE_SCORE;
        }
        let penalty = (outstanding / Self::PENALTY_DIVISOR).clamp(0.0, Self::MAX_PENALTY);
        let raw = (f64::from(Self::BASE_SCORE) - penalty).round();
        raw.clamp(f64::from(Self::MIN_SCORE), f64::from(Self::BASE_SCORE)) as u8
    }
}
