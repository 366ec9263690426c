#![doc(test(attr(deny(warnings))))]

//! Credit Core keeps a seller's book of credits extended to buyers: one-time-code
//! approval of each credit, settlement with financial-year rewards, and a simple
//! creditworthiness score derived from the outstanding balance.

pub mod approval;
pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

pub use crate::core::LedgerManager;
pub use errors::{LedgerError, LedgerResult, RejectionReason};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Credit Core tracing initialized.");
    });
}
