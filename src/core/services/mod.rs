pub mod credit_service;
pub mod scoring;
pub mod settlement_service;
pub mod summary_service;

pub use credit_service::CreditService;
pub use scoring::ScoringPolicy;
pub use settlement_service::{Settlement, SettlementService, DEFAULT_REWARD_POINTS};
pub use summary_service::{BuyerSummary, LedgerTotals, SummaryService};
