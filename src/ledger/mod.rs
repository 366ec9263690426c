//! Ledger records: buyers, their credit transactions, and the book that holds them.

pub mod book;
pub mod buyer;
pub mod financial_year;
pub mod transaction;

pub use book::{book_warnings, LedgerBook};
pub use buyer::{BuyerId, BuyerProfile};
pub use financial_year::FinancialYear;
pub use transaction::{Transaction, TransactionId};
