use crate::ledger::{BuyerId, BuyerProfile, LedgerBook};

/// Balance snapshot for a single buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyerSummary {
    pub buyer: BuyerId,
    pub outstanding: f64,
    pub settled_total: f64,
    pub open_transactions: usize,
    pub settled_transactions: usize,
    pub reward_points: u32,
    pub score: u8,
}

/// Totals across every buyer in the book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerTotals {
    pub buyers: usize,
    pub transactions: usize,
    pub outstanding: f64,
    pub settled: f64,
}

pub struct SummaryService;

impl SummaryService {
    pub fn summarize(profile: &BuyerProfile) -> BuyerSummary {
        let (open, settled): (Vec<_>, Vec<_>) =
            profile.transactions.iter().partition(|txn| !txn.paid);
        BuyerSummary {
            buyer: profile.id.clone(),
            outstanding: open.iter().map(|txn| txn.amount).sum(),
            settled_total: settled.iter().map(|txn| txn.amount).sum(),
            open_transactions: open.len(),
            settled_transactions: settled.len(),
            reward_points: profile.reward_points,
            score: profile.score,
        }
    }

    /// Summaries for every buyer, highest outstanding balance first.
    pub fn by_outstanding(book: &LedgerBook) -> Vec<BuyerSummary> {
        let mut rows: Vec<_> = book.profiles().map(Self::summarize).collect();
        rows.sort_by(|a, b| {
            b.outstanding
                .total_cmp(&a.outstanding)
                .then_with(|| a.buyer.cmp(&b.buyer))
        });
        rows
    }

    pub fn totals(book: &LedgerBook) -> LedgerTotals {
        book.profiles()
            .map(Self::summarize)
            .fold(LedgerTotals::default(), |mut totals, row| {
                totals.buyers += 1;
                totals.transactions += row.open_transactions + row.settled_transactions;
                totals.outstanding += row.outstanding;
                totals.settled += row.settled_total;
                totals
            })
    }
}
