use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::approval::{
    ApprovalHandshake, ApprovalResponse, Challenge, LocalNotifier, Notifier, PendingCredit,
};
use crate::config::Config;
use crate::core::services::{
    BuyerSummary, CreditService, LedgerTotals, Settlement, SettlementService, SummaryService,
};
use crate::core::time::{Clock, SystemClock};
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{BuyerId, BuyerProfile, LedgerBook, TransactionId};
use crate::storage::{LedgerStore, LoadReport};

/// Facade that owns the ledger book and serializes every mutation through one lock.
///
/// Each mutation runs against a copy of the book, is saved, and only then replaces the
/// in-memory state, so a failed save leaves both memory and storage untouched. Share it
/// between callers with `Arc<LedgerManager>`.
pub struct LedgerManager {
    book: Mutex<LedgerBook>,
    store: LedgerStore,
    handshake: ApprovalHandshake,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    reward_points: u32,
    load_warnings: Mutex<Vec<String>>,
}

impl LedgerManager {
    /// Loads the ledger from `store`. Unusable stored data yields an empty book plus warnings.
    pub fn open(store: LedgerStore, config: &Config) -> Self {
        let LoadReport { book, warnings, .. } = store.load();
        tracing::info!(
            key = store.key(),
            buyers = book.len(),
            transactions = book.transaction_count(),
            "ledger opened"
        );
        Self {
            book: Mutex::new(book),
            store,
            handshake: config.handshake(),
            notifier: Box::new(LocalNotifier),
            clock: Arc::new(SystemClock),
            reward_points: config.reward_points,
            load_warnings: Mutex::new(warnings),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Warnings raised by the most recent load.
    pub fn load_warnings(&self) -> Vec<String> {
        lock(&self.load_warnings).clone()
    }

    /// Validates a proposed credit, issues its approval code, and hands the code to the notifier.
    pub fn initiate_credit(&self, buyer: &str, seller: &str, amount: f64) -> LedgerResult<Challenge> {
        let pending = PendingCredit::new(buyer, seller, amount)?;
        let challenge = self.handshake.initiate(pending, self.clock.now());
        self.notifier
            .deliver(&challenge.pending().buyer, challenge.code())
            .map_err(|err| match err {
                LedgerError::NotificationFailed(_) => err,
                other => LedgerError::NotificationFailed(other.to_string()),
            })?;
        Ok(challenge)
    }

    /// Commits the credit behind `challenge` if `response` matches its code.
    pub fn record_credit(
        &self,
        challenge: &mut Challenge,
        response: &str,
    ) -> LedgerResult<TransactionId> {
        let now = self.clock.now();
        let approved = self.handshake.verify(challenge, response, now)?;
        self.commit(|book| CreditService::record(book, approved, now))
    }

    /// Closes `challenge` on the buyer's refusal. Nothing is recorded.
    pub fn decline(&self, challenge: &mut Challenge) -> LedgerError {
        self.handshake.decline(challenge)
    }

    /// Runs the whole handshake in one call; `respond` stands in for the buyer.
    pub fn record_credit_with<F>(
        &self,
        buyer: &str,
        seller: &str,
        amount: f64,
        respond: F,
    ) -> LedgerResult<TransactionId>
    where
        F: FnOnce(&Challenge) -> ApprovalResponse,
    {
        let mut challenge = self.initiate_credit(buyer, seller, amount)?;
        let response = respond(&challenge);
        let now = self.clock.now();
        let approved = self.handshake.respond(&mut challenge, response, now)?;
        self.commit(|book| CreditService::record(book, approved, now))
    }

    pub fn settle(&self, buyer: &str, transaction: &str) -> LedgerResult<Settlement> {
        let buyer = BuyerId::parse(buyer)?;
        let transaction = TransactionId::parse(transaction)?;
        let now = self.clock.now();
        let reward_points = self.reward_points;
        self.commit(|book| {
            SettlementService::settle(book, &buyer, &transaction, reward_points, now)
        })
    }

    pub fn profile(&self, buyer: &str) -> LedgerResult<Option<BuyerProfile>> {
        let buyer = BuyerId::parse(buyer)?;
        Ok(lock(&self.book).profile(&buyer).cloned())
    }

    pub fn snapshot(&self) -> LedgerBook {
        lock(&self.book).clone()
    }

    pub fn summaries(&self) -> Vec<BuyerSummary> {
        SummaryService::by_outstanding(&lock(&self.book))
    }

    pub fn totals(&self) -> LedgerTotals {
        SummaryService::totals(&lock(&self.book))
    }

    /// Administrative removal of a buyer and all of their history.
    pub fn remove_buyer(&self, buyer: &str) -> LedgerResult<BuyerProfile> {
        let buyer = BuyerId::parse(buyer)?;
        let removed = self.commit(|book| {
            book.remove(&buyer)
                .ok_or_else(|| LedgerError::NotFound(format!("buyer {buyer}")))
        })?;
        tracing::warn!(buyer = %buyer, "buyer profile removed");
        Ok(removed)
    }

    /// Replaces the in-memory book with whatever the store currently holds.
    pub fn reload(&self) -> Vec<String> {
        let mut guard = lock(&self.book);
        let LoadReport { book, warnings, .. } = self.store.load();
        *guard = book;
        *lock(&self.load_warnings) = warnings.clone();
        warnings
    }

    fn commit<T, F>(&self, mutate: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut LedgerBook) -> LedgerResult<T>,
    {
        let mut guard = lock(&self.book);
        let mut draft = guard.clone();
        let value = mutate(&mut draft)?;
        self.store.save(&draft)?;
        *guard = draft;
        Ok(value)
    }
}

// The book is only replaced after a successful save, so a poisoned guard still holds
// consistent state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::testing::ManualClock;
    use crate::errors::RejectionReason;
    use crate::storage::{KeyValueStore, MemoryStore, DEFAULT_STORAGE_KEY};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn nov_16() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 16, 10, 0, 0).unwrap()
    }

    fn manager_at(now: DateTime<Utc>) -> (LedgerManager, MemoryStore, Arc<ManualClock>) {
        let backend = MemoryStore::new();
        let clock = Arc::new(ManualClock::at(now));
        let manager = LedgerManager::open(
            LedgerStore::with_default_key(Box::new(backend.clone())),
            &Config::default(),
        )
        .with_clock(clock.clone());
        (manager, backend, clock)
    }

    fn approve(challenge: &Challenge) -> ApprovalResponse {
        ApprovalResponse::Code(challenge.code().to_string())
    }

    #[test]
    fn approved_credit_is_persisted() {
        let (manager, backend, _clock) = manager_at(nov_16());
        let mut challenge = manager.initiate_credit("abcde1234f", "Ravi Stores", 500.0).unwrap();
        let code = challenge.code().to_string();

        let id = manager.record_credit(&mut challenge, &code).unwrap();

        let stored = backend.read(DEFAULT_STORAGE_KEY).unwrap().expect("document saved");
        let book: LedgerBook = serde_json::from_str(&stored).unwrap();
        let profile = book.profile(&BuyerId::parse("ABCDE1234F").unwrap()).unwrap();
        assert_eq!(profile.transaction(&id).unwrap().amount, 500.0);
    }

    #[test]
    fn rejected_credit_leaves_no_trace() {
        let (manager, backend, _clock) = manager_at(nov_16());
        let mut challenge = manager.initiate_credit("ABCDE1234F", "Ravi", 500.0).unwrap();
        let wrong = if challenge.code() == "123456" { "654321" } else { "123456" };

        let err = manager.record_credit(&mut challenge, wrong).unwrap_err();

        assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::Mismatch)));
        assert!(manager.snapshot().is_empty());
        assert_eq!(backend.read(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn declined_credit_is_discarded() {
        let (manager, _backend, _clock) = manager_at(nov_16());
        let err = manager
            .record_credit_with("ABCDE1234F", "Ravi", 500.0, |_| ApprovalResponse::Declined)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::Declined)));
        assert!(manager.snapshot().is_empty());
    }

    #[test]
    fn invalid_input_never_reaches_the_notifier() {
        struct CountingNotifier(Arc<AtomicBool>);
        impl Notifier for CountingNotifier {
            fn deliver(&self, _destination: &BuyerId, _code: &str) -> LedgerResult<()> {
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let called = Arc::new(AtomicBool::new(false));
        let (manager, _backend, _clock) = manager_at(nov_16());
        let manager = manager.with_notifier(Box::new(CountingNotifier(called.clone())));

        let err = manager.initiate_credit("ABCDE1234F", "Ravi", -1.0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn notifier_failure_is_surfaced() {
        struct DownGateway;
        impl Notifier for DownGateway {
            fn deliver(&self, _destination: &BuyerId, _code: &str) -> LedgerResult<()> {
                Err(LedgerError::NotificationFailed("gateway timeout".into()))
            }
        }

        let (manager, _backend, _clock) = manager_at(nov_16());
        let manager = manager.with_notifier(Box::new(DownGateway));
        let err = manager.initiate_credit("ABCDE1234F", "Ravi", 10.0).unwrap_err();
        assert!(matches!(err, LedgerError::NotificationFailed(ref msg) if msg.contains("timeout")));
    }

    #[test]
    fn expired_challenge_cannot_commit() {
        let (manager, _backend, clock) = manager_at(nov_16());
        let mut challenge = manager.initiate_credit("ABCDE1234F", "Ravi", 500.0).unwrap();
        let code = challenge.code().to_string();
        clock.advance(Duration::minutes(10));

        let err = manager.record_credit(&mut challenge, &code).unwrap_err();
        assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::Expired)));
        assert!(manager.snapshot().is_empty());
    }

    #[test]
    fn approved_challenge_commits_once() {
        let (manager, backend, _clock) = manager_at(nov_16());
        let mut challenge = manager.initiate_credit("ABCDE1234F", "Ravi", 500.0).unwrap();
        let code = challenge.code().to_string();

        manager.record_credit(&mut challenge, &code).unwrap();
        let saved = backend.read(DEFAULT_STORAGE_KEY).unwrap();
        let err = manager.record_credit(&mut challenge, &code).unwrap_err();

        assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::Consumed)));
        assert_eq!(manager.snapshot().transaction_count(), 1);
        assert_eq!(backend.read(DEFAULT_STORAGE_KEY).unwrap(), saved);
    }

    #[test]
    fn attempt_limit_closes_the_challenge() {
        let (manager, _backend, _clock) = manager_at(nov_16());
        let mut challenge = manager.initiate_credit("ABCDE1234F", "Ravi", 500.0).unwrap();
        let code = challenge.code().to_string();
        let wrong = if code == "123456" { "654321" } else { "123456" };

        for _ in 0..2 {
            let err = manager.record_credit(&mut challenge, wrong).unwrap_err();
            assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::Mismatch)));
        }
        let err = manager.record_credit(&mut challenge, wrong).unwrap_err();
        assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::AttemptsExhausted)));

        let err = manager.record_credit(&mut challenge, &code).unwrap_err();
        assert!(matches!(err, LedgerError::ApprovalRejected(RejectionReason::AttemptsExhausted)));
        assert!(manager.snapshot().is_empty());
    }

    #[test]
    fn settlement_flow_matches_reward_rules() {
        let (manager, _backend, clock) = manager_at(nov_16());
        let id = manager
            .record_credit_with("ABCDE1234F", "Ravi", 500.0, approve)
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap());

        let settlement = manager.settle("abcde1234f", id.as_str()).unwrap();
        assert_eq!(settlement.profile.reward_points, 10);
        assert_eq!(settlement.profile.score, 100);
        assert_eq!(settlement.profile.outstanding(), 0.0);

        let err = manager.settle("ABCDE1234F", id.as_str()).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadySettled(_)));
        let profile = manager.profile("ABCDE1234F").unwrap().unwrap();
        assert_eq!(profile.reward_points, 10);
    }

    #[test]
    fn failed_save_keeps_previous_state() {
        struct FlakyStore {
            inner: MemoryStore,
            fail: Arc<AtomicBool>,
        }
        impl KeyValueStore for FlakyStore {
            fn read(&self, key: &str) -> LedgerResult<Option<String>> {
                self.inner.read(key)
            }
            fn write(&self, key: &str, value: &str) -> LedgerResult<()> {
                if self.fail.load(Ordering::SeqCst) {
                    return Err(LedgerError::PersistenceUnavailable("read-only".into()));
                }
                self.inner.write(key, value)
            }
            fn remove(&self, key: &str) -> LedgerResult<()> {
                self.inner.remove(key)
            }
        }

        let fail = Arc::new(AtomicBool::new(false));
        let store = FlakyStore {
            inner: MemoryStore::new(),
            fail: fail.clone(),
        };
        let manager = LedgerManager::open(LedgerStore::with_default_key(Box::new(store)), &Config::default())
            .with_clock(Arc::new(ManualClock::at(nov_16())));
        let id = manager
            .record_credit_with("ABCDE1234F", "Ravi", 500.0, approve)
            .unwrap();
        fail.store(true, Ordering::SeqCst);

        let err = manager.settle("ABCDE1234F", id.as_str()).unwrap_err();

        assert!(matches!(err, LedgerError::PersistenceUnavailable(_)));
        let profile = manager.profile("ABCDE1234F").unwrap().unwrap();
        assert!(!profile.transaction(&id).unwrap().paid);
        assert_eq!(profile.reward_points, 0);
    }

    #[test]
    fn remove_buyer_requires_existing_profile() {
        let (manager, _backend, _clock) = manager_at(nov_16());
        assert!(matches!(
            manager.remove_buyer("ABCDE1234F"),
            Err(LedgerError::NotFound(_))
        ));
        manager
            .record_credit_with("ABCDE1234F", "Ravi", 500.0, approve)
            .unwrap();
        let removed = manager.remove_buyer("abcde1234f").unwrap();
        assert_eq!(removed.transactions.len(), 1);
        assert!(manager.profile("ABCDE1234F").unwrap().is_none());
    }

    #[test]
    fn reload_picks_up_external_changes() {
        let (manager, backend, _clock) = manager_at(nov_16());
        backend.write(DEFAULT_STORAGE_KEY, "not json").unwrap();
        let warnings = manager.reload();
        assert_eq!(warnings.len(), 1);
        assert_eq!(manager.load_warnings(), warnings);
    }
}
