#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use credit_core::{
    approval::{ApprovalResponse, Challenge},
    config::Config,
    core::Clock,
    storage::{JsonFileStore, LedgerStore},
    LedgerManager,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Clock pinned to an instant that tests move explicitly.
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().expect("clock lock") = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().expect("clock lock") += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// Creates an isolated store directory that outlives the calling test.
pub fn temp_store_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("store");
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn open_manager(dir: &PathBuf, clock: Arc<TestClock>) -> LedgerManager {
    let store = JsonFileStore::new(dir.clone()).expect("create json store");
    LedgerManager::open(LedgerStore::with_default_key(Box::new(store)), &Config::default())
        .with_clock(clock)
}

/// Buyer stand-in that echoes the issued code back.
pub fn approve(challenge: &Challenge) -> ApprovalResponse {
    ApprovalResponse::Code(challenge.code().to_string())
}
