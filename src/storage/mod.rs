pub mod json_backend;
pub mod memory;

use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{book_warnings, LedgerBook};

pub use json_backend::JsonFileStore;
pub use memory::MemoryStore;

pub const DEFAULT_STORAGE_KEY: &str = "credit_ledger";

/// Abstraction over key-value backends that hold whole documents as strings.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> LedgerResult<Option<String>>;
    fn write(&self, key: &str, value: &str) -> LedgerResult<()>;
    fn remove(&self, key: &str) -> LedgerResult<()>;
}

/// Result of reading the ledger document, including anything that looked wrong.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub book: LedgerBook,
    pub warnings: Vec<String>,
    /// Set when the stored document could not be used and an empty book was substituted.
    pub degraded: bool,
}

/// Reads and writes the whole ledger as one JSON document under a fixed key.
pub struct LedgerStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl LedgerStore {
    pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn with_default_key(backend: Box<dyn KeyValueStore>) -> Self {
        Self::new(backend, DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the ledger, falling back to an empty book when the document is missing,
    /// unreadable, or corrupt. Fallbacks are reported rather than hidden.
    pub fn load(&self) -> LoadReport {
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadReport::default(),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "ledger unreadable, starting empty");
                return degraded(format!("ledger document could not be read: {err}"));
            }
        };
        match serde_json::from_str::<LedgerBook>(&raw) {
            Ok(book) => {
                let warnings = book_warnings(&book);
                for warning in &warnings {
                    tracing::warn!(key = %self.key, "{warning}");
                }
                LoadReport {
                    book,
                    warnings,
                    degraded: false,
                }
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "ledger corrupt, starting empty");
                degraded(format!("ledger document is corrupt: {err}"))
            }
        }
    }

    /// Writes the whole book. Any backend failure is surfaced as `PersistenceUnavailable`.
    pub fn save(&self, book: &LedgerBook) -> LedgerResult<()> {
        let json = encode(book)?;
        self.backend.write(&self.key, &json).map_err(|err| match err {
            LedgerError::PersistenceUnavailable(_) => err,
            other => LedgerError::PersistenceUnavailable(other.to_string()),
        })?;
        tracing::debug!(key = %self.key, buyers = book.len(), "ledger saved");
        Ok(())
    }

    pub fn clear(&self) -> LedgerResult<()> {
        self.backend.remove(&self.key)
    }
}

pub fn encode(book: &LedgerBook) -> LedgerResult<String> {
    Ok(serde_json::to_string_pretty(book)?)
}

fn degraded(warning: String) -> LoadReport {
    LoadReport {
        book: LedgerBook::new(),
        warnings: vec![warning],
        degraded: true,
    }
}
