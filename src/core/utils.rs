use dirs::home_dir;
use std::{env, fs, path::Path, path::PathBuf};

use crate::errors::LedgerResult;

const DEFAULT_DIR_NAME: &str = ".credit_core";
const STORE_DIR: &str = "store";
const CONFIG_FILE: &str = "config.json";

/// Returns the application-specific data directory, defaulting to `~/.credit_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("CREDIT_CORE_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Directory holding the key-value documents of the file store.
pub fn store_dir_in(base: &Path) -> PathBuf {
    base.join(STORE_DIR)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    base.join(CONFIG_FILE)
}

pub fn ensure_dir(path: &Path) -> LedgerResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
