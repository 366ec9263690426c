use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    approval::{ApprovalHandshake, DEFAULT_MAX_ATTEMPTS, DEFAULT_TTL_SECS},
    core::{
        services::DEFAULT_REWARD_POINTS,
        utils::{app_data_dir, config_file_in, ensure_dir},
    },
    errors::LedgerResult,
    storage::{json_backend::DEFAULT_RETENTION, DEFAULT_STORAGE_KEY},
};

/// Tunable ledger policy and storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_key: String,
    /// Points granted when a credit is repaid in the financial year it was taken.
    pub reward_points: u32,
    pub approval_ttl_secs: i64,
    pub approval_max_attempts: u32,
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.into(),
            reward_points: DEFAULT_REWARD_POINTS,
            approval_ttl_secs: DEFAULT_TTL_SECS,
            approval_max_attempts: DEFAULT_MAX_ATTEMPTS,
            backup_retention: DEFAULT_RETENTION,
        }
    }
}

impl Config {
    pub fn handshake(&self) -> ApprovalHandshake {
        ApprovalHandshake::new(
            Duration::seconds(self.approval_ttl_secs.max(1)),
            self.approval_max_attempts,
        )
    }
}

/// Loads and stores `config.json` in the application data directory.
pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> LedgerResult<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> LedgerResult<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: config_file_in(&base),
            base,
        })
    }

    pub fn load(&self) -> LedgerResult<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> LedgerResult<()> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
