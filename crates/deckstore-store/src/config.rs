//! Store configuration
//!
//! ```toml
//! path = "repo.deckstore"
//! journal_mode = "wal"
//! foreign_keys = true
//! busy_timeout_ms = 5000
//! log_profile = "production"
//!
//! [attach]
//! checkout = "checkout.db"
//! config = "settings.db"
//! ```
//!
//! Every key is optional. Without `path` the repository lives in memory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use deckstore_core::logging_facility::Profile;
use serde::Deserialize;

use crate::errors::{config_error, io_error, Result};
use crate::role::DbRole;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Repository database file; `None` keeps it in memory
    pub path: Option<PathBuf>,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
    /// Role name to database file, attached when the store opens
    pub attach: BTreeMap<String, PathBuf>,
    pub log_profile: Profile,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            journal_mode: JournalMode::default(),
            foreign_keys: true,
            busy_timeout_ms: 5_000,
            attach: BTreeMap::new(),
            log_profile: Profile::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration for an on-disk repository with default settings
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(text).map_err(|e| config_error(format!("failed to parse: {e}")))?;
        config.attached_roles()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| io_error("read_config", e))?;
        Self::from_toml_str(&text).map_err(|e| e.with_artifact(path.display().to_string()))
    }

    /// The `attach` table resolved to roles
    ///
    /// # Errors
    ///
    /// `Serialization` for an unknown role name or an attempt to attach the
    /// repository role.
    pub fn attached_roles(&self) -> Result<Vec<(DbRole, PathBuf)>> {
        self.attach
            .iter()
            .map(|(name, path)| match DbRole::from_name(name) {
                Some(role) if DbRole::ATTACHABLE.contains(&role) => Ok((role, path.clone())),
                _ => Err(config_error(format!("cannot attach role {:?}", name))),
            })
            .collect()
    }
}
