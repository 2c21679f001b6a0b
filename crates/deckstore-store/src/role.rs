//! Database roles
//!
//! One connection serves up to three databases: the repository itself
//! (`main`), and optionally a checkout database and a configuration
//! database attached under fixed schema names.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DbRole {
    Repository,
    Checkout,
    Config,
}

impl DbRole {
    pub const ATTACHABLE: [DbRole; 2] = [DbRole::Checkout, DbRole::Config];

    /// Schema name used to qualify tables of this role
    pub fn schema(&self) -> &'static str {
        match self {
            DbRole::Repository => "main",
            DbRole::Checkout => "checkout",
            DbRole::Config => "config",
        }
    }

    /// Role named in configuration files
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "repository" => Some(DbRole::Repository),
            "checkout" => Some(DbRole::Checkout),
            "config" => Some(DbRole::Config),
            _ => None,
        }
    }
}

impl fmt::Display for DbRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbRole::Repository => f.write_str("repository"),
            other => f.write_str(other.schema()),
        }
    }
}
