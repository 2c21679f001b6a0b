use serde::{Deserialize, Serialize};

/// File permission recorded on an F card
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Regular,
    Executable,
    Symlink,
}

impl Permission {
    /// Card token. Regular files have no token of their own; `w` is written
    /// only when a prior name must follow.
    pub fn token(&self) -> &'static str {
        match self {
            Permission::Regular => "w",
            Permission::Executable => "x",
            Permission::Symlink => "l",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "w" => Some(Permission::Regular),
            "x" => Some(Permission::Executable),
            "l" => Some(Permission::Symlink),
            _ => None,
        }
    }
}

/// One entry of a manifest's file list
///
/// `name` is the key within a manifest. An empty `uuid` is a tombstone: the
/// file is deleted relative to the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCard {
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_name: Option<String>,
}

impl FileCard {
    /// A present file with regular permission
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            permission: Permission::Regular,
            prior_name: None,
        }
    }

    /// A deletion marker for `name`
    pub fn tombstone(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: String::new(),
            permission: Permission::Regular,
            prior_name: None,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_prior_name(mut self, prior_name: impl Into<String>) -> Self {
        self.prior_name = Some(prior_name.into());
        self
    }

    pub fn is_tombstone(&self) -> bool {
        self.uuid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_tokens() {
        for p in [
            Permission::Regular,
            Permission::Executable,
            Permission::Symlink,
        ] {
            assert_eq!(Permission::from_token(p.token()), Some(p));
        }
        assert_eq!(Permission::from_token("z"), None);
    }

    #[test]
    fn test_tombstone() {
        assert!(FileCard::tombstone("gone.txt").is_tombstone());
        assert!(!FileCard::new("here.txt", "ab".repeat(32)).is_tombstone());
    }
}
