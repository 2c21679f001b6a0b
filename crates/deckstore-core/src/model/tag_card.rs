use serde::{Deserialize, Serialize};

/// How a tag applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// `+`: applies to the target only
    Add,
    /// `*`: applies to the target and propagates to descendants
    Propagating,
    /// `-`: cancels an earlier tag
    Cancel,
}

impl TagKind {
    pub fn prefix(&self) -> char {
        match self {
            TagKind::Add => '+',
            TagKind::Propagating => '*',
            TagKind::Cancel => '-',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '+' => Some(TagKind::Add),
            '*' => Some(TagKind::Propagating),
            '-' => Some(TagKind::Cancel),
            _ => None,
        }
    }
}

/// What a tag is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagTarget {
    /// `*`: the artifact carrying the card (check-in and event decks)
    SelfArtifact,
    /// Another artifact, by hash (control decks)
    Artifact(String),
}

impl TagTarget {
    pub fn as_card_text(&self) -> &str {
        match self {
            TagTarget::SelfArtifact => "*",
            TagTarget::Artifact(uuid) => uuid,
        }
    }
}

/// One T card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCard {
    pub kind: TagKind,
    pub name: String,
    pub target: TagTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TagCard {
    pub fn new(kind: TagKind, name: impl Into<String>, target: TagTarget) -> Self {
        Self {
            kind,
            name: name.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Name of the branch/label a `sym-` tag defines, if this is one
    pub fn symbolic_name(&self) -> Option<&str> {
        self.name.strip_prefix("sym-")
    }

    /// Canonical ordering key: name, then target
    pub(crate) fn sort_key(&self) -> (&str, &str) {
        (&self.name, self.target.as_card_text())
    }
}
