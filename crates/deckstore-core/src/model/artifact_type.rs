use serde::{Deserialize, Serialize};

/// Kind of control artifact a deck encodes
///
/// The type decides which cards a deck may and must carry; see
/// [`crate::rules::schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Check-in manifest (full baseline or delta)
    Checkin,
    /// Cluster of artifact hashes
    Cluster,
    /// Tag-only control artifact
    Control,
    /// Wiki page revision
    Wiki,
    /// Ticket change
    Ticket,
    /// Attachment add/remove
    Attachment,
    /// Technote/event
    Event,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 7] = [
        ArtifactType::Checkin,
        ArtifactType::Cluster,
        ArtifactType::Control,
        ArtifactType::Wiki,
        ArtifactType::Ticket,
        ArtifactType::Attachment,
        ArtifactType::Event,
    ];

    /// Stable lowercase name, used in the metadata index
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Checkin => "checkin",
            ArtifactType::Cluster => "cluster",
            ArtifactType::Control => "control",
            ArtifactType::Wiki => "wiki",
            ArtifactType::Ticket => "ticket",
            ArtifactType::Attachment => "attachment",
            ArtifactType::Event => "event",
        }
    }

    /// Inverse of [`ArtifactType::as_str`]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// Infer the type of a parsed deck from the set of card letters present.
    ///
    /// Distinguishing cards are checked most-specific first, so an event
    /// (which also carries C) is not mistaken for a check-in.
    pub fn infer(present: &[char]) -> Option<Self> {
        let has = |c: char| present.contains(&c);
        if has('M') {
            Some(ArtifactType::Cluster)
        } else if has('E') {
            Some(ArtifactType::Event)
        } else if has('L') {
            Some(ArtifactType::Wiki)
        } else if has('K') || has('J') {
            Some(ArtifactType::Ticket)
        } else if has('A') {
            Some(ArtifactType::Attachment)
        } else if ['B', 'C', 'F', 'P', 'Q'].iter().any(|c| has(*c)) {
            Some(ArtifactType::Checkin)
        } else if has('T') {
            Some(ArtifactType::Control)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
