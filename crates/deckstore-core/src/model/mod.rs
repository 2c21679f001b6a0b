pub mod artifact_type;
pub mod card;
pub mod file_card;
pub mod hash;
pub mod tag_card;
pub mod timestamp;

pub use artifact_type::ArtifactType;
pub use card::{AttachmentCard, Card, CherryPick, CherryPickKind, EventCard, TicketField};
pub use file_card::{FileCard, Permission};
pub use tag_card::{TagCard, TagKind, TagTarget};
pub use timestamp::Timestamp;

use serde::Serialize;

/// Opaque store-assigned identifier of persisted content. `Rid(0)` means
/// "not persisted".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rid(pub i64);

impl Rid {
    pub const NONE: Rid = Rid(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rid:{}", self.0)
    }
}
