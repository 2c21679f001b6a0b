//! Artifact type schema
//!
//! Pure tables of which cards each artifact type may carry and which it must
//! carry. Z (the self-hash) is legal everywhere and never required: it is
//! produced by serialization, not by the builder.

use crate::deck::Deck;
use crate::errors::DeckError;
use crate::model::ArtifactType;

struct CardRule {
    legal: &'static [char],
    required: &'static [char],
}

fn rule(artifact_type: ArtifactType) -> CardRule {
    match artifact_type {
        ArtifactType::Checkin => CardRule {
            legal: &['B', 'C', 'D', 'F', 'N', 'P', 'Q', 'T', 'U', 'Z'],
            required: &['C', 'D', 'U'],
        },
        ArtifactType::Cluster => CardRule {
            legal: &['M', 'Z'],
            required: &['M'],
        },
        ArtifactType::Control => CardRule {
            legal: &['D', 'T', 'U', 'Z'],
            required: &['D', 'T', 'U'],
        },
        ArtifactType::Wiki => CardRule {
            legal: &['C', 'D', 'L', 'N', 'P', 'U', 'W', 'Z'],
            required: &['D', 'L', 'U', 'W'],
        },
        ArtifactType::Ticket => CardRule {
            legal: &['D', 'J', 'K', 'U', 'Z'],
            required: &['D', 'J', 'K', 'U'],
        },
        ArtifactType::Attachment => CardRule {
            legal: &['A', 'C', 'D', 'N', 'U', 'Z'],
            required: &['A', 'D'],
        },
        ArtifactType::Event => CardRule {
            legal: &['C', 'D', 'E', 'N', 'P', 'T', 'U', 'W', 'Z'],
            required: &['D', 'E', 'W'],
        },
    }
}

/// Whether `letter` may appear in an artifact of `artifact_type`
pub fn is_legal(artifact_type: ArtifactType, letter: char) -> bool {
    rule(artifact_type).legal.contains(&letter)
}

/// Cards an artifact of `artifact_type` must carry, in letter order
pub fn required_cards(artifact_type: ArtifactType) -> &'static [char] {
    rule(artifact_type).required
}

/// Required letters absent from `deck`, in letter order
pub fn missing_cards(deck: &Deck) -> Vec<char> {
    required_cards(deck.artifact_type())
        .iter()
        .copied()
        .filter(|c| !deck.has_card(*c))
        .collect()
}

/// Whether `deck` carries every card its type requires
pub fn has_all_required(deck: &Deck) -> bool {
    missing_cards(deck).is_empty()
}

/// The persistence gate: fails naming every missing letter
///
/// # Errors
///
/// Returns `DeckError::MissingCards` if any required card is absent.
pub fn validate(deck: &Deck) -> Result<(), DeckError> {
    let missing = missing_cards(deck);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DeckError::MissingCards {
            artifact_type: deck.artifact_type(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_is_subset_of_legal() {
        for t in ArtifactType::ALL {
            for c in required_cards(t) {
                assert!(is_legal(t, *c), "{} requires illegal card {}", t, c);
            }
        }
    }

    #[test]
    fn test_z_legal_everywhere_never_required() {
        for t in ArtifactType::ALL {
            assert!(is_legal(t, 'Z'));
            assert!(!required_cards(t).contains(&'Z'));
        }
    }

    #[test]
    fn test_checkin_table() {
        assert_eq!(required_cards(ArtifactType::Checkin), &['C', 'D', 'U']);
        assert!(is_legal(ArtifactType::Checkin, 'F'));
        assert!(is_legal(ArtifactType::Checkin, 'B'));
        assert!(!is_legal(ArtifactType::Checkin, 'W'));
        assert!(!is_legal(ArtifactType::Checkin, 'M'));
    }

    #[test]
    fn test_control_is_tag_only() {
        assert!(is_legal(ArtifactType::Control, 'T'));
        assert!(!is_legal(ArtifactType::Control, 'F'));
        assert!(!is_legal(ArtifactType::Control, 'C'));
    }

    #[test]
    fn test_unknown_letters_illegal() {
        for t in ArtifactType::ALL {
            assert!(!is_legal(t, 'X'));
            assert!(!is_legal(t, 'a'));
        }
    }
}
