//! JSON document form of a deck
//!
//! Adapters that speak JSON (scripting bindings, tooling) exchange decks as
//!
//! ```json
//! {"type": "control", "uuid": "…", "cards": [{"card": "U", "value": "alice"}]}
//! ```
//!
//! Incoming documents are rebuilt card by card through the builder, so they
//! get exactly the validation a native caller would. `uuid` is informational
//! on the way in: identity is only ever assigned by persist or load.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deck::Deck;
use crate::errors::{DeckError, ExError, Result};
use crate::model::{ArtifactType, Card};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckDocument {
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub cards: Vec<Card>,
}

impl DeckDocument {
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            artifact_type: deck.artifact_type(),
            uuid: (!deck.uuid().is_empty()).then(|| deck.uuid().to_string()),
            cards: deck.cards(),
        }
    }

    /// Build a deck from the document's cards
    ///
    /// Z cards are skipped; the self-hash is derived, never supplied.
    pub fn into_deck(self) -> Result<Deck> {
        let mut deck = Deck::new(self.artifact_type);
        for card in self.cards {
            if matches!(card, Card::Z(_)) {
                continue;
            }
            deck.add_card(card).map_err(|e| e.with_op("from_document"))?;
        }
        Ok(deck)
    }
}

pub fn to_value(deck: &Deck) -> Result<Value> {
    serde_json::to_value(DeckDocument::from_deck(deck)).map_err(serialization)
}

/// # Errors
///
/// - `Serialization` if `value` is not a deck document
/// - `Syntax`/`UnsupportedCard` if a card is rejected by the builder
pub fn from_value(value: Value) -> Result<Deck> {
    let document: DeckDocument = serde_json::from_value(value).map_err(serialization)?;
    document.into_deck()
}

pub fn to_json_string(deck: &Deck) -> Result<String> {
    serde_json::to_string(&DeckDocument::from_deck(deck)).map_err(serialization)
}

pub fn from_json_str(text: &str) -> Result<Deck> {
    let document: DeckDocument = serde_json::from_str(text).map_err(serialization)?;
    document.into_deck()
}

fn serialization(err: serde_json::Error) -> ExError {
    ExError::from(DeckError::from(err)).with_op("interop")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::model::{TagCard, TagKind, TagTarget, Timestamp};
    use serde_json::json;

    #[test]
    fn test_document_round_trip() {
        let mut deck = Deck::new(ArtifactType::Control);
        deck.set_date(Timestamp::from_unix_millis(86_400_000)).unwrap();
        deck.add_tag(
            TagCard::new(TagKind::Add, "relnotes", TagTarget::Artifact("c".repeat(64)))
                .with_value("v1"),
        )
        .unwrap();
        deck.set_user("alice").unwrap();

        let value = to_value(&deck).unwrap();
        assert_eq!(value["type"], "control");
        assert_eq!(value["cards"][0], json!({"card": "D", "value": "1970-01-02T00:00:00.000"}));

        let back = from_value(value).unwrap();
        assert_eq!(back.cards(), deck.cards());
    }

    #[test]
    fn test_rejected_card_surfaces_builder_error() {
        let value = json!({
            "type": "cluster",
            "cards": [{"card": "U", "value": "alice"}]
        });
        let err = from_value(value).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::UnsupportedCard);
        assert_eq!(err.op(), Some("from_document"));
    }

    #[test]
    fn test_malformed_document_is_serialization_error() {
        let err = from_json_str(r#"{"type": "nonsense", "cards": []}"#).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Serialization);
    }

    #[test]
    fn test_z_card_ignored() {
        let text = format!(
            r#"{{"type":"cluster","cards":[{{"card":"M","value":"{}"}},{{"card":"Z","value":"{}"}}]}}"#,
            "a".repeat(64),
            "b".repeat(64)
        );
        let deck = from_json_str(&text).unwrap();
        assert_eq!(deck.cluster_members().len(), 1);
        assert!(deck.self_hash().is_none());
    }
}
