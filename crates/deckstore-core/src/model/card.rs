use serde::{Deserialize, Serialize};

use super::file_card::FileCard;
use super::tag_card::TagCard;
use super::timestamp::Timestamp;

/// A card: one typed field of a deck, keyed by a single letter
///
/// Singleton letters (A B C D E K L N U W Z) appear at most once per deck;
/// repeatable letters (F J M P Q T) may appear many times. P carries its
/// whole parent list in one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "card", content = "value")]
pub enum Card {
    #[serde(rename = "A")]
    A(AttachmentCard),
    /// Baseline manifest hash
    #[serde(rename = "B")]
    B(String),
    /// Comment
    #[serde(rename = "C")]
    C(String),
    /// Artifact time
    #[serde(rename = "D")]
    D(Timestamp),
    #[serde(rename = "E")]
    E(EventCard),
    #[serde(rename = "F")]
    F(FileCard),
    #[serde(rename = "J")]
    J(TicketField),
    /// Ticket id
    #[serde(rename = "K")]
    K(String),
    /// Wiki page title
    #[serde(rename = "L")]
    L(String),
    /// Cluster member
    #[serde(rename = "M")]
    M(String),
    /// Mimetype name
    #[serde(rename = "N")]
    N(String),
    /// Parent hashes, primary parent first
    #[serde(rename = "P")]
    P(Vec<String>),
    #[serde(rename = "Q")]
    Q(CherryPick),
    #[serde(rename = "T")]
    T(TagCard),
    /// User
    #[serde(rename = "U")]
    U(String),
    /// Raw content
    #[serde(rename = "W")]
    W(#[serde(with = "base64_bytes")] Vec<u8>),
    /// Self-hash of every preceding byte
    #[serde(rename = "Z")]
    Z(String),
}

impl Card {
    /// The card's letter
    pub fn letter(&self) -> char {
        match self {
            Card::A(_) => 'A',
            Card::B(_) => 'B',
            Card::C(_) => 'C',
            Card::D(_) => 'D',
            Card::E(_) => 'E',
            Card::F(_) => 'F',
            Card::J(_) => 'J',
            Card::K(_) => 'K',
            Card::L(_) => 'L',
            Card::M(_) => 'M',
            Card::N(_) => 'N',
            Card::P(_) => 'P',
            Card::Q(_) => 'Q',
            Card::T(_) => 'T',
            Card::U(_) => 'U',
            Card::W(_) => 'W',
            Card::Z(_) => 'Z',
        }
    }
}

/// A card: attachment `filename` added to (or, without `source`, removed
/// from) `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentCard {
    pub filename: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// E card: technote time and id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCard {
    pub time: Timestamp,
    pub id: String,
}

/// J card: one ticket field change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketField {
    /// Append to the existing value instead of replacing it
    #[serde(default)]
    pub append: bool,
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CherryPickKind {
    /// `+`
    CherryPick,
    /// `*` (`-` is also accepted when parsing)
    Backout,
}

impl CherryPickKind {
    pub fn prefix(&self) -> char {
        match self {
            CherryPickKind::CherryPick => '+',
            CherryPickKind::Backout => '*',
        }
    }

    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '+' => Some(CherryPickKind::CherryPick),
            '*' | '-' => Some(CherryPickKind::Backout),
            _ => None,
        }
    }
}

/// Q card: a cherry-pick or backout merged into a check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CherryPick {
    pub kind: CherryPickKind,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}
