use super::escape::unescape;
use crate::deck::Deck;
use crate::errors::{DeckError, ExError, Result};
use crate::model::hash::{content_hash, is_valid_hash};
use crate::model::{
    ArtifactType, AttachmentCard, Card, CherryPick, CherryPickKind, EventCard, FileCard,
    Permission, TagCard, TagKind, TagTarget, TicketField, Timestamp,
};
use crate::rules;

/// Parse card text into a deck
///
/// Parsing is strict: cards must appear in letter order, singleton cards at
/// most once, repeatable cards (F, J, M, Q, T) in their sorted order, and a Z card (when present) must be
/// last and match the hash of everything before it. The artifact type is
/// inferred from the cards present and the result must satisfy the type's
/// schema.
///
/// # Errors
///
/// - `Corrupt` for any encoding or schema violation
/// - `OutOfMemory` if a W payload cannot be allocated
pub fn parse(content: &[u8]) -> Result<Deck> {
    let mut reader = LineReader {
        content,
        pos: 0,
        line: 0,
        line_start: 0,
    };
    let mut cards: Vec<(usize, Card)> = Vec::new();
    let mut self_hash: Option<String> = None;
    let mut last_letter = '\0';

    while let Some(raw) = reader.next_line()? {
        let line_no = reader.line;
        if self_hash.is_some() {
            return Err(malformed(line_no, "content after Z card"));
        }
        let text = std::str::from_utf8(raw).map_err(|_| malformed(line_no, "not UTF-8"))?;
        let (letter, rest) = split_letter(text).ok_or_else(|| malformed(line_no, "bad card"))?;

        if letter < last_letter {
            return Err(malformed(line_no, format!("card {} out of order", letter)));
        }
        if letter == last_letter && is_singleton(letter) {
            return Err(malformed(line_no, format!("duplicate {} card", letter)));
        }
        last_letter = letter;

        if letter == 'Z' {
            let recorded = single_field(rest, line_no)?;
            if !is_valid_hash(&recorded) {
                return Err(malformed(line_no, "Z card is not a hash"));
            }
            let covered = &content[..reader.line_start];
            let computed = content_hash(covered);
            if computed != recorded {
                return Err(DeckError::SelfHashMismatch { recorded, computed }.into());
            }
            self_hash = Some(recorded);
            continue;
        }

        let card = if letter == 'W' {
            let size: usize = rest
                .parse()
                .map_err(|_| malformed(line_no, "W size is not a number"))?;
            Card::W(reader.take_payload(size)?)
        } else {
            parse_card(letter, rest, line_no)?
        };

        if let Some((_, prev)) = cards.last() {
            if prev.letter() == letter && !follows_canonically(prev, &card) {
                return Err(malformed(line_no, format!("{} card out of order", letter)));
            }
        }
        cards.push((line_no, card));
    }

    let present: Vec<char> = cards.iter().map(|(_, c)| c.letter()).collect();
    let artifact_type = ArtifactType::infer(&present)
        .ok_or_else(|| malformed(reader.line, "cannot determine artifact type"))?;

    let mut deck = Deck::new(artifact_type);
    for (line_no, card) in cards {
        deck.push_card(card)
            .map_err(|e| malformed(line_no, e.to_string()))?;
    }
    deck.check_tombstones()
        .map_err(|e| malformed(reader.line, e.to_string()))?;
    rules::validate(&deck).map_err(|e| malformed(reader.line, e.to_string()))?;
    deck.set_self_hash(self_hash);
    Ok(deck)
}

struct LineReader<'a> {
    content: &'a [u8],
    pos: usize,
    line: usize,
    /// Byte offset where the most recent line began
    line_start: usize,
}

impl<'a> LineReader<'a> {
    fn next_line(&mut self) -> Result<Option<&'a [u8]>> {
        if self.pos >= self.content.len() {
            return Ok(None);
        }
        let rest = &self.content[self.pos..];
        let end = rest
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| malformed(self.line + 1, "missing final newline"))?;
        self.line_start = self.pos;
        self.pos += end + 1;
        self.line += 1;
        Ok(Some(&rest[..end]))
    }

    fn take_payload(&mut self, size: usize) -> Result<Vec<u8>> {
        let end = self
            .pos
            .checked_add(size)
            .filter(|end| *end < self.content.len())
            .ok_or_else(|| malformed(self.line, "W content truncated"))?;
        if self.content[end] != b'\n' {
            return Err(malformed(self.line, "W content not followed by newline"));
        }
        let mut payload = Vec::new();
        payload.try_reserve_exact(size).map_err(ExError::from)?;
        payload.extend_from_slice(&self.content[self.pos..end]);
        self.line += payload.iter().filter(|b| **b == b'\n').count() + 1;
        self.pos = end + 1;
        Ok(payload)
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> ExError {
    DeckError::MalformedCard {
        line,
        reason: reason.into(),
    }
    .into()
}

/// Whether `next` may directly follow `prev` of the same letter. Repeatable
/// cards are stored sorted, so anything else would not re-render to the
/// hashed text.
fn follows_canonically(prev: &Card, next: &Card) -> bool {
    match (prev, next) {
        (Card::F(a), Card::F(b)) => a.name < b.name,
        (Card::J(a), Card::J(b)) => a.key <= b.key,
        (Card::M(a), Card::M(b)) => a < b,
        (Card::Q(a), Card::Q(b)) => a.target < b.target,
        (Card::T(a), Card::T(b)) => a.sort_key() < b.sort_key(),
        _ => true,
    }
}

fn is_singleton(letter: char) -> bool {
    !matches!(letter, 'F' | 'J' | 'M' | 'Q' | 'T')
}

fn split_letter(text: &str) -> Option<(char, &str)> {
    let mut chars = text.chars();
    let letter = chars.next().filter(|c| c.is_ascii_uppercase())?;
    match chars.next() {
        Some(' ') => Some((letter, &text[2..])),
        _ => None,
    }
}

fn fields(rest: &str, line: usize) -> Result<Vec<String>> {
    rest.split(' ')
        .map(|f| unescape(f).ok_or_else(|| malformed(line, "bad escape sequence")))
        .collect()
}

fn single_field(rest: &str, line: usize) -> Result<String> {
    let mut f = fields(rest, line)?;
    if f.len() != 1 {
        return Err(malformed(line, "expected exactly one field"));
    }
    Ok(f.remove(0))
}

fn hash_field(value: &str, line: usize) -> Result<String> {
    if is_valid_hash(value) {
        Ok(value.to_string())
    } else {
        Err(malformed(line, format!("invalid hash {}", value)))
    }
}

fn time_field(value: &str, line: usize) -> Result<Timestamp> {
    Timestamp::parse_card_text(value).ok_or_else(|| malformed(line, "invalid timestamp"))
}

fn parse_card(letter: char, rest: &str, line: usize) -> Result<Card> {
    let f = fields(rest, line)?;
    let arity = |min: usize, max: usize| -> Result<()> {
        if f.len() < min || f.len() > max {
            Err(malformed(line, format!("wrong field count for {} card", letter)))
        } else {
            Ok(())
        }
    };

    let card = match letter {
        'A' => {
            arity(2, 3)?;
            Card::A(AttachmentCard {
                filename: f[0].clone(),
                target: f[1].clone(),
                source: f.get(2).map(|s| hash_field(s, line)).transpose()?,
            })
        }
        'B' => {
            arity(1, 1)?;
            Card::B(hash_field(&f[0], line)?)
        }
        'C' => {
            arity(1, 1)?;
            Card::C(f[0].clone())
        }
        'D' => {
            arity(1, 1)?;
            Card::D(time_field(&f[0], line)?)
        }
        'E' => {
            arity(2, 2)?;
            Card::E(EventCard {
                time: time_field(&f[0], line)?,
                id: hash_field(&f[1], line)?,
            })
        }
        'F' => {
            arity(1, 4)?;
            let mut file = FileCard::tombstone(f[0].clone());
            if let Some(uuid) = f.get(1) {
                file.uuid = hash_field(uuid, line)?;
            }
            if let Some(token) = f.get(2) {
                file.permission = Permission::from_token(token)
                    .ok_or_else(|| malformed(line, format!("bad permission {}", token)))?;
            }
            file.prior_name = f.get(3).cloned();
            Card::F(file)
        }
        'J' => {
            arity(1, 2)?;
            let (append, key) = match f[0].strip_prefix('+') {
                Some(key) => (true, key.to_string()),
                None => (false, f[0].clone()),
            };
            Card::J(TicketField {
                append,
                key,
                value: f.get(1).cloned().unwrap_or_default(),
            })
        }
        'K' => {
            arity(1, 1)?;
            Card::K(hash_field(&f[0], line)?)
        }
        'L' => {
            arity(1, 1)?;
            Card::L(f[0].clone())
        }
        'M' => {
            arity(1, 1)?;
            Card::M(hash_field(&f[0], line)?)
        }
        'N' => {
            arity(1, 1)?;
            Card::N(f[0].clone())
        }
        'P' => {
            arity(1, usize::MAX)?;
            let parents = f
                .iter()
                .map(|p| hash_field(p, line))
                .collect::<Result<Vec<_>>>()?;
            Card::P(parents)
        }
        'Q' => {
            arity(1, 2)?;
            let mut chars = f[0].chars();
            let kind = chars
                .next()
                .and_then(CherryPickKind::from_prefix)
                .ok_or_else(|| malformed(line, "bad Q card prefix"))?;
            Card::Q(CherryPick {
                kind,
                target: hash_field(chars.as_str(), line)?,
                baseline: f.get(1).map(|b| hash_field(b, line)).transpose()?,
            })
        }
        'T' => {
            arity(2, 3)?;
            let mut chars = f[0].chars();
            let kind = chars
                .next()
                .and_then(TagKind::from_prefix)
                .ok_or_else(|| malformed(line, "bad T card prefix"))?;
            let target = if f[1] == "*" {
                TagTarget::SelfArtifact
            } else {
                TagTarget::Artifact(hash_field(&f[1], line)?)
            };
            Card::T(TagCard {
                kind,
                name: chars.as_str().to_string(),
                target,
                value: f.get(2).cloned(),
            })
        }
        'U' => {
            arity(1, 1)?;
            Card::U(f[0].clone())
        }
        other => return Err(malformed(line, format!("unknown card {}", other))),
    };
    Ok(card)
}
