use std::io::Write;

use super::escape::escape;
use crate::deck::Deck;
use crate::model::hash::content_hash;
use crate::model::{Card, Permission};

/// Serialize every card of `deck` except Z
pub fn render_body(deck: &Deck) -> Vec<u8> {
    let mut out = Vec::new();
    for card in deck.cards() {
        render_card(&card, &mut out);
    }
    out
}

/// Serialize `deck` and append the Z card
pub fn render_finalized(deck: &Deck) -> Vec<u8> {
    let mut out = render_body(deck);
    let z = content_hash(&out);
    out.extend_from_slice(b"Z ");
    out.extend_from_slice(z.as_bytes());
    out.push(b'\n');
    out
}

/// Append the text form of one card to `out`
pub fn render_card(card: &Card, out: &mut Vec<u8>) {
    // Writes into a Vec<u8> cannot fail.
    let _ = write_card(card, out);
}

fn write_card(card: &Card, out: &mut Vec<u8>) -> std::io::Result<()> {
    match card {
        Card::A(a) => {
            write!(out, "A {} {}", escape(&a.filename), escape(&a.target))?;
            if let Some(source) = &a.source {
                write!(out, " {}", source)?;
            }
        }
        Card::B(uuid) => write!(out, "B {}", uuid)?,
        Card::C(comment) => write!(out, "C {}", escape(comment))?,
        Card::D(ts) => write!(out, "D {}", ts.to_card_text())?,
        Card::E(e) => write!(out, "E {} {}", e.time.to_card_text(), e.id)?,
        Card::F(f) => {
            write!(out, "F {}", escape(&f.name))?;
            if !f.is_tombstone() {
                write!(out, " {}", f.uuid)?;
                if f.permission != Permission::Regular || f.prior_name.is_some() {
                    write!(out, " {}", f.permission.token())?;
                }
                if let Some(prior) = &f.prior_name {
                    write!(out, " {}", escape(prior))?;
                }
            }
        }
        Card::J(j) => {
            let append = if j.append { "+" } else { "" };
            write!(out, "J {}{}", append, escape(&j.key))?;
            if !j.value.is_empty() {
                write!(out, " {}", escape(&j.value))?;
            }
        }
        Card::K(id) => write!(out, "K {}", id)?,
        Card::L(title) => write!(out, "L {}", escape(title))?,
        Card::M(uuid) => write!(out, "M {}", uuid)?,
        Card::N(name) => write!(out, "N {}", escape(name))?,
        Card::P(parents) => write!(out, "P {}", parents.join(" "))?,
        Card::Q(q) => {
            write!(out, "Q {}{}", q.kind.prefix(), q.target)?;
            if let Some(baseline) = &q.baseline {
                write!(out, " {}", baseline)?;
            }
        }
        Card::T(t) => {
            write!(
                out,
                "T {}{} {}",
                t.kind.prefix(),
                escape(&t.name),
                t.target.as_card_text()
            )?;
            if let Some(value) = &t.value {
                write!(out, " {}", escape(value))?;
            }
        }
        Card::U(user) => write!(out, "U {}", escape(user))?,
        Card::W(content) => {
            writeln!(out, "W {}", content.len())?;
            out.extend_from_slice(content);
        }
        Card::Z(hash) => write!(out, "Z {}", hash)?,
    }
    out.push(b'\n');
    Ok(())
}
