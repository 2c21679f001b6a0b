//! Canonical card-text encoding
//!
//! One line per card, cards in letter order, fields separated by single
//! spaces and escaped with [`escape::escape`]. A finalized artifact ends with
//! `Z <hash>`, the content hash of every preceding byte. The artifact's own
//! identity is the content hash of the whole text, Z line included.

pub mod escape;
pub mod parse;
pub mod render;

pub use parse::parse;
pub use render::{render_body, render_finalized};
