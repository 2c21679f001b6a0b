//! Structured logging for deck and store operations
//!
//! Operations that cross the deck/store boundary (`load`, `persist`,
//! `with_transaction`, opening a store) emit one `start` event and one `end`
//! or `end_error` event, all tagged with the same `op`. Field names come from
//! [`crate::core_types::schema`].
//!
//! Binaries call [`init`] once with a [`Profile`]; library code only emits
//! events. Tests install [`init_test_capture`] instead and assert on what
//! was recorded.
//!
//! ```rust
//! use deckstore_core::logging_facility::{init, Profile};
//!
//! init(Profile::Production);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
