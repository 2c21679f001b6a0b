//! Core types shared across deckstore facilities
//!
//! This crate provides the canonical field keys and event names used by the
//! structured logging facility and by error reporting:
//!
//! - **Schema constants**: canonical field keys and event names

pub mod schema;
